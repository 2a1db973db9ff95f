use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;

use crate::control::{FormError, FormState, RawValue};
use crate::debounce::Debouncer;
use crate::spec::FormSpec;
use crate::visibility::{RefreshReport, refresh};

/// Change notification for one input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FieldInput {
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

/// A rendered form whose visibility follows its inputs through a debounced refresh.
#[derive(Debug)]
pub struct LiveForm {
    state: FormState,
    debouncer: Debouncer,
    passes: usize,
}

impl LiveForm {
    /// Builds the live state and runs the initial refresh right away.
    pub fn load(spec: &FormSpec) -> Result<(Self, RefreshReport), FormError> {
        let state = FormState::from_spec(spec)?;
        Ok(Self::from_state(state))
    }

    pub fn from_state(state: FormState) -> (Self, RefreshReport) {
        let debouncer = Debouncer::new(state.policy().debounce_delay());
        let mut live = Self {
            state,
            debouncer,
            passes: 0,
        };
        let report = live.run();
        (live, report)
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Number of refresh passes run so far, the initial one included.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Records a new raw value and (re)arms the debounce timer.
    pub fn input(&mut self, field: &str, raw: RawValue, now: Instant) -> Result<(), FormError> {
        self.state.set_raw(field, raw)?;
        self.debouncer.schedule(now);
        Ok(())
    }

    pub fn apply(&mut self, input: &FieldInput, now: Instant) -> Result<(), FormError> {
        self.state.set_value(&input.field, &input.value)?;
        self.debouncer.schedule(now);
        Ok(())
    }

    /// Runs the pending refresh if its quiet period is over.
    pub fn tick(&mut self, now: Instant) -> Option<RefreshReport> {
        if self.debouncer.fire(now) {
            Some(self.run())
        } else {
            None
        }
    }

    /// Runs the pending refresh immediately, if any.
    pub fn flush(&mut self) -> Option<RefreshReport> {
        if self.debouncer.is_pending() {
            self.debouncer.cancel();
            Some(self.run())
        } else {
            None
        }
    }

    fn run(&mut self) -> RefreshReport {
        self.passes += 1;
        refresh(&mut self.state)
    }
}
