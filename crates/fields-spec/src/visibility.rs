use std::collections::BTreeMap;

use serde_json::Value;

use crate::control::{Control, FormError, FormState};
use crate::evaluate::{EvalError, EvaluationResult, Evaluator};
use crate::spec::FormSpec;

pub type VisibilityMap = BTreeMap<String, bool>;

/// What one scheduler pass did for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome {
    pub id: String,
    pub label: String,
    pub has_rule: bool,
    pub outcome: Result<EvaluationResult, EvalError>,
}

/// Per-field outcomes of a [`refresh`] pass, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RefreshReport {
    pub fields: Vec<FieldOutcome>,
}

impl RefreshReport {
    pub fn field(&self, id: &str) -> Option<&FieldOutcome> {
        self.fields.iter().find(|field| field.id == id)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&FieldOutcome, &EvalError)> {
        self.fields
            .iter()
            .filter_map(|field| field.outcome.as_ref().err().map(|err| (field, err)))
    }
}

/// Re-evaluates every field in declaration order and commits its derived state.
///
/// A field's `active` and `indent_level` are written before the next field is
/// evaluated, so later rules see the transitive state of earlier fields. A
/// field whose rule fails keeps its previous state; the pass carries on.
pub fn refresh(state: &mut FormState) -> RefreshReport {
    log::debug!("===== updating fields visibility =====");

    let mut fields = Vec::with_capacity(state.len());
    for index in 0..state.len() {
        let outcome = {
            let rule = &state.controls()[index].rule;
            Evaluator::new(state).for_field(index).evaluate(rule)
        };

        let control = state.control_at_mut(index);
        let has_rule = !control.rule.is_empty();
        match &outcome {
            Ok(result) => {
                if has_rule {
                    log::debug!("=== {} === {}", control.label, result.diagnostic());
                }
                apply(control, result);
            }
            Err(err) => log::warn!("visibility of field '{}' left unchanged: {}", control.id, err),
        }

        fields.push(FieldOutcome {
            id: control.id.clone(),
            label: control.label.clone(),
            has_rule,
            outcome,
        });
    }

    RefreshReport { fields }
}

fn apply(control: &mut Control, result: &EvaluationResult) {
    control.hidden = !result.is_active;
    control.required = control.declared_required && result.is_active;
    control.indent_level = result.indent_level;
    control.active = result.is_active;
}

/// Active flag of every field once `answers` are applied to the form.
pub fn resolve_visibility(spec: &FormSpec, answers: &Value) -> Result<VisibilityMap, FormError> {
    let mut state = FormState::from_answers(spec, answers)?;
    refresh(&mut state);
    Ok(visibility_map(&state))
}

pub fn visibility_map(state: &FormState) -> VisibilityMap {
    state
        .controls()
        .iter()
        .map(|control| (control.id.clone(), control.active))
        .collect()
}
