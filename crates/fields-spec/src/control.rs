use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::rule::Rule;
use crate::spec::{FieldSpec, FormSpec, ValueKind, VisibilityPolicy, Widget, choice_key};

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Raw state of an input control, as the host widget holds it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Typed text of a text, number or date input.
    Text(String),
    /// Checked state of a single checkbox.
    Checked(bool),
    /// Selected flag of every option of a choice widget, in option order.
    Options(Vec<bool>),
}

impl RawValue {
    pub fn empty_for(widget: Widget, option_count: usize) -> Self {
        match widget.value_kind() {
            ValueKind::Boolean => RawValue::Checked(false),
            ValueKind::SingleChoice | ValueKind::MultiChoice => {
                RawValue::Options(vec![false; option_count])
            }
            _ => RawValue::Text(String::new()),
        }
    }

    /// Converts a JSON answer (text, number, flag, option key/label or list of them).
    pub fn from_json(
        field: &str,
        widget: Widget,
        choices: &[String],
        value: &Value,
    ) -> Result<Self, FormError> {
        let invalid = |reason: &str| FormError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        match widget.value_kind() {
            ValueKind::Boolean => match value {
                Value::Bool(flag) => Ok(RawValue::Checked(*flag)),
                Value::Null => Ok(RawValue::Checked(false)),
                _ => Err(invalid("expected a boolean")),
            },
            ValueKind::SingleChoice | ValueKind::MultiChoice => {
                let mut selected = vec![false; choices.len()];
                let picks: Vec<&Value> = match value {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items.iter().collect(),
                    other => vec![other],
                };
                if widget.value_kind() == ValueKind::SingleChoice && picks.len() > 1 {
                    return Err(invalid("expected at most one option"));
                }
                for pick in picks {
                    let text = pick.as_str().ok_or_else(|| invalid("expected option keys"))?;
                    let index = option_index(choices, text)
                        .ok_or_else(|| invalid(&format!("unknown option '{}'", text)))?;
                    selected[index] = true;
                }
                Ok(RawValue::Options(selected))
            }
            _ => match value {
                Value::String(text) => Ok(RawValue::Text(text.clone())),
                Value::Number(number) => Ok(RawValue::Text(number.to_string())),
                Value::Bool(flag) => Ok(RawValue::Text(flag.to_string())),
                Value::Null => Ok(RawValue::Text(String::new())),
                _ => Err(invalid("expected a scalar value")),
            },
        }
    }

    /// Whether the control carries no user input at all.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Checked(flag) => !flag,
            RawValue::Options(flags) => !flags.iter().any(|flag| *flag),
        }
    }
}

fn option_index(choices: &[String], pick: &str) -> Option<usize> {
    (0..choices.len())
        .find(|index| choice_key(*index) == pick)
        .or_else(|| choices.iter().position(|choice| choice == pick))
}

/// Live input control of a rendered form.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: String,
    pub label: String,
    pub widget: Widget,
    pub choices: Vec<String>,
    pub rule: Rule,
    pub raw: RawValue,
    /// `required` as declared on the field.
    pub declared_required: bool,
    /// `required` as currently applied; dropped while the field is inactive.
    pub required: bool,
    pub active: bool,
    pub hidden: bool,
    pub indent_level: u32,
}

impl Control {
    fn from_field(field: &FieldSpec) -> Result<Self, FormError> {
        let raw = match &field.default_value {
            Some(default) => RawValue::from_json(&field.id, field.widget, &field.choices, default)?,
            None => RawValue::empty_for(field.widget, field.choices.len()),
        };
        Ok(Self {
            id: field.id.clone(),
            label: field.label.clone(),
            widget: field.widget,
            choices: field.choices.clone(),
            rule: field.rule.clone(),
            raw,
            declared_required: field.required,
            required: field.required,
            active: true,
            hidden: false,
            indent_level: 0,
        })
    }
}

/// All live controls of one form, in declaration order.
#[derive(Debug, Clone)]
pub struct FormState {
    controls: Vec<Control>,
    index: BTreeMap<String, usize>,
    policy: VisibilityPolicy,
}

impl FormState {
    pub fn from_spec(spec: &FormSpec) -> Result<Self, FormError> {
        let mut controls = Vec::with_capacity(spec.fields.len());
        let mut index = BTreeMap::new();
        for field in &spec.fields {
            if index.insert(field.id.clone(), controls.len()).is_some() {
                return Err(FormError::DuplicateField(field.id.clone()));
            }
            controls.push(Control::from_field(field)?);
        }
        Ok(Self {
            controls,
            index,
            policy: spec.policy(),
        })
    }

    /// Builds the state with the given answers applied on top of field defaults.
    ///
    /// Answers for unknown fields are rejected.
    pub fn from_answers(spec: &FormSpec, answers: &Value) -> Result<Self, FormError> {
        let mut state = Self::from_spec(spec)?;
        if let Some(map) = answers.as_object() {
            for (id, value) in map {
                state.set_value(id, value)?;
            }
        }
        Ok(state)
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: VisibilityPolicy) {
        self.policy = policy;
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.position(id).map(|index| &self.controls[index])
    }

    pub(crate) fn control_at_mut(&mut self, index: usize) -> &mut Control {
        &mut self.controls[index]
    }

    pub fn set_raw(&mut self, id: &str, raw: RawValue) -> Result<(), FormError> {
        let index = self
            .position(id)
            .ok_or_else(|| FormError::UnknownField(id.to_string()))?;
        self.controls[index].raw = raw;
        Ok(())
    }

    pub fn set_value(&mut self, id: &str, value: &Value) -> Result<(), FormError> {
        let control = self
            .control(id)
            .ok_or_else(|| FormError::UnknownField(id.to_string()))?;
        let raw = RawValue::from_json(id, control.widget, &control.choices, value)?;
        self.set_raw(id, raw)
    }
}
