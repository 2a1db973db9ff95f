use serde::Serialize;
use serde_json::Value;

use crate::control::{FormError, FormState};
use crate::spec::FormSpec;
use crate::visibility::refresh;

/// Problem found while checking a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionError {
    pub field_id: String,
    pub message: String,
    pub code: String,
}

/// Server-side view of a submitted form after conditional rules are applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionCheck {
    pub valid: bool,
    /// Fields whose rule holds, in declaration order.
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    /// Enabled, required fields without an answer.
    pub missing_required: Vec<String>,
    pub unknown_fields: Vec<String>,
    pub errors: Vec<SubmissionError>,
}

/// Applies `answers` to the form, runs one visibility pass and reports which
/// fields count. Disabled fields are never required.
pub fn check_submission(spec: &FormSpec, answers: &Value) -> Result<SubmissionCheck, FormError> {
    let mut state = FormState::from_spec(spec)?;
    let mut unknown_fields = Vec::new();
    let mut errors = Vec::new();

    if let Some(map) = answers.as_object() {
        for (id, value) in map {
            match state.set_value(id, value) {
                Ok(()) => {}
                Err(FormError::UnknownField(id)) => unknown_fields.push(id),
                Err(err) => errors.push(SubmissionError {
                    field_id: id.clone(),
                    message: err.to_string(),
                    code: "invalid_value".into(),
                }),
            }
        }
    }

    let report = refresh(&mut state);
    for (field, err) in report.failures() {
        errors.push(SubmissionError {
            field_id: field.id.clone(),
            message: err.to_string(),
            code: err.code().into(),
        });
    }

    let (enabled, disabled): (Vec<_>, Vec<_>) =
        state.controls().iter().partition(|control| control.active);
    let missing_required = enabled
        .iter()
        .filter(|control| control.required && control.raw.is_blank())
        .map(|control| control.id.clone())
        .collect::<Vec<_>>();

    Ok(SubmissionCheck {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        enabled: enabled.iter().map(|control| control.id.clone()).collect(),
        disabled: disabled.iter().map(|control| control.id.clone()).collect(),
        missing_required,
        unknown_fields,
        errors,
    })
}

/// Ids of the fields enabled by `answers`.
pub fn enabled_fields(spec: &FormSpec, answers: &Value) -> Result<Vec<String>, FormError> {
    check_submission(spec, answers).map(|check| check.enabled)
}
