pub mod field;
pub mod form;

pub use field::{FieldSpec, ValueKind, Widget, choice_key};
pub use form::{DEFAULT_DEBOUNCE_MS, DEFAULT_INDENT_STEP_EM, FormSpec, VisibilityPolicy};

/// JSON schema of [`FormSpec`] documents.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormSpec)).unwrap_or(serde_json::Value::Null)
}
