use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use fields_spec::{
    EvalError, Evaluator, FormError, FormSpec, FormState, OperatorDefinition, OperatorRegistry,
    Rule, ValueKind, VisibilityPolicy, build_render_payload, check_submission,
    refresh as refresh_state, render_json_ui, validate,
};

const DEFAULT_SPEC: &str = include_str!("../../fields-spec/tests/fixtures/membership_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config/{0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("form '{0}' is not available")]
    FormUnavailable(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("unknown value kind '{0}'")]
    UnknownKind(String),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_spec_json: Option<String>,
    /// Replaces the form's own visibility policy when set.
    #[serde(default)]
    visibility_policy: Option<VisibilityPolicy>,
}

fn load_form_spec(config_json: &str) -> Result<FormSpec, ComponentError> {
    let config = if config_json.trim().is_empty() {
        ComponentConfig::default()
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)?
    };

    let spec_json = config.form_spec_json.as_deref().unwrap_or(DEFAULT_SPEC);
    let mut spec: FormSpec = serde_json::from_str(spec_json).map_err(ComponentError::ConfigParse)?;
    if let Some(policy) = config.visibility_policy {
        spec.visibility_policy = Some(policy);
    }
    Ok(spec)
}

fn ensure_form(form_id: &str, config_json: &str) -> Result<FormSpec, ComponentError> {
    let spec = load_form_spec(config_json)?;
    if spec.id != form_id {
        Err(ComponentError::FormUnavailable(form_id.to_string()))
    } else {
        Ok(spec)
    }
}

fn parse_answers(answers_json: &str) -> Value {
    serde_json::from_str(answers_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            log::debug!("component call failed: {}", err);
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn operator_json(operator: &OperatorDefinition) -> Value {
    json!({
        "id": operator.id,
        "label": operator.label,
        "symbol": operator.symbol,
        "kinds": operator.kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>(),
    })
}

/// Full visibility view of `spec` once `answers` are applied.
fn refreshed_view(spec: &FormSpec, answers: &Value) -> Result<Value, ComponentError> {
    let mut state = FormState::from_answers(spec, answers)?;
    let report = refresh_state(&mut state);
    let payload = build_render_payload(spec, &state, &report);
    Ok(render_json_ui(&payload))
}

pub fn describe(form_id: &str, config_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|spec| serde_json::to_value(spec).map_err(ComponentError::JsonEncode)),
    )
}

/// Operators offered for a value kind, or all of them when `kind` is empty.
pub fn operators(kind: &str) -> String {
    let registry = OperatorRegistry::global();
    let result = if kind.trim().is_empty() {
        Ok(registry.iter().map(operator_json).collect::<Vec<_>>())
    } else {
        kind.parse::<ValueKind>()
            .map_err(|_| ComponentError::UnknownKind(kind.to_string()))
            .map(|kind| {
                registry
                    .for_kind(kind)
                    .into_iter()
                    .map(operator_json)
                    .collect::<Vec<_>>()
            })
    };
    respond(result.map(Value::Array))
}

pub fn check_rules(form_id: &str, config_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        serde_json::to_value(validate(&spec)).map_err(ComponentError::JsonEncode)
    }))
}

pub fn refresh(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(
        ensure_form(form_id, config_json)
            .and_then(|spec| refreshed_view(&spec, &parse_answers(answers_json))),
    )
}

/// Evaluates an ad-hoc rule against the refreshed form, as if it belonged to
/// a new field appended after the last one.
pub fn evaluate_rule(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    rule_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let rule: Rule = serde_json::from_str(rule_json).map_err(ComponentError::ConfigParse)?;
        let mut state = FormState::from_answers(&spec, &parse_answers(answers_json))?;
        refresh_state(&mut state);
        let result = Evaluator::new(&state).evaluate(&rule)?;
        serde_json::to_value(result).map_err(ComponentError::JsonEncode)
    }))
}

fn with_answer(answers_json: &str, field_id: &str, value: Value) -> Value {
    let mut map = parse_answers(answers_json)
        .as_object()
        .cloned()
        .unwrap_or_default();
    map.insert(field_id.to_string(), value);
    Value::Object(map)
}

/// Records one input change and returns the updated answers with the refreshed view.
pub fn apply_input(
    form_id: &str,
    config_json: &str,
    answers_json: &str,
    field_id: &str,
    value_json: &str,
) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let value: Value = serde_json::from_str(value_json).map_err(ComponentError::ConfigParse)?;
        let answers = with_answer(answers_json, field_id, value);
        let view = refreshed_view(&spec, &answers)?;
        Ok(json!({
            "answers": answers,
            "form": view,
        }))
    }))
}

pub fn enabled_fields(form_id: &str, config_json: &str, answers_json: &str) -> String {
    respond(ensure_form(form_id, config_json).and_then(|spec| {
        let answers = serde_json::from_str(answers_json).map_err(ComponentError::ConfigParse)?;
        let check = check_submission(&spec, &answers)?;
        serde_json::to_value(check).map_err(ComponentError::JsonEncode)
    }))
}
