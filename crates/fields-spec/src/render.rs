use serde_json::{Map, Value, json};

use crate::{
    control::FormState,
    spec::{Widget, form::FormSpec},
    value::extract,
    visibility::RefreshReport,
};

/// Describes a single field for render outputs.
#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub widget: Widget,
    pub visible: bool,
    pub required: bool,
    pub indent_level: u32,
    pub padding_em: f32,
    pub current_value: String,
    pub formula: Option<String>,
    pub trace: Option<String>,
    pub error: Option<String>,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_version: String,
    pub visible: usize,
    pub total: usize,
    pub fields: Vec<RenderField>,
}

/// Build the renderer payload from the form, its live state and the last pass.
pub fn build_render_payload(
    spec: &FormSpec,
    state: &FormState,
    report: &RefreshReport,
) -> RenderPayload {
    let policy = state.policy();
    let fields = state
        .controls()
        .iter()
        .map(|control| {
            let outcome = report
                .field(&control.id)
                .filter(|outcome| outcome.has_rule);
            let result = outcome.and_then(|outcome| outcome.outcome.as_ref().ok());
            RenderField {
                id: control.id.clone(),
                label: control.label.clone(),
                widget: control.widget,
                visible: !control.hidden,
                required: control.required,
                indent_level: control.indent_level,
                padding_em: policy.padding_em(control.indent_level),
                current_value: if control.raw.is_blank() {
                    String::new()
                } else {
                    extract(control).to_string()
                },
                formula: result.map(|result| result.formula.clone()),
                trace: result.map(|result| result.trace.clone()),
                error: outcome
                    .and_then(|outcome| outcome.outcome.as_ref().err())
                    .map(|err| err.to_string()),
            }
        })
        .collect::<Vec<_>>();

    RenderPayload {
        form_id: spec.id.clone(),
        form_title: spec.title.clone(),
        form_version: spec.version.clone(),
        visible: fields.iter().filter(|field| field.visible).count(),
        total: fields.len(),
        fields,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("type".into(), Value::String(field.widget.as_str().into()));
            map.insert("visible".into(), Value::Bool(field.visible));
            map.insert("required".into(), Value::Bool(field.required));
            map.insert("indent_level".into(), json!(field.indent_level));
            map.insert(
                "padding_left".into(),
                Value::String(format!("{}em", field.padding_em)),
            );
            map.insert(
                "block".into(),
                Value::String(if field.widget.is_own_block() { "self" } else { "parent" }.into()),
            );
            map.insert(
                "current_value".into(),
                Value::String(field.current_value.clone()),
            );
            if let Some(formula) = &field.formula {
                map.insert("formula".into(), Value::String(formula.clone()));
            }
            if let Some(trace) = &field.trace {
                map.insert("trace".into(), Value::String(trace.clone()));
            }
            if let Some(error) = &field.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "form_version": payload.form_version,
        "progress": {
            "visible": payload.visible,
            "total": payload.total,
        },
        "fields": fields,
    })
}

/// Render the payload as human-friendly text, one indented line per field.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Form: {} ({})",
        payload.form_title, payload.form_id
    ));
    lines.push(format!(
        "Visible fields: {}/{}",
        payload.visible, payload.total
    ));

    for field in &payload.fields {
        let indent = "  ".repeat(field.indent_level as usize);
        let marker = if field.visible { "+" } else { "-" };
        let mut entry = format!("{}{} {} ({})", indent, marker, field.label, field.id);
        if field.required {
            entry.push_str(" [required]");
        }
        if !field.current_value.is_empty() {
            entry.push_str(&format!(" = {}", field.current_value));
        }
        lines.push(entry);
        if let (Some(formula), Some(trace)) = (&field.formula, &field.trace) {
            lines.push(format!(
                "{}    {}   ⇒   {}   ⇒   {}",
                indent, formula, trace, field.visible
            ));
        }
        if let Some(error) = &field.error {
            lines.push(format!("{}    error: {}", indent, error));
        }
    }

    lines.join("\n")
}
