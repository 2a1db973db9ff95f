use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rule::Rule;

/// Declared widget of a form field, as rendered by the host form layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    Singleline,
    Multiline,
    Email,
    Url,
    Hidden,
    Number,
    Date,
    Time,
    Datetime,
    Checkbox,
    Checkboxes,
    Radio,
    Dropdown,
    Multiselect,
}

/// Comparable value shape produced by a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Numeric,
    Boolean,
    Date,
    SingleChoice,
    MultiChoice,
}

impl Widget {
    pub fn value_kind(self) -> ValueKind {
        match self {
            Widget::Singleline | Widget::Multiline | Widget::Email | Widget::Url | Widget::Hidden => {
                ValueKind::Text
            }
            Widget::Number => ValueKind::Numeric,
            Widget::Date | Widget::Time | Widget::Datetime => ValueKind::Date,
            Widget::Checkbox => ValueKind::Boolean,
            Widget::Radio | Widget::Dropdown => ValueKind::SingleChoice,
            Widget::Checkboxes | Widget::Multiselect => ValueKind::MultiChoice,
        }
    }

    /// Whether the widget exposes a list of options.
    pub fn has_choices(self) -> bool {
        matches!(
            self.value_kind(),
            ValueKind::SingleChoice | ValueKind::MultiChoice
        )
    }

    /// Hidden inputs have no wrapping layout block; they are toggled directly.
    pub fn is_own_block(self) -> bool {
        matches!(self, Widget::Hidden)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Widget::Singleline => "singleline",
            Widget::Multiline => "multiline",
            Widget::Email => "email",
            Widget::Url => "url",
            Widget::Hidden => "hidden",
            Widget::Number => "number",
            Widget::Date => "date",
            Widget::Time => "time",
            Widget::Datetime => "datetime",
            Widget::Checkbox => "checkbox",
            Widget::Checkboxes => "checkboxes",
            Widget::Radio => "radio",
            Widget::Dropdown => "dropdown",
            Widget::Multiselect => "multiselect",
        }
    }
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::Text,
        ValueKind::Numeric,
        ValueKind::Boolean,
        ValueKind::Date,
        ValueKind::SingleChoice,
        ValueKind::MultiChoice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Numeric => "numeric",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::SingleChoice => "single_choice",
            ValueKind::MultiChoice => "multi_choice",
        }
    }
}

impl std::str::FromStr for ValueKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ValueKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown value kind '{}'", value))
    }
}

/// Positional key of the option at `index`, as used by choice rules (`c1`, `c2`, ...).
pub fn choice_key(index: usize) -> String {
    format!("c{}", index + 1)
}

/// Declaration of a single form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub widget: Widget,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Rule::is_empty")]
    #[schemars(with = "serde_json::Value")]
    pub rule: Rule,
}

impl FieldSpec {
    pub fn value_kind(&self) -> ValueKind {
        self.widget.value_kind()
    }
}
