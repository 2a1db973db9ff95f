use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::FieldSpec;

pub const DEFAULT_DEBOUNCE_MS: u64 = 300;
pub const DEFAULT_INDENT_STEP_EM: f32 = 2.0;

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}

fn default_indent_step_em() -> f32 {
    DEFAULT_INDENT_STEP_EM
}

/// Tuning for the live visibility pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisibilityPolicy {
    /// Quiet period before a burst of inputs triggers a refresh.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Left padding, in `em`, applied per indent level.
    #[serde(default = "default_indent_step_em")]
    pub indent_step_em: f32,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            indent_step_em: DEFAULT_INDENT_STEP_EM,
        }
    }
}

impl VisibilityPolicy {
    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn padding_em(&self, indent_level: u32) -> f32 {
        indent_level as f32 * self.indent_step_em
    }
}

/// Top-level conditional form definition. Fields are kept in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility_policy: Option<VisibilityPolicy>,
    pub fields: Vec<FieldSpec>,
}

impl FormSpec {
    pub fn policy(&self) -> VisibilityPolicy {
        self.visibility_policy.unwrap_or_default()
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.id == id)
    }
}
