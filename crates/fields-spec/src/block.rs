//! Conversion of stored rule-builder blocks into [`Rule`] trees.
//!
//! The form builder stores a field's condition as a list holding at most one
//! block. A block names either a target field or a boolean connective
//! (`and`/`or`) with nested blocks, plus one value slot per widget family.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::rule::{Literal, Rule};
use crate::value::parse_timestamp;

#[derive(Debug, Error, PartialEq)]
pub enum BlockError {
    #[error("rule block for '{field}' has an unreadable {slot} '{value}'")]
    InvalidTimestamp {
        field: String,
        slot: &'static str,
        value: String,
    },
    #[error("rule block is malformed: {0}")]
    Malformed(String),
}

/// One block of the rule builder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct RuleBlock {
    /// Target field id, or `and` / `or` for a group.
    pub field: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_char: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_dropdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleBlockEntry>,
}

/// Nested block, either bare or wrapped the way stream blocks store it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RuleBlockEntry {
    Wrapped { value: RuleBlock },
    Bare(RuleBlock),
}

impl RuleBlockEntry {
    pub fn block(&self) -> &RuleBlock {
        match self {
            RuleBlockEntry::Wrapped { value } => value,
            RuleBlockEntry::Bare(block) => block,
        }
    }
}

fn filled(slot: &Option<String>) -> Option<&str> {
    slot.as_deref().filter(|value| !value.trim().is_empty())
}

impl RuleBlock {
    pub fn to_rule(&self) -> Result<Rule, BlockError> {
        match self.field.as_str() {
            "and" | "or" => {
                let rules = self
                    .rules
                    .iter()
                    .map(|entry| entry.block().to_rule())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if self.field == "and" {
                    Rule::And(rules)
                } else {
                    Rule::Or(rules)
                })
            }
            target => Ok(Rule::leaf(target, &self.operator, self.literal()?)),
        }
    }

    /// Picks the value slot: date, time, datetime, dropdown, number, then text.
    fn literal(&self) -> Result<Option<Literal>, BlockError> {
        let timestamps = [
            ("value_date", &self.value_date),
            ("value_time", &self.value_time),
            ("value_datetime", &self.value_datetime),
        ];
        for (slot, raw) in timestamps {
            if let Some(raw) = filled(raw) {
                let seconds = parse_timestamp(raw).ok_or_else(|| BlockError::InvalidTimestamp {
                    field: self.field.clone(),
                    slot,
                    value: raw.to_string(),
                })?;
                return Ok(Some(Literal::Number(seconds as f64)));
            }
        }
        if let Some(key) = filled(&self.value_dropdown) {
            return Ok(Some(Literal::Text(key.to_string())));
        }
        if let Some(number) = self.value_number {
            return Ok(Some(Literal::Number(number.trunc())));
        }
        Ok(filled(&self.value_char).map(|text| Literal::Text(text.to_string())))
    }
}

/// Reads a stored rule list (`[]` or `[{"value": block}]`) into a rule.
pub fn rule_from_stored(stored: &Value) -> Result<Rule, BlockError> {
    let entries: Vec<RuleBlockEntry> = serde_json::from_value(stored.clone())
        .map_err(|err| BlockError::Malformed(err.to_string()))?;
    match entries.first() {
        Some(entry) => entry.block().to_rule(),
        None => Ok(Rule::Empty),
    }
}
