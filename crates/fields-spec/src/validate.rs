use std::collections::BTreeMap;

use serde::Serialize;

use crate::operator::OperatorRegistry;
use crate::rule::{Leaf, Literal, Rule};
use crate::spec::field::{FieldSpec, choice_key};
use crate::spec::form::FormSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Authoring defect found in a form's rules.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleIssue {
    pub field_id: String,
    pub path: String,
    pub message: String,
    pub code: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub valid: bool,
    pub issues: Vec<RuleIssue>,
}

impl RuleReport {
    pub fn errors(&self) -> impl Iterator<Item = &RuleIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }
}

/// Checks every field rule against the form: targets must exist and be
/// declared earlier, operators must be registered and should suit the
/// target's kind.
pub fn validate(spec: &FormSpec) -> RuleReport {
    let mut positions = BTreeMap::new();
    let mut issues = Vec::new();

    for (index, field) in spec.fields.iter().enumerate() {
        if positions.contains_key(field.id.as_str()) {
            issues.push(issue(
                field,
                format!("/fields/{}", index),
                "field id is declared more than once",
                "duplicate_field",
                Severity::Error,
            ));
        } else {
            positions.insert(field.id.as_str(), index);
        }
    }

    for (index, field) in spec.fields.iter().enumerate() {
        let checker = Checker {
            spec,
            positions: &positions,
            field,
            index,
        };
        checker.walk(&field.rule, format!("/fields/{}/rule", index), &mut issues);
    }

    RuleReport {
        valid: !issues
            .iter()
            .any(|issue| issue.severity == Severity::Error),
        issues,
    }
}

struct Checker<'a> {
    spec: &'a FormSpec,
    positions: &'a BTreeMap<&'a str, usize>,
    field: &'a FieldSpec,
    index: usize,
}

impl Checker<'_> {
    fn walk(&self, rule: &Rule, path: String, issues: &mut Vec<RuleIssue>) {
        match rule {
            Rule::Empty => {}
            Rule::Leaf(leaf) => self.check_leaf(leaf, format!("{}/entry", path), issues),
            Rule::And(rules) | Rule::Or(rules) => {
                let connective = if matches!(rule, Rule::And(_)) {
                    "and"
                } else {
                    "or"
                };
                if rules.is_empty() {
                    issues.push(issue(
                        self.field,
                        path.clone(),
                        &format!("'{}' group has no conditions", connective),
                        "empty_group",
                        Severity::Warning,
                    ));
                }
                for (position, nested) in rules.iter().enumerate() {
                    self.walk(nested, format!("{}/{}/{}", path, connective, position), issues);
                }
            }
        }
    }

    fn check_leaf(&self, leaf: &Leaf, path: String, issues: &mut Vec<RuleIssue>) {
        let operator = match OperatorRegistry::global().lookup(&leaf.operator) {
            Ok(operator) => Some(operator),
            Err(err) => {
                issues.push(issue(
                    self.field,
                    path.clone(),
                    &err.to_string(),
                    err.code(),
                    Severity::Error,
                ));
                None
            }
        };

        let Some(&position) = self.positions.get(leaf.target.as_str()) else {
            issues.push(issue(
                self.field,
                path,
                &format!("target '{}' is not a field of this form", leaf.target),
                "unresolved_target",
                Severity::Error,
            ));
            return;
        };
        if position >= self.index {
            issues.push(issue(
                self.field,
                path.clone(),
                &format!("target '{}' is not declared before this field", leaf.target),
                "forward_reference",
                Severity::Error,
            ));
        }

        let target = &self.spec.fields[position];
        let Some(operator) = operator else {
            return;
        };
        if !operator.applies_to(target.value_kind()) {
            issues.push(issue(
                self.field,
                path.clone(),
                &format!(
                    "operator '{}' does not apply to {} field '{}'",
                    operator.id,
                    target.value_kind().as_str(),
                    target.id
                ),
                "kind_mismatch",
                Severity::Warning,
            ));
        }
        if leaf.value.is_none() && !matches!(operator.id, "c" | "nc") {
            issues.push(issue(
                self.field,
                path.clone(),
                &format!("operator '{}' needs a value", operator.id),
                "missing_value",
                Severity::Warning,
            ));
        }
        if target.widget.has_choices() {
            for key in literal_keys(leaf.value.as_ref()) {
                let known = (0..target.choices.len()).any(|index| choice_key(index) == key);
                if !known {
                    issues.push(issue(
                        self.field,
                        path.clone(),
                        &format!("'{}' is not an option key of '{}'", key, target.id),
                        "unknown_choice",
                        Severity::Warning,
                    ));
                }
            }
        }
    }
}

fn literal_keys(literal: Option<&Literal>) -> Vec<&str> {
    match literal {
        Some(Literal::Text(key)) => vec![key.as_str()],
        Some(Literal::List(keys)) => keys.iter().map(String::as_str).collect(),
        _ => Vec::new(),
    }
}

fn issue(
    field: &FieldSpec,
    path: String,
    message: &str,
    code: &str,
    severity: Severity,
) -> RuleIssue {
    RuleIssue {
        field_id: field.id.clone(),
        path,
        message: message.into(),
        code: code.into(),
        severity,
    }
}
