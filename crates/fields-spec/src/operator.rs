//! Registry of the comparison operators a rule leaf may name.
//!
//! The registry is built once per process and never mutated. Applicability
//! per [`ValueKind`] only drives authoring-side filtering and rule checks:
//! evaluation always runs the operator a rule names, whatever the target's
//! kind. Comparisons against [`FieldValue::NotComparable`] are always false.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use crate::evaluate::EvalError;
use crate::rule::Literal;
use crate::spec::ValueKind;
use crate::value::{FieldValue, parse_timestamp};

type CompareFn = fn(&FieldValue, Option<&Literal>) -> bool;

/// Static description of one operator.
#[derive(Debug, Clone, Copy)]
pub struct OperatorDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub symbol: &'static str,
    pub kinds: &'static [ValueKind],
    compare: CompareFn,
}

impl OperatorDefinition {
    pub fn compare(&self, value: &FieldValue, literal: Option<&Literal>) -> bool {
        if *value == FieldValue::NotComparable {
            return false;
        }
        (self.compare)(value, literal)
    }

    pub fn applies_to(&self, kind: ValueKind) -> bool {
        self.kinds.contains(&kind)
    }
}

const EQUALITY_KINDS: &[ValueKind] = &[
    ValueKind::Text,
    ValueKind::Numeric,
    ValueKind::SingleChoice,
    ValueKind::Date,
];
const ORDERING_KINDS: &[ValueKind] = &[ValueKind::Numeric, ValueKind::Date];
const DATE_KINDS: &[ValueKind] = &[ValueKind::Date];
const CONTAINS_KINDS: &[ValueKind] = &[ValueKind::Text, ValueKind::MultiChoice];
const MEMBERSHIP_KINDS: &[ValueKind] = &[ValueKind::SingleChoice, ValueKind::MultiChoice];
const BOOLEAN_KINDS: &[ValueKind] = &[ValueKind::Boolean];

const OPERATORS: &[OperatorDefinition] = &[
    op("eq", "is equal to", "=", EQUALITY_KINDS, |v, l| equals(v, l) == Some(true)),
    op("neq", "is not equal to", "≠", EQUALITY_KINDS, |v, l| equals(v, l) == Some(false)),
    op("is", "is", "=", EQUALITY_KINDS, |v, l| equals(v, l) == Some(true)),
    op("nis", "is not", "≠", EQUALITY_KINDS, |v, l| equals(v, l) == Some(false)),
    op("lt", "is lower than", "<", ORDERING_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_lt)),
    op("lte", "is lower or equal to", "≤", ORDERING_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_le)),
    op("ut", "is upper than", ">", ORDERING_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_gt)),
    op("ute", "is upper or equal to", "≥", ORDERING_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_ge)),
    op("bt", "is before than", "<", DATE_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_lt)),
    op("bte", "is before or equal to", "≤", DATE_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_le)),
    op("at", "is after than", ">", DATE_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_gt)),
    op("ate", "is after or equal to", "≥", DATE_KINDS, |v, l| order(v, l).is_some_and(Ordering::is_ge)),
    op("ct", "contains", "∋", CONTAINS_KINDS, |v, l| contains(v, l) == Some(true)),
    op("nct", "does not contain", "∌", CONTAINS_KINDS, |v, l| contains(v, l) == Some(false)),
    op("in", "is one of", "∈", MEMBERSHIP_KINDS, |v, l| member_of(v, l) == Some(true)),
    op("nin", "is not one of", "∉", MEMBERSHIP_KINDS, |v, l| member_of(v, l) == Some(false)),
    op("c", "is checked", "✔", BOOLEAN_KINDS, |v, _| checked(v) == Some(true)),
    op("nc", "is not checked", "✖", BOOLEAN_KINDS, |v, _| checked(v) == Some(false)),
];

const fn op(
    id: &'static str,
    label: &'static str,
    symbol: &'static str,
    kinds: &'static [ValueKind],
    compare: CompareFn,
) -> OperatorDefinition {
    OperatorDefinition {
        id,
        label,
        symbol,
        kinds,
        compare,
    }
}

/// Equality between a value and a literal; `None` when they cannot be compared.
fn equals(value: &FieldValue, literal: Option<&Literal>) -> Option<bool> {
    let literal = literal?;
    match value {
        FieldValue::Text(text) => match literal {
            Literal::List(_) => None,
            other => Some(*text == other.to_string()),
        },
        FieldValue::Number(_) | FieldValue::Timestamp(_) => {
            order(value, Some(literal)).map(Ordering::is_eq)
        }
        FieldValue::Checked(flag) => match literal {
            Literal::Bool(expected) => Some(flag == expected),
            Literal::Text(text) => text.parse::<bool>().ok().map(|expected| *flag == expected),
            _ => None,
        },
        FieldValue::Choice(key) => match literal {
            Literal::Text(expected) => Some(key.as_deref() == Some(expected.as_str())),
            _ => None,
        },
        FieldValue::Choices(keys) => match literal {
            Literal::List(expected) => {
                let expected: BTreeSet<&str> = expected.iter().map(String::as_str).collect();
                Some(keys.iter().map(String::as_str).eq(expected.into_iter()))
            }
            Literal::Text(expected) => Some(keys.len() == 1 && keys.contains(expected)),
            _ => None,
        },
        FieldValue::NotComparable => None,
    }
}

/// Numeric or chronological ordering of a value against a literal.
fn order(value: &FieldValue, literal: Option<&Literal>) -> Option<Ordering> {
    let literal = literal?;
    match value {
        FieldValue::Number(number) => number.partial_cmp(&literal.as_number()?),
        FieldValue::Timestamp(seconds) => match literal {
            Literal::Number(number) => (*seconds as f64).partial_cmp(number),
            Literal::Text(text) => parse_timestamp(text).map(|expected| seconds.cmp(&expected)),
            _ => None,
        },
        _ => None,
    }
}

fn contains(value: &FieldValue, literal: Option<&Literal>) -> Option<bool> {
    let literal = literal?;
    match value {
        FieldValue::Text(text) => match literal {
            Literal::List(_) => None,
            other => Some(text.contains(&other.to_string())),
        },
        FieldValue::Choices(keys) => literal.as_text().map(|needle| keys.contains(needle)),
        FieldValue::Choice(key) => literal
            .as_text()
            .map(|needle| key.as_deref() == Some(needle)),
        _ => None,
    }
}

fn member_of(value: &FieldValue, literal: Option<&Literal>) -> Option<bool> {
    let allowed: Vec<&str> = match literal? {
        Literal::List(items) => items.iter().map(String::as_str).collect(),
        Literal::Text(text) => vec![text.as_str()],
        _ => return None,
    };
    match value {
        FieldValue::Choice(key) => Some(key.as_deref().is_some_and(|key| allowed.contains(&key))),
        FieldValue::Choices(keys) => Some(keys.iter().any(|key| allowed.contains(&key.as_str()))),
        FieldValue::Text(text) => Some(allowed.contains(&text.as_str())),
        _ => None,
    }
}

fn checked(value: &FieldValue) -> Option<bool> {
    match value {
        FieldValue::Checked(flag) => Some(*flag),
        _ => None,
    }
}

/// Immutable lookup table from operator id to definition.
#[derive(Debug)]
pub struct OperatorRegistry {
    operators: BTreeMap<&'static str, OperatorDefinition>,
}

static REGISTRY: LazyLock<OperatorRegistry> = LazyLock::new(OperatorRegistry::builtin);

impl OperatorRegistry {
    fn builtin() -> Self {
        Self {
            operators: OPERATORS.iter().map(|def| (def.id, *def)).collect(),
        }
    }

    /// Process-wide registry of the built-in operators.
    pub fn global() -> &'static OperatorRegistry {
        &REGISTRY
    }

    pub fn lookup(&self, id: &str) -> Result<&OperatorDefinition, EvalError> {
        self.operators
            .get(id)
            .ok_or_else(|| EvalError::UnknownOperator(id.to_string()))
    }

    /// Operators offered for a field of the given kind, in declaration order.
    pub fn for_kind(&self, kind: ValueKind) -> Vec<&OperatorDefinition> {
        OPERATORS
            .iter()
            .filter(|def| def.applies_to(kind))
            .filter_map(|def| self.operators.get(def.id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OperatorDefinition> {
        OPERATORS.iter().filter_map(|def| self.operators.get(def.id))
    }
}

/// Shorthand for [`OperatorRegistry::global`]`.lookup(id)`.
pub fn lookup(id: &str) -> Result<&'static OperatorDefinition, EvalError> {
    OperatorRegistry::global().lookup(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(id: &str, value: FieldValue, literal: Option<Literal>) -> bool {
        lookup(id).expect("operator").compare(&value, literal.as_ref())
    }

    fn text(value: &str) -> Option<Literal> {
        Some(Literal::Text(value.into()))
    }

    #[test]
    fn ordering_parses_text_literals() {
        assert!(run("lt", FieldValue::Number(15.0), text("18")));
        assert!(!run("ut", FieldValue::Number(15.0), text("18")));
        assert!(run("ute", FieldValue::Number(18.0), Some(Literal::Number(18.0))));
        assert!(!run("lt", FieldValue::Number(15.0), text("adult")));
    }

    #[test]
    fn date_operators_compare_timestamps() {
        let day_two = FieldValue::Timestamp(86_400);
        assert!(run("at", day_two.clone(), text("1970-01-01")));
        assert!(run("bte", day_two.clone(), Some(Literal::Number(86_400.0))));
        assert!(!run("bt", day_two, text("1970-01-02")));
    }

    #[test]
    fn not_comparable_is_false_for_every_operator() {
        for def in OperatorRegistry::global().iter() {
            assert!(
                !def.compare(&FieldValue::NotComparable, text("x").as_ref()),
                "{} should be false",
                def.id
            );
        }
    }

    #[test]
    fn negations_need_a_comparable_literal() {
        assert!(run("neq", FieldValue::Text("a".into()), text("b")));
        assert!(!run("neq", FieldValue::Number(1.0), text("one")));
        assert!(!run("nct", FieldValue::Checked(true), text("x")));
    }

    #[test]
    fn contains_covers_text_and_sets() {
        assert!(run("ct", FieldValue::Text("hello world".into()), text("lo w")));
        let keys = FieldValue::Choices(["c1".to_string(), "c3".to_string()].into());
        assert!(run("ct", keys.clone(), text("c3")));
        assert!(!run("ct", keys.clone(), text("c4")));
        assert!(run("nct", keys, text("c4")));
    }

    #[test]
    fn contains_reads_number_literals_as_text() {
        let serial = FieldValue::Text("order-1234".into());
        assert!(run("ct", serial.clone(), Some(Literal::Number(123.0))));
        assert!(!run("nct", serial.clone(), Some(Literal::Number(123.0))));
        assert!(run("nct", serial, Some(Literal::Number(999.0))));
    }

    #[test]
    fn fractional_timestamp_literals_are_not_truncated() {
        let day_two = FieldValue::Timestamp(86_400);
        assert!(run("lt", day_two.clone(), Some(Literal::Number(86_400.5))));
        assert!(run("bt", day_two.clone(), Some(Literal::Number(86_400.5))));
        assert!(!run("eq", day_two.clone(), Some(Literal::Number(86_400.5))));
        assert!(run("ate", day_two, Some(Literal::Number(86_400.0))));
    }

    #[test]
    fn membership_in_literal_sets() {
        let list = Some(Literal::List(vec!["c2".into(), "c3".into()]));
        assert!(run("in", FieldValue::Choice(Some("c3".into())), list.clone()));
        assert!(!run("in", FieldValue::Choice(None), list.clone()));
        assert!(run("nin", FieldValue::Choice(None), list.clone()));
        assert!(run(
            "in",
            FieldValue::Choices(["c1".to_string(), "c2".to_string()].into()),
            list
        ));
    }

    #[test]
    fn checkbox_operators_ignore_literal() {
        assert!(run("c", FieldValue::Checked(true), None));
        assert!(run("nc", FieldValue::Checked(false), None));
        assert!(!run("c", FieldValue::Text("on".into()), None));
    }

    #[test]
    fn unknown_operator_is_an_error() {
        assert_eq!(
            lookup("approx").unwrap_err(),
            EvalError::UnknownOperator("approx".into())
        );
    }

    #[test]
    fn registry_filters_by_kind() {
        let ids: Vec<_> = OperatorRegistry::global()
            .for_kind(ValueKind::Boolean)
            .iter()
            .map(|def| def.id)
            .collect();
        assert_eq!(ids, vec!["c", "nc"]);
        assert!(lookup("bt").unwrap().applies_to(ValueKind::Date));
        assert!(!lookup("bt").unwrap().applies_to(ValueKind::Numeric));
    }
}
