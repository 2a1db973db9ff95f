use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison value carried by a rule leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl Literal {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(number) => Some(*number),
            Literal::Text(text) => text.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(flag) => write!(f, "{}", flag),
            Literal::Number(number) => write!(f, "{}", number),
            Literal::Text(text) => f.write_str(text),
            Literal::List(items) => f.write_str(&items.join(",")),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

/// Single field comparison: `target <opr> val`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub target: String,
    #[serde(rename = "opr")]
    pub operator: String,
    #[serde(rename = "val", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Literal>,
}

/// Condition tree attached to a field.
///
/// Serialized as `{}`, `{"entry": {..}}`, `{"and": [..]}` or `{"or": [..]}`.
/// The `{"bool_opr": "and", "subrules": [..]}` layout is accepted on input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub enum Rule {
    #[default]
    Empty,
    Leaf(Leaf),
    And(Vec<Rule>),
    Or(Vec<Rule>),
}

impl Rule {
    pub fn leaf(target: &str, operator: &str, value: Option<Literal>) -> Self {
        Rule::Leaf(Leaf {
            target: target.to_string(),
            operator: operator.to_string(),
            value,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Rule::Empty)
    }

    /// All leaves of the tree, depth-first, left to right.
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            Rule::Empty => {}
            Rule::Leaf(leaf) => out.push(leaf),
            Rule::And(rules) | Rule::Or(rules) => {
                for rule in rules {
                    rule.collect_leaves(out);
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawRule {
    Tagged(TaggedRule),
    Grouped {
        bool_opr: BoolOpr,
        subrules: Vec<Rule>,
    },
    Empty(EmptyRule),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TaggedRule {
    Entry(Leaf),
    And(Vec<Rule>),
    Or(Vec<Rule>),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BoolOpr {
    And,
    Or,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EmptyRule {}

impl From<RawRule> for Rule {
    fn from(raw: RawRule) -> Self {
        match raw {
            RawRule::Tagged(TaggedRule::Entry(leaf)) => Rule::Leaf(leaf),
            RawRule::Tagged(TaggedRule::And(rules)) => Rule::And(rules),
            RawRule::Tagged(TaggedRule::Or(rules)) => Rule::Or(rules),
            RawRule::Grouped {
                bool_opr: BoolOpr::And,
                subrules,
            } => Rule::And(subrules),
            RawRule::Grouped {
                bool_opr: BoolOpr::Or,
                subrules,
            } => Rule::Or(subrules),
            RawRule::Empty(_) => Rule::Empty,
        }
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Empty => RawRule::Empty(EmptyRule {}),
            Rule::Leaf(leaf) => RawRule::Tagged(TaggedRule::Entry(leaf)),
            Rule::And(rules) => RawRule::Tagged(TaggedRule::And(rules)),
            Rule::Or(rules) => RawRule::Tagged(TaggedRule::Or(rules)),
        }
    }
}
