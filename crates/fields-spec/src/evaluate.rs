use serde::Serialize;
use thiserror::Error;

use crate::control::FormState;
use crate::operator::OperatorRegistry;
use crate::rule::{Leaf, Rule};
use crate::value::extract;

/// Faults that abort the evaluation of one field's rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("rule references unknown field '{target}'")]
    UnresolvedTarget { target: String },
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),
    #[error("field '{field}' references '{target}', which is not declared before it")]
    ForwardReference { field: String, target: String },
}

impl EvalError {
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnresolvedTarget { .. } => "unresolved_target",
            EvalError::UnknownOperator(_) => "unknown_operator",
            EvalError::ForwardReference { .. } => "forward_reference",
        }
    }
}

/// Outcome of evaluating a rule tree against the live controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationResult {
    /// Infix rendering with field labels.
    pub formula: String,
    /// Same shape as `formula` with each leaf's live value substituted.
    pub trace: String,
    pub is_active: bool,
    pub indent_level: u32,
}

impl EvaluationResult {
    pub fn empty() -> Self {
        Self {
            formula: "∅".into(),
            trace: "∅".into(),
            is_active: true,
            indent_level: 0,
        }
    }

    /// One-line developer trace: formula, substituted values and result.
    pub fn diagnostic(&self) -> String {
        format!(
            "{}   ⇒   {}   ⇒   {}",
            self.formula, self.trace, self.is_active
        )
    }
}

/// Walks rule trees against a [`FormState`]. Holds no state between calls.
pub struct Evaluator<'a> {
    state: &'a FormState,
    registry: &'a OperatorRegistry,
    origin: Option<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(state: &'a FormState) -> Self {
        Self {
            state,
            registry: OperatorRegistry::global(),
            origin: None,
        }
    }

    pub fn with_registry(mut self, registry: &'a OperatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Evaluate on behalf of the field at `index`: targets must be declared before it.
    pub fn for_field(mut self, index: usize) -> Self {
        self.origin = Some(index);
        self
    }

    pub fn evaluate(&self, rule: &Rule) -> Result<EvaluationResult, EvalError> {
        match rule {
            Rule::Empty => Ok(EvaluationResult::empty()),
            Rule::Leaf(leaf) => self.evaluate_leaf(leaf),
            Rule::And(operands) => {
                let results = self.evaluate_all(operands)?;
                let (formula, trace) = join(&results, "AND");
                Ok(EvaluationResult {
                    formula,
                    trace,
                    is_active: results.iter().all(|result| result.is_active),
                    indent_level: results
                        .iter()
                        .map(|result| result.indent_level)
                        .max()
                        .unwrap_or(0),
                })
            }
            Rule::Or(operands) => {
                let results = self.evaluate_all(operands)?;
                let (formula, trace) = join(&results, "OR");
                Ok(EvaluationResult {
                    formula,
                    trace,
                    is_active: results.iter().any(|result| result.is_active),
                    indent_level: results
                        .iter()
                        .filter(|result| result.is_active)
                        .map(|result| result.indent_level)
                        .max()
                        .unwrap_or(0),
                })
            }
        }
    }

    // Every operand is evaluated so the trace covers the whole group.
    fn evaluate_all(&self, operands: &[Rule]) -> Result<Vec<EvaluationResult>, EvalError> {
        operands.iter().map(|rule| self.evaluate(rule)).collect()
    }

    fn evaluate_leaf(&self, leaf: &Leaf) -> Result<EvaluationResult, EvalError> {
        let position = self
            .state
            .position(&leaf.target)
            .ok_or_else(|| EvalError::UnresolvedTarget {
                target: leaf.target.clone(),
            })?;
        if let Some(origin) = self.origin
            && position >= origin
        {
            return Err(EvalError::ForwardReference {
                field: self.state.controls()[origin].id.clone(),
                target: leaf.target.clone(),
            });
        }
        let target = &self.state.controls()[position];
        let operator = self.registry.lookup(&leaf.operator)?;
        let value = extract(target);
        let matched = operator.compare(&value, leaf.value.as_ref());

        let (formula, trace) = match &leaf.value {
            Some(literal) => (
                format!("{} {} \"{}\"", target.label, operator.symbol, literal),
                format!("\"{}\" {} \"{}\"", value, operator.symbol, literal),
            ),
            None => (
                format!("{} {}", target.label, operator.symbol),
                format!("\"{}\" {}", value, operator.symbol),
            ),
        };

        Ok(EvaluationResult {
            formula,
            trace,
            is_active: matched && target.active,
            indent_level: target.indent_level + 1,
        })
    }
}

fn join(results: &[EvaluationResult], connective: &str) -> (String, String) {
    let separator = format!(") {} (", connective);
    let formulas: Vec<&str> = results.iter().map(|result| result.formula.as_str()).collect();
    let traces: Vec<&str> = results.iter().map(|result| result.trace.as_str()).collect();
    (
        format!("({})", formulas.join(&separator)),
        format!("({})", traces.join(&separator)),
    )
}

/// Evaluates `rule` against `state` with the global operator registry.
pub fn evaluate(rule: &Rule, state: &FormState) -> Result<EvaluationResult, EvalError> {
    Evaluator::new(state).evaluate(rule)
}
