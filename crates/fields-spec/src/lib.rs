#![allow(missing_docs)]

pub mod block;
pub mod control;
pub mod debounce;
pub mod evaluate;
pub mod live;
pub mod operator;
pub mod render;
pub mod rule;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod value;
pub mod visibility;

pub use block::{BlockError, RuleBlock, rule_from_stored};
pub use control::{Control, FormError, FormState, RawValue};
pub use debounce::Debouncer;
pub use evaluate::{EvalError, EvaluationResult, Evaluator, evaluate};
pub use live::{FieldInput, LiveForm};
pub use operator::{OperatorDefinition, OperatorRegistry, lookup};
pub use render::{RenderField, RenderPayload, build_render_payload, render_json_ui, render_text};
pub use rule::{Leaf, Literal, Rule};
pub use spec::{FieldSpec, FormSpec, ValueKind, VisibilityPolicy, Widget, form_schema};
pub use submission::{SubmissionCheck, SubmissionError, check_submission, enabled_fields};
pub use validate::{RuleIssue, RuleReport, Severity, validate};
pub use value::{FieldValue, extract};
pub use visibility::{
    FieldOutcome, RefreshReport, VisibilityMap, refresh, resolve_visibility, visibility_map,
};
