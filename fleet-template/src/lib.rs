//! fleet-template: step condition language.
//!
//! Conditions are template text with `${{ … }}` actions. They are parsed into
//! an expression tree, folded with the facts known while planning, and
//! reduced to one of three outcomes: the step is included, excluded, or its
//! condition is deferred to execution time.

pub mod ast;
pub mod condition;
pub mod context;
pub mod error;
pub mod eval;
pub mod parser;

pub use ast::{Expr, Literal, Part, Template, Value};
pub use condition::{evaluate, Condition};
pub use context::PlanningFacts;
pub use error::EvaluationError;
pub use eval::{eval_expr, eval_template, Partial};
pub use parser::parse;
