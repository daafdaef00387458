//! Three-outcome evaluation of a step's `if` condition.

use tracing::debug;

use crate::context::PlanningFacts;
use crate::error::EvaluationError;
use crate::eval::eval_template;
use crate::parser::parse;

/// What planning can say about a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// The step always runs.
    Included,
    /// The step never runs for this repository.
    Excluded,
    /// Depends on execution-time values; carries the condition to hand to
    /// the executor.
    Deferred(String),
}

impl Condition {
    pub fn keeps_step(&self) -> bool {
        !matches!(self, Condition::Excluded)
    }
}

/// Evaluate `condition` with what is known before execution.
///
/// An absent or empty condition is [`Condition::Included`]. Once every action
/// has been folded, the rendered text must be exactly `true` (surrounding
/// whitespace aside) to include the step; any other static text excludes it.
/// A condition that still references execution-time values is deferred with
/// its original text when nothing could be simplified, and with the
/// simplified text otherwise.
pub fn evaluate(
    condition: Option<&str>,
    facts: &PlanningFacts,
) -> Result<Condition, EvaluationError> {
    let Some(text) = condition.filter(|c| !c.is_empty()) else {
        return Ok(Condition::Included);
    };

    let parsed = parse(text)?;
    let folded = eval_template(&parsed, facts)?;

    let outcome = if folded.is_static() {
        if folded.text().trim() == "true" {
            Condition::Included
        } else {
            Condition::Excluded
        }
    } else if folded == parsed {
        Condition::Deferred(text.to_string())
    } else {
        Condition::Deferred(folded.to_string())
    };

    debug!(repo = %facts.repository_name, condition = text, ?outcome, "evaluated step condition");
    Ok(outcome)
}
