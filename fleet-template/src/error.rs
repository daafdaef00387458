//! Error types for fleet-template.

use thiserror::Error;

/// All errors that can arise while parsing or statically evaluating a
/// condition expression.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The template text could not be parsed.
    #[error("malformed expression {template:?} at offset {offset}: {message}")]
    Syntax {
        template: String,
        offset: usize,
        message: String,
    },

    /// A call names a function that does not exist.
    #[error("function {name:?} not defined")]
    UnknownFunction { name: String },

    /// A field reference names a field its namespace does not have.
    #[error("can't evaluate field {field:?} of {namespace}")]
    UnknownField { namespace: String, field: String },

    /// A function was called with the wrong number of arguments.
    #[error("wrong number of args for {function}: want {expected}, got {got}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    /// A function received an argument of the wrong type.
    #[error("error calling {function}: {message}")]
    Type {
        function: &'static str,
        message: String,
    },

    /// The pattern passed to `matches` is not a valid glob.
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: fleet_core::glob::GlobError,
    },
}

pub(crate) fn type_err(function: &'static str, message: impl Into<String>) -> EvaluationError {
    EvaluationError::Type {
        function,
        message: message.into(),
    }
}
