//! Facts known at planning time, before anything has executed.

use serde::{Deserialize, Serialize};

use fleet_core::types::{BatchSpec, Repository};

use crate::ast::Value;
use crate::error::EvaluationError;

/// Namespaces resolvable while planning.
pub const PLANNING_NAMESPACES: &[&str] = &["repository", "batch_change"];

/// Namespaces that only exist once steps have run. Any reference to them
/// defers evaluation.
pub const RUNTIME_NAMESPACES: &[&str] = &["outputs", "step", "steps", "previous_step"];

pub fn is_namespace(name: &str) -> bool {
    PLANNING_NAMESPACES.contains(&name) || RUNTIME_NAMESPACES.contains(&name)
}

pub(crate) fn is_runtime(name: &str) -> bool {
    RUNTIME_NAMESPACES.contains(&name)
}

/// The values `repository.*` and `batch_change.*` resolve to for one
/// repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningFacts {
    pub repository_name: String,
    pub search_result_paths: Vec<String>,
    pub batch_change_name: String,
    pub batch_change_description: String,
}

impl PlanningFacts {
    pub fn new(spec: &BatchSpec, repo: &Repository) -> Self {
        Self {
            repository_name: repo.name.clone(),
            search_result_paths: repo.file_matches.clone(),
            batch_change_name: spec.name.clone(),
            batch_change_description: spec.description.clone(),
        }
    }

    /// Facts for a bare repository name, with no batch change metadata.
    pub fn for_repository(name: impl Into<String>) -> Self {
        Self {
            repository_name: name.into(),
            ..Self::default()
        }
    }

    /// Resolve `root.path`. `Ok(None)` means the field is execution-time.
    pub(crate) fn lookup(
        &self,
        root: &str,
        path: &[String],
    ) -> Result<Option<Value>, EvaluationError> {
        if is_runtime(root) {
            return Ok(None);
        }
        let field = match path {
            [] => {
                return Err(EvaluationError::Type {
                    function: "field access",
                    message: format!("namespace {root} is not a value"),
                })
            }
            [field] => field.as_str(),
            _ => {
                return Err(EvaluationError::UnknownField {
                    namespace: root.to_string(),
                    field: path.join("."),
                })
            }
        };
        let value = match (root, field) {
            ("repository", "name") => Value::Str(self.repository_name.clone()),
            ("repository", "search_result_paths") => Value::List(self.search_result_paths.clone()),
            ("batch_change", "name") => Value::Str(self.batch_change_name.clone()),
            ("batch_change", "description") => Value::Str(self.batch_change_description.clone()),
            _ => {
                return Err(EvaluationError::UnknownField {
                    namespace: root.to_string(),
                    field: field.to_string(),
                })
            }
        };
        Ok(Some(value))
    }
}
