//! Batch spec and repository list loading.
//!
//! # API pattern
//!
//! - `parse_*(&str)` — parse an in-memory YAML document
//! - `load_*_at(&Path)` — read a file, reporting parse errors with its path
//!
//! Every spec that leaves this module has passed [`validate`].

use std::collections::HashSet;
use std::path::Path;

use crate::error::{invalid, SpecError};
use crate::glob;
use crate::types::{BatchSpec, Repository};

// ---------------------------------------------------------------------------
// 1. Batch spec
// ---------------------------------------------------------------------------

/// Parse and validate a batch spec from YAML text.
pub fn parse_spec(contents: &str) -> Result<BatchSpec, SpecError> {
    let spec: BatchSpec = serde_yaml::from_str(contents)?;
    validate(&spec)?;
    Ok(spec)
}

/// Load and validate the batch spec at `path`.
///
/// Returns `SpecError::NotFound` if absent and `SpecError::Parse` (with path
/// and line context) if the YAML is malformed.
pub fn load_spec_at(path: &Path) -> Result<BatchSpec, SpecError> {
    let contents = read(path)?;
    let spec: BatchSpec = serde_yaml::from_str(&contents).map_err(|source| SpecError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&spec)?;
    Ok(spec)
}

/// Structural checks serde cannot express.
pub fn validate(spec: &BatchSpec) -> Result<(), SpecError> {
    if spec.steps.is_empty() {
        return Err(invalid("at least one step is required"));
    }
    for (i, step) in spec.steps.iter().enumerate() {
        if step.run.trim().is_empty() {
            return Err(invalid(format!("step {} has an empty `run`", i + 1)));
        }
        if step.container.trim().is_empty() {
            return Err(invalid(format!("step {} has no `container`", i + 1)));
        }
    }

    if spec.changeset_template.branch.trim().is_empty() {
        return Err(invalid("changesetTemplate.branch must not be empty"));
    }

    for ws in &spec.workspaces {
        if ws.root_at_location_of.trim().is_empty() {
            return Err(invalid(format!(
                "workspace configuration for `{}` has an empty rootAtLocationOf",
                ws.in_pattern
            )));
        }
        glob::compile(&ws.in_pattern).map_err(|e| {
            invalid(format!("workspace `in` pattern `{}`: {e}", ws.in_pattern))
        })?;
    }

    if let Some(transform) = &spec.transform_changes {
        for group in &transform.group {
            if group.branch.trim().is_empty() {
                return Err(invalid(format!(
                    "transformChanges group for directory `{}` has an empty branch",
                    group.directory
                )));
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// 2. Repository lists
// ---------------------------------------------------------------------------

/// Parse a YAML (or JSON) sequence of repository records.
///
/// Repository IDs must be unique.
pub fn parse_repositories(contents: &str) -> Result<Vec<Repository>, SpecError> {
    let repos: Vec<Repository> = serde_yaml::from_str(contents)?;
    let mut seen = HashSet::new();
    for repo in &repos {
        if !seen.insert(&repo.id) {
            return Err(invalid(format!("duplicate repository id `{}`", repo.id)));
        }
    }
    Ok(repos)
}

/// Load a repository list from `path`.
pub fn load_repositories_at(path: &Path) -> Result<Vec<Repository>, SpecError> {
    let contents = read(path)?;
    parse_repositories(&contents).map_err(|err| match err {
        SpecError::Yaml(source) => SpecError::RepositoryParse {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read(path: &Path) -> Result<String, SpecError> {
    if !path.exists() {
        return Err(SpecError::NotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
