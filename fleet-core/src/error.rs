//! Error types for fleet-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading or validating a batch spec.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Underlying I/O failure while reading a spec or repository list.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error for an in-memory document.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path and serde_yaml's line context.
    #[error("failed to parse batch spec at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// YAML parse error on loading a repository list file.
    #[error("failed to parse repository list at {path}: {source}")]
    RepositoryParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The spec or repository list file did not exist.
    #[error("file not found at {path}")]
    NotFound { path: PathBuf },

    /// The spec parsed but is structurally unusable.
    #[error("invalid batch spec: {reason}")]
    Invalid { reason: String },
}

pub(crate) fn invalid(reason: impl Into<String>) -> SpecError {
    SpecError::Invalid {
        reason: reason.into(),
    }
}
