//! Error types for fleet-changes.

use std::path::PathBuf;

use thiserror::Error;

use fleet_core::Cancelled;

/// A unified diff that could not be split into file diffs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed diff at line {line}: {message}")]
pub struct DiffParseError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// `transformChanges` groups that would produce ambiguous branches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("transformChanges would lead to multiple changesets in repository {repo_name} to have the same branch {branch:?}")]
    DuplicateBranch { repo_name: String, branch: String },

    #[error("transformChanges group branch for repository {repo_name} is the same as branch {default_branch:?} in changesetTemplate")]
    DefaultBranch {
        repo_name: String,
        default_branch: String,
    },
}

/// Failures of an [`ExecutionCache`](crate::cache::ExecutionCache) backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored entry exists but cannot be decoded.
    #[error("corrupt cache entry at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache entry JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The blocking write task panicked or was aborted.
    #[error("cache write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// `dirs::home_dir()` returned `None`; no default cache directory.
    #[error("could not determine home directory")]
    HomeNotFound,

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Reported by a [`TaskExecutor`](crate::coordinator::TaskExecutor).
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A step exited unsuccessfully.
    #[error("step {index} failed: {message}")]
    StepFailed { index: usize, message: String },

    #[error("execution failed: {0}")]
    Other(String),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Everything that can end one task's changeset assembly.
#[derive(Debug, Error)]
pub enum ChangesError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Parse(#[from] DiffParseError),

    #[error("task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
