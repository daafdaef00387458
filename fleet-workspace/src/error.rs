//! Error types for fleet-workspace.

use std::path::PathBuf;

use thiserror::Error;

use fleet_core::glob::GlobError;
use fleet_core::Cancelled;

/// Errors reported by a [`DirectoryFinder`](crate::finder::DirectoryFinder).
#[derive(Debug, Error)]
pub enum FinderError {
    /// I/O failure while walking a checkout.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The search was abandoned because the run was cancelled.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// A blocking search task panicked or was aborted.
    #[error("directory search task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The backing search service could not answer.
    #[error("directory search unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Fatal errors while mapping repositories to workspaces. No partial result
/// accompanies any of these.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// A workspace configuration's `in` pattern does not compile.
    #[error("invalid workspace pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: GlobError,
    },

    /// The directory finder failed.
    #[error("finding directories containing {file_name:?} failed: {source}")]
    Finder {
        file_name: String,
        #[source]
        source: FinderError,
    },

    #[error("workspace resolution cancelled")]
    Cancelled(#[from] Cancelled),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> FinderError {
    FinderError::Io {
        path: path.into(),
        source,
    }
}
