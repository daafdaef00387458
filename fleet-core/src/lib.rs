//! Fleet core library — batch spec model, spec loading, shared primitives.
//!
//! - [`types`] — repositories, steps, workspaces, groups, changeset template
//! - [`spec`] — load / parse / validate a batch spec
//! - [`error`] — [`SpecError`]
//! - [`glob`] — repository-name and path glob matching
//! - [`cache_key`] — content-addressed [`ExecutionCacheKey`]
//! - [`cancel`] — cooperative cancellation shared by async collaborators

pub mod cache_key;
pub mod cancel;
pub mod error;
pub mod glob;
pub mod spec;
pub mod types;

pub use cache_key::ExecutionCacheKey;
pub use cancel::{cancellation, CancellationHandle, CancellationSignal, Cancelled};
pub use error::SpecError;
pub use types::{
    BatchSpec, ChangesetTemplate, CommitAuthor, CommitTemplate, Group, OutputSpec, RepoId,
    RepoWorkspace, Repository, Step, TransformChanges, WorkspaceConfiguration,
};
