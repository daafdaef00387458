//! fleet-changes: everything after a task has been planned.
//!
//! - [`diff`] — split a unified diff into per-file segments
//! - [`group`] — validate `transformChanges` groups and partition diffs by branch
//! - [`cache`] — [`ExecutionCache`] with in-memory and on-disk backends
//! - [`changeset`] — [`ChangesetSpec`]s built from grouped diffs
//! - [`coordinator`] — bounded-parallel task execution through cache and executor

pub mod cache;
pub mod changeset;
pub mod coordinator;
pub mod diff;
pub mod error;
pub mod group;

pub use cache::{DiskExecutionCache, ExecutionCache, InMemoryExecutionCache};
pub use changeset::{build_changeset_specs, ChangesetSpec};
pub use coordinator::{Coordinator, ExecutionOptions, TaskExecutor, TaskOutcome};
pub use diff::{parse_file_diffs, FileDiff};
pub use error::{CacheError, ChangesError, DiffParseError, ExecutionError, ValidationError};
pub use group::{group_file_diffs, validate_groups};
