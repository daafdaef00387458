//! fleet-workspace: from a batch spec and a repository list to executable
//! tasks.
//!
//! - [`finder`] — [`DirectoryFinder`] and its checkout/static implementations
//! - [`resolver`] — repositories to [`RepoWorkspace`](fleet_core::RepoWorkspace)s
//! - [`planner`] — per-repository step narrowing and [`Task`] assembly

pub mod error;
pub mod finder;
pub mod planner;
pub mod resolver;

pub use error::{FinderError, ResolutionError};
pub use finder::{CheckoutDirectoryFinder, DirectoryFinder, StaticDirectoryFinder};
pub use planner::{build_tasks, steps_for_repo, PlanFailure, Task, TaskPlan};
pub use resolver::resolve;
