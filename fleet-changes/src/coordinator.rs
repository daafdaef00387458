//! Running tasks: cache lookup, execution, grouping and changeset assembly
//! with bounded parallelism.
//!
//! ```text
//! tasks → [Semaphore] → validate groups → cache get ─hit─┐
//!                                          │ miss         ├→ group diff → changeset specs
//!                                          └→ executor → cache set ┘
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use fleet_core::types::{Group, RepoId};
use fleet_core::CancellationSignal;
use fleet_workspace::Task;

use crate::cache::{cache_dir_at, DiskExecutionCache, ExecutionCache};
use crate::changeset::{build_changeset_specs, ChangesetSpec};
use crate::error::{CacheError, ChangesError, ExecutionError, ValidationError};
use crate::group::{group_file_diffs, validate_groups};

/// Runs a task's steps and returns the resulting unified diff.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(
        &self,
        task: &Task,
        cancel: &CancellationSignal,
    ) -> Result<String, ExecutionError>;
}

/// Run-level knobs, all set from CLI flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum number of tasks in flight.
    pub parallelism: usize,
    /// Skip cache lookups; results are still stored.
    pub clear_cache: bool,
    pub cache_dir: PathBuf,
}

impl ExecutionOptions {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            parallelism: default_parallelism(),
            clear_cache: false,
            cache_dir: cache_dir.into(),
        }
    }

    /// Options with the cache under `<home>/.fleet/cache`.
    pub fn at_home(home: &Path) -> Self {
        Self::new(cache_dir_at(home))
    }

    /// Options with the cache under the current user's home directory.
    pub fn from_home() -> Result<Self, CacheError> {
        let home = dirs::home_dir().ok_or(CacheError::HomeNotFound)?;
        Ok(Self::at_home(&home))
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// What happened to one task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub task: Task,
    /// The diff came from the cache rather than the executor.
    pub cached: bool,
    pub result: Result<Vec<ChangesetSpec>, ChangesError>,
}

/// Drives tasks through cache, executor and grouper.
#[derive(Clone)]
pub struct Coordinator {
    cache: Arc<dyn ExecutionCache>,
    executor: Arc<dyn TaskExecutor>,
    options: ExecutionOptions,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("options", &self.options)
            .finish()
    }
}

impl Coordinator {
    pub fn new(
        cache: Arc<dyn ExecutionCache>,
        executor: Arc<dyn TaskExecutor>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            cache,
            executor,
            options,
        }
    }

    /// Coordinator whose cache lives on disk under `options.cache_dir`.
    pub fn with_disk_cache(executor: Arc<dyn TaskExecutor>, options: ExecutionOptions) -> Self {
        let cache = Arc::new(DiskExecutionCache::new(options.cache_dir.clone()));
        Self::new(cache, executor, options)
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Run every task, at most `parallelism` at a time. Outcomes are returned
    /// in task order; a failing task does not stop the others, except that
    /// tasks of one repository whose changesets share a branch all fail.
    pub async fn run(&self, tasks: Vec<Task>, cancel: &CancellationSignal) -> Vec<TaskOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.options.parallelism.max(1)));
        info!(
            tasks = tasks.len(),
            parallelism = self.options.parallelism,
            "running tasks"
        );

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let this = self.clone();
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                let spawned = task.clone();
                let handle = tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return Err(ChangesError::from(ExecutionError::Other(
                            "worker pool closed".into(),
                        )));
                    };
                    this.run_task(&spawned, &cancel).await
                });
                (task, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (task, handle) in handles {
            let (cached, result) = match handle.await {
                Ok(Ok((specs, cached))) => (cached, Ok(specs)),
                Ok(Err(e)) => (false, Err(e)),
                Err(join) => (false, Err(ChangesError::Join(join))),
            };
            match &result {
                Ok(specs) => info!(
                    repo = %task.repository.name,
                    path = %task.path,
                    changesets = specs.len(),
                    cached,
                    "task finished"
                ),
                Err(e) => warn!(repo = %task.repository.name, path = %task.path, error = %e, "task failed"),
            }
            outcomes.push(TaskOutcome {
                task,
                cached,
                result,
            });
        }
        reject_shared_branches(&mut outcomes);
        outcomes
    }

    /// One task end to end. Returns its changeset specs and whether the diff
    /// was served from the cache.
    pub async fn run_task(
        &self,
        task: &Task,
        cancel: &CancellationSignal,
    ) -> Result<(Vec<ChangesetSpec>, bool), ChangesError> {
        let repo = &task.repository;
        let default_branch = &task.template.branch;
        let groups: Vec<Group> = task
            .transform_changes
            .as_ref()
            .map(|t| {
                t.group
                    .iter()
                    .filter(|g| g.applies_to(&repo.name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        validate_groups(&repo.name, default_branch, &groups)?;

        if cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled(fleet_core::Cancelled).into());
        }

        let key = task.cache_key();
        let cached = if self.options.clear_cache {
            None
        } else {
            self.cache.get(&key, cancel).await?
        };

        let (diff, hit) = match cached {
            Some(diff) => {
                debug!(repo = %repo.name, path = %task.path, "execution cache hit");
                (diff, true)
            }
            None => {
                let diff = self.executor.execute(task, cancel).await?;
                self.cache.set(&key, &diff, cancel).await?;
                (diff, false)
            }
        };

        let by_branch = group_file_diffs(&repo.name, &diff, default_branch, &groups)?;
        Ok((build_changeset_specs(repo, &task.template, &by_branch), hit))
    }
}

/// Fail every outcome whose changesets reuse a branch already taken by
/// another workspace of the same repository.
fn reject_shared_branches(outcomes: &mut [TaskOutcome]) {
    let mut owners: BTreeMap<(RepoId, String), Vec<usize>> = BTreeMap::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        let Ok(specs) = &outcome.result else {
            continue;
        };
        for spec in specs {
            owners
                .entry((outcome.task.repository.id.clone(), spec.branch().to_string()))
                .or_default()
                .push(i);
        }
    }

    let mut shared: BTreeMap<usize, String> = BTreeMap::new();
    for ((_, branch), tasks) in owners {
        if tasks.len() > 1 {
            for i in tasks {
                shared.entry(i).or_insert_with(|| branch.clone());
            }
        }
    }

    for (i, branch) in shared {
        let outcome = &mut outcomes[i];
        let repo_name = outcome.task.repository.name.clone();
        warn!(repo = %repo_name, path = %outcome.task.path, %branch, "branch shared by several workspaces");
        outcome.result = Err(ValidationError::DuplicateBranch { repo_name, branch }.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_at_home() {
        let opts = ExecutionOptions::at_home(Path::new("/home/u"));
        assert_eq!(opts.cache_dir, PathBuf::from("/home/u/.fleet/cache"));
        assert!(opts.parallelism >= 1);
        assert!(!opts.clear_cache);
    }

    #[test]
    fn options_from_home_use_fleet_cache() {
        if let Ok(opts) = ExecutionOptions::from_home() {
            assert!(opts.cache_dir.ends_with(".fleet/cache"));
        }
    }
}
