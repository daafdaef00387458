//! Step planning: narrow each repository's steps before execution and pair
//! them with its workspaces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fleet_core::types::{
    BatchSpec, ChangesetTemplate, RepoId, RepoWorkspace, Repository, Step, TransformChanges,
};
use fleet_core::ExecutionCacheKey;
use fleet_template::{evaluate, Condition, EvaluationError, PlanningFacts};

/// The steps of `spec` that can still run in `repo`, in spec order.
///
/// Excluded steps are dropped. Deferred steps keep running with their
/// condition replaced by the residual. Applying this to its own output
/// changes nothing.
pub fn steps_for_repo(spec: &BatchSpec, repo: &Repository) -> Result<Vec<Step>, EvaluationError> {
    let facts = PlanningFacts::new(spec, repo);
    let mut steps = Vec::with_capacity(spec.steps.len());
    for (index, step) in spec.steps.iter().enumerate() {
        match evaluate(step.condition(), &facts)? {
            Condition::Included => steps.push(step.clone()),
            Condition::Excluded => {
                debug!(repo = %repo.name, index, run = %step.run, "step excluded");
            }
            Condition::Deferred(residual) => {
                let mut step = step.clone();
                step.if_condition = Some(residual);
                steps.push(step);
            }
        }
    }
    Ok(steps)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// One executable unit: a workspace of a repository with its planned steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub repository: Repository,
    pub path: String,
    pub steps: Vec<Step>,
    pub only_fetch_workspace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_changes: Option<TransformChanges>,
    pub template: ChangesetTemplate,
}

impl Task {
    pub fn cache_key(&self) -> ExecutionCacheKey {
        ExecutionCacheKey {
            repository: self.repository.clone(),
            path: self.path.clone(),
            only_fetch_workspace: self.only_fetch_workspace,
            steps: self.steps.clone(),
        }
    }
}

/// A repository whose conditions could not be evaluated.
#[derive(Debug)]
pub struct PlanFailure {
    pub repository: Repository,
    pub error: EvaluationError,
}

#[derive(Debug, Default)]
pub struct TaskPlan {
    pub tasks: Vec<Task>,
    pub failures: Vec<PlanFailure>,
}

/// Combine resolved workspaces with each repository's planned steps.
///
/// Steps are planned once per repository and shared by all of its
/// workspaces. A repository whose conditions fail to evaluate is reported in
/// [`TaskPlan::failures`] without affecting the others. Workspaces whose
/// repository has no remaining steps produce no task.
pub fn build_tasks(
    spec: &BatchSpec,
    repos: &[Repository],
    workspaces: &[RepoWorkspace],
) -> TaskPlan {
    let mut plan = TaskPlan::default();
    let mut planned: HashMap<&RepoId, (&Repository, Vec<Step>)> = HashMap::new();

    for repo in repos {
        if planned.contains_key(&repo.id) || plan.failures.iter().any(|f| f.repository.id == repo.id)
        {
            continue;
        }
        match steps_for_repo(spec, repo) {
            Ok(steps) => {
                if steps.is_empty() {
                    debug!(repo = %repo.name, "no steps left after planning");
                }
                planned.insert(&repo.id, (repo, steps));
            }
            Err(error) => {
                warn!(repo = %repo.name, %error, "failed to evaluate step conditions");
                plan.failures.push(PlanFailure {
                    repository: repo.clone(),
                    error,
                });
            }
        }
    }

    for ws in workspaces {
        let Some((repo, steps)) = planned.get(&ws.repo_id) else {
            continue;
        };
        if steps.is_empty() {
            continue;
        }
        plan.tasks.push(Task {
            repository: (*repo).clone(),
            path: ws.path.clone(),
            steps: steps.clone(),
            only_fetch_workspace: ws.only_fetch_workspace,
            transform_changes: spec.transform_changes.clone(),
            template: spec.changeset_template.clone(),
        });
    }
    plan
}
