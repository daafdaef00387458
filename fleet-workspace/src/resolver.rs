//! Workspace resolution: map each repository to the directories its steps
//! run in.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use fleet_core::glob;
use fleet_core::types::{BatchSpec, RepoId, RepoWorkspace, Repository};
use fleet_core::CancellationSignal;

use crate::error::ResolutionError;
use crate::finder::{normalize_dir, DirectoryFinder};

/// Resolve the workspaces of every repository in `repos`.
///
/// Each workspace configuration (in spec order) selects the repositories
/// whose name matches its `in` glob and asks `finder` once for all of them.
/// Every returned directory becomes a workspace with the full step list.
/// When several configurations match a repository their directories are
/// unioned; a directory already contributed by an earlier configuration
/// keeps that configuration's `only_fetch_workspace`.
///
/// A repository that ends up with no directory gets a single root workspace.
/// Output is grouped by repository in input order.
pub async fn resolve<F>(
    spec: &BatchSpec,
    finder: &F,
    repos: &[Repository],
    cancel: &CancellationSignal,
) -> Result<Vec<RepoWorkspace>, ResolutionError>
where
    F: DirectoryFinder + ?Sized,
{
    let mut found: HashMap<RepoId, Vec<(String, bool)>> = HashMap::new();

    for conf in &spec.workspaces {
        let matcher = glob::compile(&conf.in_pattern).map_err(|source| ResolutionError::Pattern {
            pattern: conf.in_pattern.clone(),
            source,
        })?;
        let matched: Vec<Repository> = repos
            .iter()
            .filter(|r| matcher.is_match(&r.name))
            .cloned()
            .collect();
        if matched.is_empty() {
            debug!(pattern = %conf.in_pattern, "workspace configuration matches no repository");
            continue;
        }

        let dirs = cancel
            .run(finder.find_directories_in_repos(&conf.root_at_location_of, &matched, cancel))
            .await?
            .map_err(|source| ResolutionError::Finder {
                file_name: conf.root_at_location_of.clone(),
                source,
            })?;

        for repo in &matched {
            let Some(list) = dirs.get(&repo.id) else {
                debug!(repo = %repo.name, file_name = %conf.root_at_location_of, "no directories found");
                continue;
            };
            let entry = found.entry(repo.id.clone()).or_default();
            for dir in list {
                let path = normalize_dir(dir);
                if !entry.iter().any(|(p, _)| *p == path) {
                    entry.push((path, conf.only_fetch_workspace));
                }
            }
        }
    }

    let mut workspaces = Vec::new();
    let mut seen: HashSet<&RepoId> = HashSet::new();
    for repo in repos {
        if !seen.insert(&repo.id) {
            continue;
        }
        match found.get(&repo.id) {
            Some(dirs) if !dirs.is_empty() => {
                for (path, only_fetch_workspace) in dirs {
                    workspaces.push(RepoWorkspace {
                        repo_id: repo.id.clone(),
                        path: path.clone(),
                        steps: spec.steps.clone(),
                        only_fetch_workspace: *only_fetch_workspace,
                    });
                }
            }
            _ => workspaces.push(RepoWorkspace {
                repo_id: repo.id.clone(),
                path: String::new(),
                steps: spec.steps.clone(),
                only_fetch_workspace: false,
            }),
        }
    }

    info!(
        repositories = seen.len(),
        workspaces = workspaces.len(),
        "resolved workspaces"
    );
    Ok(workspaces)
}
