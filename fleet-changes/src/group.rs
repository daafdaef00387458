//! `transformChanges` groups: branch-collision checks and diff partitioning.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use fleet_core::types::Group;

use crate::diff::parse_file_diffs;
use crate::error::{DiffParseError, ValidationError};

/// Reject groups that would make two changesets of `repo_name` share a
/// branch. Duplicate group branches are reported before a group branch that
/// equals `default_branch`.
pub fn validate_groups(
    repo_name: &str,
    default_branch: &str,
    groups: &[Group],
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for group in groups {
        if !seen.insert(group.branch.as_str()) {
            return Err(ValidationError::DuplicateBranch {
                repo_name: repo_name.to_string(),
                branch: group.branch.clone(),
            });
        }
    }
    if groups.iter().any(|g| g.branch == default_branch) {
        return Err(ValidationError::DefaultBranch {
            repo_name: repo_name.to_string(),
            default_branch: default_branch.to_string(),
        });
    }
    Ok(())
}

/// Whether `path` is `dir` or lies beneath it. The empty directory contains
/// every path.
pub fn directory_contains(dir: &str, path: &str) -> bool {
    let dir = dir.trim_start_matches("./").trim_matches('/');
    if dir.is_empty() || dir == "." {
        return true;
    }
    match path.strip_prefix(dir) {
        Some("") => true,
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

/// Partition `diff` into branches.
///
/// Each file diff goes to the branch of the last group whose directory
/// contains its path (and whose repository, if set, is `repo_name`), or to
/// `default_branch` when no group matches. The result has a key for
/// `default_branch` and for every group branch, empty when nothing landed
/// there. Texts keep the original file order.
pub fn group_file_diffs(
    repo_name: &str,
    diff: &str,
    default_branch: &str,
    groups: &[Group],
) -> Result<BTreeMap<String, String>, DiffParseError> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    out.insert(default_branch.to_string(), String::new());
    for group in groups {
        out.entry(group.branch.clone()).or_default();
    }

    let files = parse_file_diffs(diff)?;
    if files.is_empty() {
        // Blank-only input: keep its bytes so the branches still add up to `diff`.
        if let Some(text) = out.get_mut(default_branch) {
            text.push_str(diff);
        }
    }
    for file in files {
        let mut branch = default_branch;
        for group in groups {
            if group.applies_to(repo_name) && directory_contains(&group.directory, &file.path) {
                branch = group.branch.as_str();
            }
        }
        debug!(repo = repo_name, path = %file.path, branch, "assigned file diff");
        out.entry(branch.to_string()).or_default().push_str(&file.text);
    }
    Ok(out)
}
