//! Changeset specs: one pushable branch with its diff and metadata.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use fleet_core::types::{ChangesetTemplate, CommitAuthor, RepoId, Repository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetSpec {
    pub base_repository: RepoId,
    pub repository_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rev: Option<String>,
    /// `refs/heads/<branch>`
    pub head_ref: String,
    pub title: String,
    pub body: String,
    pub commit_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_author: Option<CommitAuthor>,
    pub diff: String,
    pub published: bool,
}

impl ChangesetSpec {
    /// Branch name without the `refs/heads/` prefix.
    pub fn branch(&self) -> &str {
        self.head_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&self.head_ref)
    }
}

pub fn head_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

/// One spec per branch whose diff has content beyond whitespace, in branch
/// order.
pub fn build_changeset_specs(
    repo: &Repository,
    template: &ChangesetTemplate,
    diffs_by_branch: &BTreeMap<String, String>,
) -> Vec<ChangesetSpec> {
    diffs_by_branch
        .iter()
        .filter(|(_, diff)| !diff.trim().is_empty())
        .map(|(branch, diff)| ChangesetSpec {
            base_repository: repo.id.clone(),
            repository_name: repo.name.clone(),
            base_rev: repo.rev.clone(),
            head_ref: head_ref(branch),
            title: template.title.clone(),
            body: template.body.clone(),
            commit_message: template.commit.message.clone(),
            commit_author: template.commit.author.clone(),
            diff: diff.clone(),
            published: template.published,
        })
        .collect()
}
