//! Domain types for batch specs and the units of work derived from them.
//!
//! Everything here is plain data: serde-(de)serializable, cloneable, and free
//! of behaviour beyond small accessors. Field names on the wire use the
//! camelCase keys of the batch spec YAML format.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a repository on the code host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoId(pub String);

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RepoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RepoId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Repositories
// ---------------------------------------------------------------------------

/// A repository record as resolved by the (external) repository search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: RepoId,
    /// Fully-qualified name, e.g. `github.com/acme/widgets`.
    pub name: String,
    /// Revision the repository was resolved at, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Paths of the search results that selected this repository.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_matches: Vec<String>,
}

impl Repository {
    pub fn new(id: impl Into<RepoId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rev: None,
            file_matches: vec![],
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// A named output a step publishes for later steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputSpec {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A single command run inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Step {
    pub run: String,
    #[serde(default)]
    pub container: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, OutputSpec>,
    /// Condition deciding whether the step runs.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,
}

impl Step {
    pub fn new(run: impl Into<String>) -> Self {
        Self {
            run: run.into(),
            ..Self::default()
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.if_condition = Some(condition.into());
        self
    }

    /// The condition text, treating an empty string as absent.
    pub fn condition(&self) -> Option<&str> {
        self.if_condition.as_deref().filter(|c| !c.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

/// "For repositories whose name matches `in`, create one workspace per
/// directory that contains `rootAtLocationOf`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfiguration {
    #[serde(rename = "in", default = "match_all")]
    pub in_pattern: String,
    pub root_at_location_of: String,
    #[serde(default)]
    pub only_fetch_workspace: bool,
}

fn match_all() -> String {
    "*".to_string()
}

/// A resolved unit of work: one directory of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoWorkspace {
    pub repo_id: RepoId,
    /// Repository-relative path; `""` is the repository root.
    pub path: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub only_fetch_workspace: bool,
}

// ---------------------------------------------------------------------------
// Transform changes
// ---------------------------------------------------------------------------

/// Diffs under `directory` (in `repository`, if set) go to `branch`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub directory: String,
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

impl Group {
    pub fn new(directory: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            branch: branch.into(),
            repository: None,
        }
    }

    pub fn in_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Whether this group is in effect for `repo_name`.
    pub fn applies_to(&self, repo_name: &str) -> bool {
        match self.repository.as_deref() {
            None | Some("") => true,
            Some(repo) => repo == repo_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformChanges {
    #[serde(default)]
    pub group: Vec<Group>,
}

// ---------------------------------------------------------------------------
// Changeset template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitTemplate {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangesetTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Default branch every changeset is pushed to unless regrouped.
    pub branch: String,
    #[serde(default)]
    pub commit: CommitTemplate,
    #[serde(default)]
    pub published: bool,
}

impl ChangesetTemplate {
    pub fn with_branch(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Batch spec
// ---------------------------------------------------------------------------

/// Root of a batch spec document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub workspaces: Vec<WorkspaceConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_changes: Option<TransformChanges>,
    #[serde(default)]
    pub changeset_template: ChangesetTemplate,
}

impl BatchSpec {
    pub fn with_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Groups of `transformChanges` in effect for `repo_name`, in spec order.
    pub fn groups_for_repository(&self, repo_name: &str) -> Vec<Group> {
        self.transform_changes
            .as_ref()
            .map(|t| {
                t.group
                    .iter()
                    .filter(|g| g.applies_to(repo_name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
