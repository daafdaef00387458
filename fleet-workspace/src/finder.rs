//! Directory finders: which directories of a repository contain a marker
//! file such as `go.mod` or `package.json`.
//!
//! Paths are repository-relative with `/` separators; `""` is the root.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use fleet_core::types::{RepoId, Repository};
use fleet_core::CancellationSignal;

use crate::error::{io_err, FinderError};

/// Answers "which directories contain `file_name`" for a batch of
/// repositories in a single call.
#[async_trait]
pub trait DirectoryFinder: Send + Sync {
    /// Repositories missing from the returned map have no such directory.
    async fn find_directories_in_repos(
        &self,
        file_name: &str,
        repos: &[Repository],
        cancel: &CancellationSignal,
    ) -> Result<HashMap<RepoId, Vec<String>>, FinderError>;
}

/// Canonical form of a finder directory: `""` for the root, no leading or
/// trailing `/`.
pub fn normalize_dir(dir: &str) -> String {
    let trimmed = dir.trim().trim_start_matches("./").trim_matches('/');
    if trimmed == "." {
        String::new()
    } else {
        trimmed.to_string()
    }
}

// ---------------------------------------------------------------------------
// Static finder
// ---------------------------------------------------------------------------

/// Finder backed by a fixed map, keyed by marker file name.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectoryFinder {
    results: HashMap<String, HashMap<RepoId, Vec<String>>>,
}

impl StaticDirectoryFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dirs(
        mut self,
        file_name: impl Into<String>,
        repo: impl Into<RepoId>,
        dirs: &[&str],
    ) -> Self {
        self.results
            .entry(file_name.into())
            .or_default()
            .insert(repo.into(), dirs.iter().map(|d| d.to_string()).collect());
        self
    }
}

#[async_trait]
impl DirectoryFinder for StaticDirectoryFinder {
    async fn find_directories_in_repos(
        &self,
        file_name: &str,
        repos: &[Repository],
        cancel: &CancellationSignal,
    ) -> Result<HashMap<RepoId, Vec<String>>, FinderError> {
        if cancel.is_cancelled() {
            return Err(fleet_core::Cancelled.into());
        }
        let Some(by_repo) = self.results.get(file_name) else {
            return Ok(HashMap::new());
        };
        Ok(repos
            .iter()
            .filter_map(|r| by_repo.get(&r.id).map(|d| (r.id.clone(), d.clone())))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Checkout finder
// ---------------------------------------------------------------------------

/// Finder that walks local checkouts laid out as `<root>/<repository name>`.
#[derive(Debug, Clone)]
pub struct CheckoutDirectoryFinder {
    root: PathBuf,
}

impl CheckoutDirectoryFinder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn checkout_path(&self, repo: &Repository) -> PathBuf {
        self.root.join(&repo.name)
    }
}

#[async_trait]
impl DirectoryFinder for CheckoutDirectoryFinder {
    async fn find_directories_in_repos(
        &self,
        file_name: &str,
        repos: &[Repository],
        cancel: &CancellationSignal,
    ) -> Result<HashMap<RepoId, Vec<String>>, FinderError> {
        let mut out = HashMap::new();
        for repo in repos {
            if cancel.is_cancelled() {
                return Err(fleet_core::Cancelled.into());
            }
            let checkout = self.checkout_path(repo);
            let marker = file_name.to_string();
            let dirs = tokio::task::spawn_blocking(move || find_in_checkout(&checkout, &marker))
                .await??;
            debug!(repo = %repo.name, count = dirs.len(), file_name, "found marker directories");
            if !dirs.is_empty() {
                out.insert(repo.id.clone(), dirs);
            }
        }
        Ok(out)
    }
}

/// Sorted repository-relative directories under `checkout` that contain a
/// regular file named `marker`. A missing checkout has none.
fn find_in_checkout(checkout: &Path, marker: &str) -> Result<Vec<String>, FinderError> {
    if !checkout.exists() {
        return Ok(vec![]);
    }
    let mut dirs = Vec::new();
    collect_marker_dirs(checkout, checkout, marker, &mut dirs)?;
    dirs.sort();
    Ok(dirs)
}

fn collect_marker_dirs(
    root: &Path,
    dir: &Path,
    marker: &str,
    out: &mut Vec<String>,
) -> Result<(), FinderError> {
    if dir.join(marker).is_file() {
        let rel = dir.strip_prefix(root).unwrap_or(dir);
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push(normalize_dir(&rel));
    }

    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() && entry.file_name() != ".git" {
            collect_marker_dirs(root, &path, marker, out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn normalizes_directories() {
        assert_eq!(normalize_dir("."), "");
        assert_eq!(normalize_dir("/"), "");
        assert_eq!(normalize_dir(""), "");
        assert_eq!(normalize_dir("./a/b/"), "a/b");
        assert_eq!(normalize_dir("/a/b"), "a/b");
    }

    #[tokio::test]
    async fn checkout_finder_walks_repository() {
        let tmp = TempDir::new().expect("tempdir");
        let repo = Repository::new("repo-id-0", "github.com/acme/monorepo");
        let checkout = tmp.path().join(&repo.name);
        for dir in ["", "a/b", "a/b/c", "d", ".git/hooks"] {
            fs::create_dir_all(checkout.join(dir)).expect("mkdir");
        }
        for dir in ["", "a/b", "a/b/c", ".git/hooks"] {
            fs::write(checkout.join(dir).join("go.mod"), "module x\n").expect("write");
        }
        fs::write(checkout.join("d").join("README.md"), "").expect("write");

        let finder = CheckoutDirectoryFinder::new(tmp.path());
        let found = finder
            .find_directories_in_repos("go.mod", &[repo.clone()], &CancellationSignal::never())
            .await
            .expect("find");
        assert_eq!(
            found.get(&repo.id).expect("repo"),
            &vec!["".to_string(), "a/b".to_string(), "a/b/c".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_checkout_has_no_directories() {
        let tmp = TempDir::new().expect("tempdir");
        let repo = Repository::new("repo-id-9", "github.com/acme/absent");
        let finder = CheckoutDirectoryFinder::new(tmp.path());
        let found = finder
            .find_directories_in_repos("go.mod", &[repo], &CancellationSignal::never())
            .await
            .expect("find");
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn cancelled_search_fails() {
        let (handle, signal) = fleet_core::cancellation();
        handle.cancel();
        let finder = CheckoutDirectoryFinder::new("/nonexistent");
        let err = finder
            .find_directories_in_repos("go.mod", &[Repository::new("r", "n")], &signal)
            .await
            .unwrap_err();
        assert!(matches!(err, FinderError::Cancelled(_)), "got: {err}");
    }
}
