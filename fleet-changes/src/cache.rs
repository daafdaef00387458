//! Execution cache: the diff produced by a task, keyed by
//! [`ExecutionCacheKey`].
//!
//! Two backends:
//! - [`InMemoryExecutionCache`] — process-local, shared through an `Arc`
//! - [`DiskExecutionCache`] — one JSON file per key under
//!   `<home>/.fleet/cache/`, written with the `.tmp` + rename pattern so a
//!   reader never sees a partial entry

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fleet_core::{CancellationSignal, Cancelled, ExecutionCacheKey};

use crate::error::{io_err, CacheError};

/// Content-addressed store of execution results. Absence is `Ok(None)`;
/// the last `set` for a key wins.
#[async_trait]
pub trait ExecutionCache: Send + Sync {
    async fn get(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<Option<String>, CacheError>;

    async fn set(
        &self,
        key: &ExecutionCacheKey,
        diff: &str,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError>;

    /// Forget `key`. Clearing an absent key succeeds.
    async fn clear(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError>;
}

fn check(cancel: &CancellationSignal) -> Result<(), CacheError> {
    if cancel.is_cancelled() {
        return Err(Cancelled.into());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct InMemoryExecutionCache {
    entries: DashMap<String, String>,
}

impl InMemoryExecutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ExecutionCache for InMemoryExecutionCache {
    async fn get(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<Option<String>, CacheError> {
        check(cancel)?;
        Ok(self.entries.get(&key.key()).map(|e| e.value().clone()))
    }

    async fn set(
        &self,
        key: &ExecutionCacheKey,
        diff: &str,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError> {
        check(cancel)?;
        self.entries.insert(key.key(), diff.to_string());
        Ok(())
    }

    async fn clear(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError> {
        check(cancel)?;
        self.entries.remove(&key.key());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// On disk
// ---------------------------------------------------------------------------

/// On-disk cache entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: ExecutionCacheKey,
    pub diff: String,
    pub stored_at: DateTime<Utc>,
}

/// `<home>/.fleet/cache`
pub fn cache_dir_at(home: &Path) -> PathBuf {
    home.join(".fleet").join("cache")
}

/// Distinguishes concurrent writers' temporary files within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct DiskExecutionCache {
    dir: PathBuf,
}

impl DiskExecutionCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache rooted at `<home>/.fleet/cache`.
    pub fn at_home(home: &Path) -> Self {
        Self::new(cache_dir_at(home))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<dir>/<sha256>.json`
    pub fn entry_path(&self, key: &ExecutionCacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.key()))
    }

    fn tmp_path(&self, path: &Path) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}.{n}.tmp", std::process::id()))
    }

    async fn read_entry(&self, key: &ExecutionCacheKey) -> Result<Option<String>, CacheError> {
        let path = self.entry_path(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };
        let entry: CacheEntry = serde_json::from_str(&contents)
            .map_err(|source| CacheError::Corrupt { path: path.clone(), source })?;
        if entry.key != *key {
            debug!(path = %path.display(), "cache entry belongs to a different key");
            return Ok(None);
        }
        Ok(Some(entry.diff))
    }
}

/// Write `json` to `tmp` and move it over `path`. On failure the temporary
/// file is removed, so a finished call never leaves one behind.
fn write_entry(dir: &Path, tmp: &Path, path: &Path, json: &str) -> Result<(), CacheError> {
    let result = std::fs::create_dir_all(dir)
        .map_err(|e| io_err(dir, e))
        .and_then(|()| std::fs::write(tmp, json).map_err(|e| io_err(tmp, e)))
        .and_then(|()| std::fs::rename(tmp, path).map_err(|e| io_err(path, e)));
    if result.is_err() {
        let _ = std::fs::remove_file(tmp);
    }
    result
}

#[async_trait]
impl ExecutionCache for DiskExecutionCache {
    async fn get(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<Option<String>, CacheError> {
        cancel.run(self.read_entry(key)).await?
    }

    async fn set(
        &self,
        key: &ExecutionCacheKey,
        diff: &str,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry {
            key: key.clone(),
            diff: diff.to_string(),
            stored_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        let path = self.entry_path(key);
        let tmp = self.tmp_path(&path);

        check(cancel)?;
        // A write already in flight finishes even if the signal fires.
        let dir = self.dir.clone();
        let write = tokio::task::spawn_blocking(move || write_entry(&dir, &tmp, &path, &json));
        match cancel.run(write).await? {
            Ok(result) => result,
            Err(join) => Err(CacheError::Task(join)),
        }
    }

    async fn clear(
        &self,
        key: &ExecutionCacheKey,
        cancel: &CancellationSignal,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let removed = cancel.run(tokio::fs::remove_file(&path)).await?;
        match removed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::types::{Repository, Step};
    use tempfile::TempDir;

    fn key(run: &str) -> ExecutionCacheKey {
        ExecutionCacheKey {
            repository: Repository::new("repo-id-0", "github.com/acme/widgets"),
            path: String::new(),
            only_fetch_workspace: false,
            steps: vec![Step::new(run)],
        }
    }

    #[test]
    fn cache_dir_is_under_home() {
        let home = Path::new("/home/u");
        assert_eq!(cache_dir_at(home), PathBuf::from("/home/u/.fleet/cache"));
    }

    #[tokio::test]
    async fn no_tmp_files_left_after_set() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskExecutionCache::new(tmp.path());
        let never = CancellationSignal::never();
        cache.set(&key("echo 1"), "diff", &never).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.json", key("echo 1").key())]);
    }

    #[tokio::test]
    async fn entry_for_other_key_is_a_miss() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskExecutionCache::new(tmp.path());
        let never = CancellationSignal::never();
        cache.set(&key("echo 1"), "diff", &never).await.unwrap();
        std::fs::rename(cache.entry_path(&key("echo 1")), cache.entry_path(&key("echo 2")))
            .unwrap();
        assert_eq!(cache.get(&key("echo 2"), &never).await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_entry_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let cache = DiskExecutionCache::new(tmp.path());
        std::fs::write(cache.entry_path(&key("echo 1")), "{not json").unwrap();
        let err = cache
            .get(&key("echo 1"), &CancellationSignal::never())
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }), "got: {err}");
    }
}
