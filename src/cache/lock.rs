//! Per-repository advisory file locks.
//!
//! Clone creation, fetch and worktree materialization for one repository must
//! not interleave, whether the competitor is another task in this process or
//! another gitpin process sharing the cache. Each repository gets a lock file
//! under `<cache>/.locks/`, named after its cache key, and holders take an
//! exclusive `flock`-style lock on it for the duration of the critical section.
//!
//! The lock is released when the [`CacheLock`] guard is dropped. Lock files are
//! never deleted, so there is no window in which two processes lock different
//! inodes for the same name.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive lock on one repository's cache entries.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the lock named `key` is held.
    ///
    /// The blocking wait runs on tokio's blocking pool so other repositories keep
    /// making progress.
    pub async fn acquire(cache_dir: &Path, key: &str) -> Result<Self> {
        let locks_dir = cache_dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.with_context(|| {
            format!("Failed to create locks directory at {}", locks_dir.display())
        })?;

        let lock_path = locks_dir.join(format!("{key}.lock"));
        let open_path = lock_path.clone();
        let key = key.to_string();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&open_path)
                .with_context(|| format!("Failed to open lock file: {}", open_path.display()))?;

            tracing::trace!(target: "cache", "Waiting for lock {}", key);
            file.lock_exclusive().with_context(|| format!("Failed to acquire lock for: {key}"))?;
            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        tracing::trace!(target: "cache", "Acquired lock {}", lock_path.display());
        Ok(Self {
            file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(target: "cache", "Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
