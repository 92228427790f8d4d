//! Cache store for git sources.
//!
//! The cache owns everything gitpin keeps on disk between runs:
//!
//! ```text
//! <cache>/
//! ├── .locks/                           per-repository lock files
//! ├── sources/<slug>-<hash>.git         one bare clone per repository
//! ├── worktrees/<slug>-<hash>-<sha12>   one checkout per pinned revision
//! ├── worktrees/<slug>-<hash>-<sha12>-sub   ... with submodules initialized
//! ├── metadata/                         parsed package metadata per revision
//! └── extensions/                       extension build outputs
//! ```
//!
//! `<hash>` is derived from the normalized repository URL, so the same
//! repository maps to the same directories from any project and after the
//! project is moved. Directory names never depend on the working directory.
//!
//! # Guarantees
//!
//! - At most one bare clone per repository. Clones are made in a temporary
//!   directory and renamed into place, so an interrupted clone leaves nothing
//!   behind that could be mistaken for a valid entry.
//! - [`Cache::materialize`] is idempotent: an existing checkout at the requested
//!   revision is returned as-is, without touching the network.
//! - Every mutation of one repository's entries runs under its [`CacheLock`],
//!   shared with other gitpin processes using the same cache.
//! - Nothing is deleted implicitly. [`Cache::clean`] is the explicit cleanup.

pub mod lock;

use anyhow::{Context, Result};
use dashmap::{DashMap, DashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs as async_fs;

use crate::git::{GitRepo, repo_slug, url_hash};
use crate::models::ResolvedRevision;
pub use lock::CacheLock;

const SOURCES_DIR: &str = "sources";
const WORKTREES_DIR: &str = "worktrees";
const METADATA_DIR: &str = "metadata";
const EXTENSIONS_DIR: &str = "extensions";

/// A bare clone in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneHandle {
    /// Normalized repository URL.
    pub uri: String,
    /// Stable cache key, `<slug>-<hash>`.
    pub key: String,
    /// Path of the bare repository.
    pub path: PathBuf,
}

impl CloneHandle {
    pub fn repo(&self) -> GitRepo {
        GitRepo::new(&self.path)
    }
}

/// Cache store rooted at one directory. Cheap to clone; clones share the
/// per-run bookkeeping.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    /// Clones already fetched or freshly cloned during this run.
    fetched: Arc<DashSet<PathBuf>>,
    /// Worktrees verified during this run, keyed by directory name.
    materialized: Arc<DashMap<String, PathBuf>>,
}

impl Cache {
    /// Cache in the configured default location.
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(crate::config::get_cache_dir()?))
    }

    /// A relative `dir` is anchored at the current directory.
    pub fn with_dir(dir: PathBuf) -> Self {
        let dir = std::path::absolute(&dir).unwrap_or(dir);
        Self {
            dir,
            fetched: Arc::new(DashSet::new()),
            materialized: Arc::new(DashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_cache_dir(&self) -> Result<()> {
        async_fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", self.dir.display()))
    }

    /// `<slug>-<hash>` for a normalized URL.
    pub fn key_for(normalized_uri: &str) -> String {
        format!("{}-{}", repo_slug(normalized_uri), url_hash(normalized_uri))
    }

    /// Where the bare clone of `normalized_uri` lives, whether or not it exists.
    pub fn clone_path(&self, normalized_uri: &str) -> PathBuf {
        self.dir.join(SOURCES_DIR).join(format!("{}.git", Self::key_for(normalized_uri)))
    }

    /// Where the checkout of `revision` lives, whether or not it exists.
    pub fn worktree_path(&self, handle: &CloneHandle, revision: &ResolvedRevision, submodules: bool) -> PathBuf {
        let suffix = if submodules { "-sub" } else { "" };
        self.dir
            .join(WORKTREES_DIR)
            .join(format!("{}-{}{}", handle.key, &revision.sha()[..12], suffix))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.dir.join(METADATA_DIR)
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.dir.join(EXTENSIONS_DIR)
    }

    pub fn has_clone(&self, normalized_uri: &str) -> bool {
        GitRepo::new(self.clone_path(normalized_uri)).is_bare()
    }

    /// Whether the clone was cloned or fetched during this run.
    pub fn was_fetched(&self, handle: &CloneHandle) -> bool {
        self.fetched.contains(&handle.path)
    }

    /// Make sure a bare clone of the repository exists.
    ///
    /// `normalized_uri` is the cache identity; `clone_url` is what git is asked
    /// to clone. No network access happens when the clone already exists.
    pub async fn ensure_clone(&self, normalized_uri: &str, clone_url: &str) -> Result<CloneHandle> {
        let key = Self::key_for(normalized_uri);
        let handle = CloneHandle {
            uri: normalized_uri.to_string(),
            key: key.clone(),
            path: self.clone_path(normalized_uri),
        };

        if handle.repo().is_bare() {
            return Ok(handle);
        }

        self.ensure_cache_dir().await?;
        let _lock = CacheLock::acquire(&self.dir, &key).await?;

        // Another task or process may have finished the clone while we waited
        if handle.repo().is_bare() {
            return Ok(handle);
        }

        let sources = self.dir.join(SOURCES_DIR);
        async_fs::create_dir_all(&sources)
            .await
            .with_context(|| format!("Failed to create {}", sources.display()))?;

        // Leftovers of an interrupted clone from an older layout or a crash
        if handle.path.exists() {
            tracing::warn!(target: "cache", "Removing incomplete clone at {}", handle.path.display());
            async_fs::remove_dir_all(&handle.path).await?;
        }

        let staging = tempfile::Builder::new()
            .prefix(&format!(".clone-{key}-"))
            .tempdir_in(&sources)
            .context("Failed to create staging directory for clone")?;
        let staged = staging.path().join("repo.git");

        tracing::info!(target: "cache", "Cloning {} into cache", clone_url);
        GitRepo::clone_bare(clone_url, &staged).await?;

        async_fs::rename(&staged, &handle.path).await.with_context(|| {
            format!("Failed to move clone into place at {}", handle.path.display())
        })?;

        self.fetched.insert(handle.path.clone());
        Ok(handle)
    }

    /// Update the clone's refs from its remote, at most once per run.
    pub async fn fetch(&self, handle: &CloneHandle) -> Result<()> {
        if self.was_fetched(handle) {
            tracing::debug!(target: "cache", "Already fetched {} in this run", handle.uri);
            return Ok(());
        }

        let _lock = CacheLock::acquire(&self.dir, &handle.key).await?;
        tracing::info!(target: "cache", "Fetching {}", handle.uri);
        handle.repo().fetch().await?;
        self.fetched.insert(handle.path.clone());
        Ok(())
    }

    /// Whether `sha` is present in the clone without fetching.
    pub async fn has_revision(&self, handle: &CloneHandle, sha: &str) -> Result<bool> {
        handle.repo().has_commit(sha).await
    }

    /// Check out `revision` into its dedicated worktree directory and return it.
    ///
    /// With `submodules`, submodules are initialized recursively; otherwise they
    /// stay empty directories. The two variants live in different directories.
    pub async fn materialize(
        &self,
        handle: &CloneHandle,
        revision: &ResolvedRevision,
        submodules: bool,
    ) -> Result<PathBuf> {
        let path = self.worktree_path(handle, revision, submodules);
        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

        if let Some(known) = self.materialized.get(&name) {
            if known.exists() {
                return Ok(known.clone());
            }
        }

        let _lock = CacheLock::acquire(&self.dir, &handle.key).await?;

        if is_checkout_at(&path, revision.sha()).await {
            tracing::debug!(target: "cache", "Reusing worktree {}", path.display());
            self.materialized.insert(name, path.clone());
            return Ok(path);
        }

        if path.exists() {
            tracing::warn!(target: "cache", "Replacing damaged worktree {}", path.display());
            async_fs::remove_dir_all(&path).await?;
        }
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let repo = handle.repo();
        if let Err(first) = repo.add_worktree(&path, revision.sha()).await {
            // A stale registration from a deleted directory; prune and retry once
            tracing::debug!(target: "cache", "worktree add failed, pruning: {first:#}");
            let _ = async_fs::remove_dir_all(&path).await;
            repo.prune_worktrees().await?;
            repo.add_worktree(&path, revision.sha()).await?;
        }

        if submodules {
            if let Err(e) = GitRepo::new(&path).update_submodules().await {
                // Leave no checkout that looks complete but lacks submodules
                let _ = async_fs::remove_dir_all(&path).await;
                let _ = repo.prune_worktrees().await;
                return Err(e);
            }
        }

        tracing::debug!(target: "cache", "Materialized {} at {}", revision, path.display());
        self.materialized.insert(name, path.clone());
        Ok(path)
    }

    /// Bare clones currently in the cache, as `(key, path)` pairs.
    pub async fn list_clones(&self) -> Result<Vec<(String, PathBuf)>> {
        let sources = self.dir.join(SOURCES_DIR);
        if !sources.exists() {
            return Ok(Vec::new());
        }
        let mut clones = Vec::new();
        let mut entries = async_fs::read_dir(&sources).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = name.strip_suffix(".git") {
                clones.push((key.to_string(), entry.path()));
            }
        }
        clones.sort();
        Ok(clones)
    }

    /// Total size of the cache in bytes.
    pub async fn size(&self) -> Result<u64> {
        let dir = self.dir.clone();
        tokio::task::spawn_blocking(move || {
            walkdir::WalkDir::new(&dir)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter_map(|e| e.metadata().ok())
                .filter(std::fs::Metadata::is_file)
                .map(|m| m.len())
                .sum()
        })
        .await
        .context("Failed to compute cache size")
    }

    /// Remove every clone, worktree, metadata and extension entry.
    pub async fn clean(&self) -> Result<()> {
        for sub in [WORKTREES_DIR, SOURCES_DIR, METADATA_DIR, EXTENSIONS_DIR] {
            let path = self.dir.join(sub);
            if path.exists() {
                async_fs::remove_dir_all(&path)
                    .await
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        self.fetched.clear();
        self.materialized.clear();
        Ok(())
    }
}

async fn is_checkout_at(path: &Path, sha: &str) -> bool {
    if !path.join(".git").exists() {
        return false;
    }
    matches!(GitRepo::new(path).current_commit().await, Ok(head) if head == sha)
}
