//! On-disk cache of discovered package metadata.
//!
//! Discovery walks a whole checkout, so its result is stored as JSON under
//! `<cache>/metadata/`, one file per (repository, revision, submodules). A
//! revision's content never changes, so entries are never invalidated; an
//! unreadable entry is treated as missing and rewritten.
//!
//! Local overrides are never cached: their content changes between runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::PackageSpec;
use crate::cache::Cache;
use crate::models::ResolvedRevision;
use crate::utils::atomic_write;

#[derive(Debug, Serialize, Deserialize)]
struct MetadataEntry {
    uri: String,
    revision: String,
    submodules: bool,
    packages: Vec<PackageSpec>,
}

/// Metadata cache rooted at one directory.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, revision: &ResolvedRevision, submodules: bool) -> PathBuf {
        let suffix = if submodules { "-sub" } else { "" };
        self.dir.join(format!("{}-{}{}.json", Cache::key_for(revision.uri()), revision.sha(), suffix))
    }

    /// Cached packages for `revision`, if any.
    pub async fn get(&self, revision: &ResolvedRevision, submodules: bool) -> Option<Vec<PackageSpec>> {
        let path = self.entry_path(revision, submodules);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<MetadataEntry>(&bytes) {
            Ok(entry) if entry.uri == revision.uri() && entry.revision == revision.sha() => {
                Some(entry.packages)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring unreadable metadata cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store the packages found at `revision`.
    pub async fn put(
        &self,
        revision: &ResolvedRevision,
        submodules: bool,
        packages: &[PackageSpec],
    ) -> Result<()> {
        let entry = MetadataEntry {
            uri: revision.uri().to_string(),
            revision: revision.sha().to_string(),
            submodules,
            packages: packages.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&entry).context("Failed to serialize package metadata")?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.entry_path(revision, submodules);
        atomic_write(&path, &json)
            .with_context(|| format!("Failed to write metadata cache entry {}", path.display()))
    }
}
