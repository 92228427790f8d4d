//! Git source management.
//!
//! [`GitSourceManager`] turns one declared repository into a pinned, checked
//! out source. It decides between reproducing the lockfile and resolving
//! afresh, honours local overrides, and loads the package metadata found at the
//! pinned revision.
//!
//! # Lockfile authority
//!
//! | mode    | lock entry                 | result                              |
//! |---------|----------------------------|-------------------------------------|
//! | install | matches the declaration    | locked revision, fetched only if missing |
//! | install | absent or stale            | full resolution                     |
//! | update  | any                        | full resolution                     |
//!
//! A lock entry matches when it names the same repository (compared
//! normalized) and the same branch, tag or ref.

pub mod override_validator;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cache::Cache;
use crate::config::GlobalConfig;
use crate::core::GitpinError;
use crate::git::repo_slug;
use crate::lockfile::LockEntry;
use crate::metadata::{MetadataCache, PackageSpec, discover_packages, synthetic_package};
use crate::models::{RepositorySpec, ResolveMode, ResolvedRevision};
use crate::resolver::RevisionResolver;
pub use override_validator::{
    OverrideCheck, OverrideContext, OverrideRevisionMismatch, validate_override,
};

/// A repository declared by one or more packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceGroup {
    pub spec: RepositorySpec,
    /// Packages declared from this repository, in manifest order.
    pub packages: Vec<String>,
}

/// A repository pinned to a revision and available on disk.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub spec: RepositorySpec,
    pub revision: ResolvedRevision,
    /// Checkout root: a cache worktree, or the override directory.
    pub worktree: PathBuf,
    /// The entry to record in the lockfile.
    pub lock_entry: LockEntry,
    pub from_override: bool,
    /// The clone was cloned or fetched during this run.
    pub fetched: bool,
    /// Set when an override is not at the declared revision.
    pub revision_mismatch: Option<OverrideRevisionMismatch>,
}

/// Resolves git sources against one cache.
#[derive(Debug, Clone)]
pub struct GitSourceManager {
    cache: Cache,
    metadata: MetadataCache,
    config: GlobalConfig,
    /// Manifest directory; relative remotes in the lockfile resolve against it.
    base_dir: Option<PathBuf>,
}

impl GitSourceManager {
    pub fn new(cache: Cache, config: GlobalConfig) -> Self {
        let metadata = MetadataCache::new(cache.metadata_dir());
        Self {
            cache,
            metadata,
            config,
            base_dir: None,
        }
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: Option<PathBuf>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Attach the configured local override, if any, to a group's spec.
    pub fn bind_override(&self, group: &mut SourceGroup) {
        let names: Vec<&str> = group.packages.iter().map(String::as_str).collect();
        if let Some(binding) = self.config.find_override(&group.spec.normalized, &names) {
            tracing::debug!(
                target: "source",
                "Using local override {} for {}",
                binding.path.display(),
                group.spec.uri
            );
            group.spec = group.spec.clone().with_override(binding.path);
        }
    }

    /// Pin `spec` and make its content available on disk.
    pub async fn resolve_source(
        &self,
        spec: &RepositorySpec,
        lock: Option<&LockEntry>,
        mode: ResolveMode,
    ) -> Result<ResolvedSource> {
        if let Some(path) = &spec.override_path {
            return self.resolve_override(spec, path, lock, mode).await;
        }

        let handle = self
            .cache
            .ensure_clone(&spec.normalized, spec.clone_url())
            .await
            .with_context(|| format!("Failed to prepare the cache for {}", spec.uri))?;
        let resolver = RevisionResolver::new(&self.cache);

        let locked = lock.filter(|entry| entry.matches_spec(spec, self.base_dir.as_deref()));
        let revision = match (mode, locked) {
            (ResolveMode::Install, Some(entry)) => {
                tracing::debug!(target: "source", "Reproducing locked {} for {}", entry.revision, spec.uri);
                resolver.ensure_revision(&handle, &entry.revision).await?
            }
            _ => resolver.resolve(&handle, &spec.reference).await?,
        };

        let worktree = self.cache.materialize(&handle, &revision, spec.submodules).await?;
        tracing::debug!(target: "source", "{} checked out at {}", revision, worktree.display());

        Ok(ResolvedSource {
            lock_entry: LockEntry::from_resolved(spec, &revision),
            fetched: self.cache.was_fetched(&handle),
            spec: spec.clone(),
            revision,
            worktree,
            from_override: false,
            revision_mismatch: None,
        })
    }

    async fn resolve_override(
        &self,
        spec: &RepositorySpec,
        path: &Path,
        lock: Option<&LockEntry>,
        mode: ResolveMode,
    ) -> Result<ResolvedSource> {
        let check = validate_override(&OverrideContext {
            name: &spec.name,
            spec,
            path,
            lock_entry: lock,
            mode,
            disable_branch_check: self.config.disable_local_branch_check,
        })
        .await?;

        let worktree = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Ok(ResolvedSource {
            lock_entry: LockEntry::from_resolved(spec, &check.revision),
            spec: spec.clone(),
            revision: check.revision,
            worktree,
            from_override: true,
            fetched: false,
            revision_mismatch: check.revision_mismatch,
        })
    }

    /// Packages a resolved source offers for `requested`.
    ///
    /// The packages declared in the tree are memoized per (repository,
    /// revision, submodules) for cache checkouts; override directories are read
    /// fresh every time. A tree without any metadata offers a synthetic package
    /// built for this request only, never stored.
    pub async fn load_packages(
        &self,
        source: &ResolvedSource,
        requested: &str,
    ) -> Result<Vec<PackageSpec>> {
        let found = self.tree_packages(source).await?;
        if !found.is_empty() {
            return Ok(found);
        }

        let hint = if source.from_override {
            source.worktree.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
        } else {
            repo_slug(&source.spec.uri)
        };
        tracing::debug!(
            target: "source",
            "No package metadata in {}, using a synthetic package",
            source.revision
        );
        Ok(vec![synthetic_package(&hint, requested)])
    }

    async fn tree_packages(&self, source: &ResolvedSource) -> Result<Vec<PackageSpec>> {
        if !source.from_override
            && let Some(cached) = self.metadata.get(&source.revision, source.spec.submodules).await
        {
            tracing::trace!(target: "source", "Metadata cache hit for {}", source.revision);
            return Ok(cached);
        }

        let root = source.worktree.clone();
        let packages = tokio::task::spawn_blocking(move || discover_packages(&root))
            .await
            .context("Package discovery task failed")??;

        if !source.from_override {
            self.metadata.put(&source.revision, source.spec.submodules, &packages).await?;
        }
        Ok(packages)
    }
}

/// Merge declarations of the same repository.
///
/// Specs are grouped by normalized URI in first-seen order. Two declarations of
/// one repository must agree on the reference and the submodules flag.
pub fn collapse_specs(specs: Vec<RepositorySpec>) -> Result<Vec<SourceGroup>> {
    let mut groups: Vec<SourceGroup> = Vec::new();

    for spec in specs {
        match groups.iter_mut().find(|g| g.spec.normalized == spec.normalized) {
            Some(group) => {
                if group.spec.reference != spec.reference
                    || group.spec.declared_branch() != spec.declared_branch()
                    || group.spec.submodules != spec.submodules
                {
                    return Err(GitpinError::ManifestValidation {
                        reason: format!(
                            "packages '{}' and '{}' both come from {} but declare different sources ({}{} vs {}{})",
                            group.spec.name,
                            spec.name,
                            group.spec.uri,
                            group.spec.reference,
                            if group.spec.submodules { " with submodules" } else { "" },
                            spec.reference,
                            if spec.submodules { " with submodules" } else { "" },
                        ),
                    }
                    .into());
                }
                group.packages.push(spec.name);
            }
            None => groups.push(SourceGroup {
                packages: vec![spec.name.clone()],
                spec,
            }),
        }
    }

    Ok(groups)
}
