//! Installation orchestration shared by `install` and `update`.
//!
//! One run:
//!
//! 1. groups the manifest's git packages by repository ([`collapse_specs`]) and
//!    binds local overrides;
//! 2. resolves the repositories concurrently, at most `max_parallel` at a time;
//! 3. loads each source's packages and selects the declared ones;
//! 4. runs pre-install hooks, extension builds and post-install hooks for every
//!    package, one package at a time in name order;
//! 5. writes the lockfile, unless nothing changed.
//!
//! Each repository's cache entries are guarded by their own lock, so
//! repositories never wait on each other and two gitpin processes sharing a
//! cache cannot corrupt it.


use anyhow::{Context, Result};
use colored::Colorize;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::constants::{LOCKFILE_NAME, MIN_PARALLELISM};
use crate::core::GitpinError;
use crate::git::{ensure_git_available, strip_auth_from_url};
use crate::hooks::{HookPhase, HookRunner, PackageContext, build_extensions};
use crate::lockfile::{LockFile, LockedPackage, git_source_id, path_source_id};
use crate::manifest::{Manifest, PackageSource};
use crate::metadata::{discover_packages, select_package, synthetic_package};
use crate::models::{ResolveMode, ResolvedRevision};
use crate::source::{GitSourceManager, ResolvedSource, SourceGroup, collapse_specs};
use crate::utils::Spinner;

/// How a run behaves.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub mode: ResolveMode,
    /// Packages to update; empty means all. Only used with [`ResolveMode::Update`].
    pub update_packages: Vec<String>,
    /// Fail instead of changing the lockfile.
    pub frozen: bool,
    pub max_parallel: usize,
    pub progress: bool,
    pub quiet: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            mode: ResolveMode::Install,
            update_packages: Vec::new(),
            frozen: false,
            max_parallel: default_parallelism(),
            progress: false,
            quiet: false,
        }
    }
}

/// Concurrent repository resolutions when nothing is configured.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(MIN_PARALLELISM)
        .max(MIN_PARALLELISM)
}

/// A package made available by the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    /// Absolute package directory.
    pub dir: PathBuf,
    /// The git revision, `None` for path packages.
    pub revision: Option<ResolvedRevision>,
    pub from_override: bool,
}

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct InstallSummary {
    pub installed: Vec<InstalledPackage>,
    pub lockfile_written: bool,
    /// Repositories that were cloned or fetched.
    pub fetched: Vec<String>,
}

/// Runs one install or update over a manifest.
#[derive(Debug)]
pub struct Installer {
    manifest: Manifest,
    lockfile_path: PathBuf,
    manager: GitSourceManager,
    hooks: HookRunner,
    options: InstallOptions,
}

impl Installer {
    /// The lockfile lives next to `manifest_path`.
    pub fn new(
        manifest: Manifest,
        manifest_path: &Path,
        manager: GitSourceManager,
        options: InstallOptions,
    ) -> Self {
        let lockfile_path = manifest_path.with_file_name(LOCKFILE_NAME);
        let hooks = HookRunner::from_config(&manifest.hooks);
        let manager = manager.with_base_dir(manifest.manifest_dir.clone());
        Self {
            manifest,
            lockfile_path,
            manager,
            hooks,
            options,
        }
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: HookRunner) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn lockfile_path(&self) -> &Path {
        &self.lockfile_path
    }

    fn say(&self, spinner: &Spinner, line: impl AsRef<str>) {
        if !self.options.quiet {
            spinner.println(line);
        }
    }

    fn warn(&self, line: impl AsRef<str>) {
        eprintln!("{} {}", "warning:".yellow().bold(), line.as_ref());
    }

    pub async fn run(&self) -> Result<InstallSummary> {
        let previous = LockFile::load(&self.lockfile_path)?;

        self.check_update_targets()?;

        let mut groups = collapse_specs(self.manifest.git_specs()?)?;
        if !groups.is_empty() {
            ensure_git_available()?;
        }
        for group in &mut groups {
            self.manager.bind_override(group);
        }

        if self.options.frozen {
            self.check_frozen(&groups, &previous)?;
        }

        let spinner = Spinner::new(self.options.progress && !self.options.quiet);
        spinner.set_message(format!("Resolving {} git sources", groups.len()));

        let resolved = self.resolve_all(&groups, &previous).await;
        spinner.finish_and_clear();
        let resolved = resolved?;

        let mut summary = InstallSummary::default();
        let mut lockfile = LockFile::new();
        let mut contexts: Vec<(PackageContext, String)> = Vec::new();

        for (group, source) in groups.iter().zip(&resolved) {
            let display_uri = strip_auth_from_url(&source.spec.uri);
            if source.fetched {
                summary.fetched.push(source.spec.uri.clone());
                self.say(&spinner, format!("Fetching {display_uri}"));
            } else if !source.from_override {
                self.say(&spinner, format!("Using cached copy of {display_uri}"));
            }
            if let Some(mismatch) = &source.revision_mismatch {
                self.warn(mismatch.to_string());
            }

            for name in &group.packages {
                let available = self.manager.load_packages(source, name).await?;
                let requirement =
                    self.manifest.packages.get(name).and_then(|dep| dep.version.as_deref());
                let package = select_package(
                    &available,
                    name,
                    requirement,
                    &source.spec.uri,
                    source.revision.sha(),
                )?;

                let location = if source.from_override {
                    format!("(at {})", source.worktree.display())
                } else {
                    format!("(at {}@{})", source.spec.reference, source.revision.short())
                };
                let line = format!(
                    "Using {} {} from {} {}",
                    package.name, package.version, display_uri, location
                );

                let dir = source.worktree.join(&package.dir);
                contexts.push((
                    PackageContext {
                        name: package.name.clone(),
                        version: package.version.clone(),
                        dir: dir.clone(),
                        // Overrides change without new commits; always rebuild them
                        revision: (!source.from_override).then(|| source.revision.sha().to_string()),
                        extensions: package.extensions.clone(),
                    },
                    line,
                ));
                summary.installed.push(InstalledPackage {
                    name: package.name.clone(),
                    version: package.version.clone(),
                    dir,
                    revision: Some(source.revision.clone()),
                    from_override: source.from_override,
                });
                lockfile.packages.push(LockedPackage {
                    name: package.name.clone(),
                    version: package.version.clone(),
                    source: git_source_id(&source.spec.uri),
                });
            }

            lockfile.git.push(source.lock_entry.clone());
        }

        for (name, dep) in &self.manifest.packages {
            if let PackageSource::Path {
                path,
                declared,
            } = self.manifest.source_for(name)?
            {
                let (context, line) = self.path_package(name, &path, &declared, dep.version.as_deref())?;
                summary.installed.push(InstalledPackage {
                    name: context.name.clone(),
                    version: context.version.clone(),
                    dir: context.dir.clone(),
                    revision: None,
                    from_override: false,
                });
                lockfile.packages.push(LockedPackage {
                    name: context.name.clone(),
                    version: context.version.clone(),
                    source: path_source_id(&declared),
                });
                contexts.push((context, line));
            }
        }

        lockfile.sort();
        if self.options.frozen {
            let mut expected = previous.clone();
            expected.sort();
            if expected != lockfile {
                return Err(GitpinError::LockfileOutOfDate {
                    reason: format!("installing would change {LOCKFILE_NAME}"),
                }
                .into());
            }
        }

        contexts.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        for (context, line) in contexts {
            self.install_package(context).await?;
            self.say(&spinner, line);
        }

        summary.lockfile_written = if self.options.frozen {
            false
        } else {
            lockfile.save(&self.lockfile_path)?
        };
        if summary.lockfile_written {
            tracing::info!(target: "installer", "Wrote {}", self.lockfile_path.display());
        }

        Ok(summary)
    }

    fn check_update_targets(&self) -> Result<()> {
        if self.options.mode != ResolveMode::Update {
            return Ok(());
        }
        for name in &self.options.update_packages {
            if !self.manifest.packages.contains_key(name) {
                return Err(GitpinError::ManifestValidation {
                    reason: format!("cannot update '{name}': it is not declared in the manifest"),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Mode for one repository: selective updates leave other pins alone.
    fn mode_for(&self, group: &SourceGroup) -> ResolveMode {
        match self.options.mode {
            ResolveMode::Install => ResolveMode::Install,
            ResolveMode::Update
                if self.options.update_packages.is_empty()
                    || group.packages.iter().any(|p| self.options.update_packages.contains(p)) =>
            {
                ResolveMode::Update
            }
            ResolveMode::Update => ResolveMode::Install,
        }
    }

    /// A frozen install must be reproducible from the lockfile alone.
    fn check_frozen(&self, groups: &[SourceGroup], lockfile: &LockFile) -> Result<()> {
        let base_dir = self.manifest.base_dir();
        for group in groups {
            let fresh = lockfile
                .find_git(&group.spec.normalized, base_dir)
                .is_some_and(|entry| entry.matches_spec(&group.spec, base_dir));
            if !fresh {
                return Err(GitpinError::LockfileOutOfDate {
                    reason: format!("{} has no matching entry in {}", group.spec.uri, LOCKFILE_NAME),
                }
                .into());
            }
        }
        let declared: BTreeSet<&str> = self.manifest.packages.keys().map(String::as_str).collect();
        let locked: BTreeSet<&str> = lockfile.packages.iter().map(|p| p.name.as_str()).collect();
        if declared != locked {
            return Err(GitpinError::LockfileOutOfDate {
                reason: format!("the packages in {} do not match the manifest", LOCKFILE_NAME),
            }
            .into());
        }
        Ok(())
    }

    async fn resolve_all(
        &self,
        groups: &[SourceGroup],
        previous: &LockFile,
    ) -> Result<Vec<ResolvedSource>> {
        let base_dir = self.manifest.base_dir();
        let concurrency = self.options.max_parallel.max(1);

        let mut results: Vec<(usize, Result<ResolvedSource>)> =
            stream::iter(groups.iter().enumerate())
                .map(|(index, group)| {
                    let lock = previous.find_git(&group.spec.normalized, base_dir);
                    let mode = self.mode_for(group);
                    async move {
                        tracing::debug!(target: "installer", "Resolving {} ({:?})", group.spec.uri, mode);
                        (index, self.manager.resolve_source(&group.spec, lock, mode).await)
                    }
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    fn path_package(
        &self,
        name: &str,
        path: &Path,
        declared: &str,
        requirement: Option<&str>,
    ) -> Result<(PackageContext, String)> {
        if !path.exists() {
            return Err(GitpinError::ManifestValidation {
                reason: format!("the path {} for package '{name}' does not exist", path.display()),
            }
            .into());
        }
        let hint = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let mut available = discover_packages(path)?;
        if available.is_empty() {
            available.push(synthetic_package(&hint, name));
        }
        let package = select_package(&available, name, requirement, declared, "local")?;
        let dir = path.join(&package.dir);
        let line = format!("Using {} {} from source at `{}`", package.name, package.version, declared);
        Ok((
            PackageContext {
                name: package.name.clone(),
                version: package.version.clone(),
                dir,
                revision: None,
                extensions: package.extensions.clone(),
            },
            line,
        ))
    }

    /// Hooks and extension builds for one package, on the blocking pool.
    async fn install_package(&self, context: PackageContext) -> Result<()> {
        let hooks = self.hooks.clone();
        let extensions_root = self.manager.cache().extensions_dir();
        tokio::task::spawn_blocking(move || -> Result<()> {
            hooks.run_hooks(HookPhase::PreInstall, &context)?;
            build_extensions(&context, &extensions_root)?;
            hooks.run_hooks(HookPhase::PostInstall, &context)?;
            Ok(())
        })
        .await
        .context("Install task failed")?
    }
}
