//! Install hooks and extension builds.
//!
//! Hooks run around the installation of every package. They are kept in one
//! ordered list of `(phase, hook)` pairs and invoked in registration order;
//! the first failure stops the run and is reported as
//! [`GitpinError::HookFailure`] naming the package as `name-version`.
//!
//! Manifest hooks are shell commands ([`ShellHook`]) run with `sh -c` in the
//! package directory, with these variables set:
//!
//! | Variable                   | Value                          |
//! |----------------------------|--------------------------------|
//! | `GITPIN_PACKAGE_NAME`      | package name                   |
//! | `GITPIN_PACKAGE_VERSION`   | package version                |
//! | `GITPIN_PACKAGE_FULL_NAME` | `name-version`                 |
//! | `GITPIN_PACKAGE_DIR`       | absolute package directory     |
//!
//! Extensions are build commands declared by a package's own `package.toml`.
//! Their output goes to a per-revision directory under the cache, and a
//! marker file makes a second build at the same revision a no-op. A failed
//! build never removes the cached source.

use anyhow::{Context, Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::constants::EXTENSION_BUILT_MARKER;
use crate::core::GitpinError;

/// When a hook runs relative to a package's installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    PreInstall,
    PostInstall,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreInstall => f.write_str("pre-install"),
            Self::PostInstall => f.write_str("post-install"),
        }
    }
}

/// The package a hook or extension build runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageContext {
    pub name: String,
    pub version: String,
    /// Absolute package directory.
    pub dir: PathBuf,
    /// Pinned commit, `None` for path packages.
    pub revision: Option<String>,
    pub extensions: Vec<String>,
}

impl PackageContext {
    /// `name-version`.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    fn env_vars(&self) -> [(&'static str, String); 4] {
        [
            ("GITPIN_PACKAGE_NAME", self.name.clone()),
            ("GITPIN_PACKAGE_VERSION", self.version.clone()),
            ("GITPIN_PACKAGE_FULL_NAME", self.full_name()),
            ("GITPIN_PACKAGE_DIR", self.dir.display().to_string()),
        ]
    }
}

/// A registered hook.
pub type Hook = Arc<dyn Fn(&PackageContext) -> Result<()> + Send + Sync>;

/// Ordered collection of hooks.
#[derive(Clone, Default)]
pub struct HookRunner {
    hooks: Vec<(HookPhase, Hook)>,
}

impl fmt::Debug for HookRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRunner")
            .field("hooks", &self.hooks.iter().map(|(phase, _)| *phase).collect::<Vec<_>>())
            .finish()
    }
}

impl HookRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner with the manifest's `[hooks]` commands registered.
    pub fn from_config(config: &crate::manifest::HooksConfig) -> Self {
        let mut runner = Self::new();
        for command in &config.pre_install {
            runner.register(HookPhase::PreInstall, ShellHook::new(command).into_hook());
        }
        for command in &config.post_install {
            runner.register(HookPhase::PostInstall, ShellHook::new(command).into_hook());
        }
        runner
    }

    /// Append `hook`; it runs after every hook registered before it.
    pub fn register(&mut self, phase: HookPhase, hook: Hook) {
        self.hooks.push((phase, hook));
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Run every `phase` hook for `package`, stopping at the first failure.
    pub fn run_hooks(&self, phase: HookPhase, package: &PackageContext) -> Result<()> {
        for (_, hook) in self.hooks.iter().filter(|(p, _)| *p == phase) {
            tracing::debug!("Running {} hook for {}", phase, package.full_name());
            hook(package).map_err(|e| GitpinError::HookFailure {
                phase: phase.to_string(),
                package: package.full_name(),
                reason: format!("{e:#}"),
            })?;
        }
        Ok(())
    }
}

/// A hook that runs a shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellHook {
    command: String,
}

impl ShellHook {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn into_hook(self) -> Hook {
        Arc::new(move |package: &PackageContext| self.run(package))
    }

    /// Run in the package directory. The command's stdout goes to ours; its
    /// stderr is captured for the error message.
    pub fn run(&self, package: &PackageContext) -> Result<()> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&package.dir)
            .envs(package.env_vars())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run `{}`", self.command))?;

        if !output.status.success() {
            bail!(
                "`{}` exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

/// Directory holding the build output of `package`'s extensions.
pub fn extension_dir(extensions_root: &Path, package: &PackageContext) -> PathBuf {
    let revision = package.revision.as_deref().map_or("local", |sha| sha.get(..12).unwrap_or(sha));
    extensions_root.join(format!("{}-{}-{}", package.name, package.version, revision))
}

/// Build `package`'s extensions, once per revision.
///
/// Returns the output directory, or `None` when the package declares no
/// extensions. Path packages have no revision and are rebuilt every time.
pub fn build_extensions(package: &PackageContext, extensions_root: &Path) -> Result<Option<PathBuf>> {
    if package.extensions.is_empty() {
        return Ok(None);
    }

    let out_dir = extension_dir(extensions_root, package);
    let marker = out_dir.join(EXTENSION_BUILT_MARKER);
    if package.revision.is_some() && marker.exists() {
        tracing::debug!("Extensions of {} already built", package.full_name());
        return Ok(Some(out_dir));
    }

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    for command in &package.extensions {
        tracing::debug!("Building extension of {}: {}", package.full_name(), command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&package.dir)
            .envs(package.env_vars())
            .env("GITPIN_EXTENSION_DIR", &out_dir)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run `{command}`"))?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(GitpinError::ExtensionBuildFailure {
                name: package.name.clone(),
                version: package.version.clone(),
                output: combined.trim_end().to_string(),
            }
            .into());
        }
    }

    std::fs::write(&marker, package.revision.as_deref().unwrap_or_default())
        .with_context(|| format!("Failed to write {}", marker.display()))?;
    Ok(Some(out_dir))
}
