//! Manifest parsing (`gitpin.toml`).
//!
//! The manifest declares which packages a project uses and where each one comes
//! from. Packages are keyed by name and come either from a git repository or
//! from a local directory:
//!
//! ```toml
//! [packages.rack]
//! git = "https://github.com/rack/rack.git"
//! branch = "main"          # or tag = "v2.0", or ref = "0123abc"
//! submodules = true
//! version = "2.0"          # optional; must match the version found in the repository
//!
//! [packages.helpers]
//! path = "vendor/helpers"
//!
//! [hooks]
//! pre-install = ["echo installing $GITPIN_PACKAGE_FULL_NAME"]
//! post-install = []
//! ```
//!
//! `tag` and `ref` exclude each other. A `branch` may accompany either one: the
//! tag or ref is what gets resolved, and the branch names where it lives, which
//! is what a local override must have checked out.
//!
//! Relative `git` paths and `path` entries are resolved against the directory
//! containing the manifest, so a project can be moved without changing the
//! identity of its sources.


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constants::MANIFEST_FILE;
use crate::core::GitpinError;
use crate::models::{GitReference, RepositorySpec};

/// A parsed `gitpin.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub packages: BTreeMap<String, PackageDependency>,

    #[serde(default)]
    pub hooks: HooksConfig,

    /// Directory holding the manifest; relative sources resolve against it.
    #[serde(skip)]
    pub manifest_dir: Option<PathBuf>,
}

/// One `[packages.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub submodules: bool,

    /// Version requirement checked against the package's own metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Shell commands run around each package installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HooksConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_install: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_install: Vec<String>,
}

/// Where a declared package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Git(RepositorySpec),
    /// Absolute path to a local package directory, plus the path as declared.
    Path { path: PathBuf, declared: String },
}

impl PackageDependency {
    pub fn is_git(&self) -> bool {
        self.git.is_some()
    }

    pub fn reference(&self) -> Result<GitReference> {
        GitReference::from_parts(self.branch.as_deref(), self.tag.as_deref(), self.rev.as_deref())
    }
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read manifest file: {}", path.display()))?;
        let mut manifest = Self::parse(&content, path)?;
        manifest.manifest_dir = path
            .parent()
            .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
            .map(|p| p.canonicalize().unwrap_or_else(|_| p.to_path_buf()));
        manifest.validate()?;
        Ok(manifest)
    }

    /// Parse manifest text without validating it. `path` only appears in errors.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            GitpinError::ManifestParse {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Check that every package names exactly one source and that git-only
    /// keys only appear on git packages.
    pub fn validate(&self) -> Result<()> {
        for (name, dep) in &self.packages {
            let invalid = |reason: String| -> anyhow::Error {
                GitpinError::ManifestValidation {
                    reason,
                }
                .into()
            };

            if name.trim().is_empty() {
                return Err(invalid("package names cannot be empty".to_string()));
            }

            match (&dep.git, &dep.path) {
                (Some(_), Some(_)) => {
                    return Err(invalid(format!(
                        "package '{name}' specifies both `git` and `path`; use one of them"
                    )));
                }
                (None, None) => {
                    return Err(invalid(format!(
                        "package '{name}' needs a source: add `git = \"<url>\"` or `path = \"<dir>\"`"
                    )));
                }
                (Some(git), None) if git.trim().is_empty() => {
                    return Err(invalid(format!("package '{name}' has an empty `git` URL")));
                }
                (None, Some(_)) => {
                    if dep.branch.is_some() || dep.tag.is_some() || dep.rev.is_some() || dep.submodules
                    {
                        return Err(invalid(format!(
                            "package '{name}' is a path package; `branch`, `tag`, `ref` and `submodules` only apply to git sources"
                        )));
                    }
                }
                (Some(_), None) => {}
            }

            dep.reference().map_err(|e| invalid(format!("package '{name}': {e}")))?;

            if let Some(version) = &dep.version
                && version.trim().is_empty()
            {
                return Err(invalid(format!("package '{name}' has an empty `version`")));
            }
        }
        Ok(())
    }

    /// The directory relative sources are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.manifest_dir.as_deref()
    }

    /// Resolve where the package `name` comes from.
    pub fn source_for(&self, name: &str) -> Result<PackageSource> {
        let dep = self.packages.get(name).ok_or_else(|| GitpinError::ManifestValidation {
            reason: format!("package '{name}' is not declared in {MANIFEST_FILE}"),
        })?;

        if let Some(git) = &dep.git {
            let reference = dep.reference()?;
            // A branch next to a tag or ref is kept for the override checks
            let companion_branch =
                if reference.branch().is_some() { None } else { dep.branch.as_deref() };
            let spec = RepositorySpec::new(name, git, self.base_dir())
                .with_reference(reference)
                .with_branch(companion_branch)
                .with_submodules(dep.submodules);
            return Ok(PackageSource::Git(spec));
        }

        let declared = dep.path.clone().unwrap_or_default();
        let expanded = PathBuf::from(shellexpand::tilde(&declared).as_ref());
        let path = match (expanded.is_relative(), self.base_dir()) {
            (true, Some(base)) => base.join(expanded),
            _ => expanded,
        };
        Ok(PackageSource::Path {
            path,
            declared,
        })
    }

    /// Every declared git source, one spec per package, in name order.
    pub fn git_specs(&self) -> Result<Vec<RepositorySpec>> {
        let mut specs = Vec::new();
        for name in self.packages.keys() {
            if let PackageSource::Git(spec) = self.source_for(name)? {
                specs.push(spec);
            }
        }
        Ok(specs)
    }
}

/// Search for `gitpin.toml` in the current directory and its parents.
pub fn find_manifest() -> Result<PathBuf> {
    let current =
        std::env::current_dir().context("Cannot determine current working directory")?;
    find_manifest_from(current)
}

/// Use `explicit_path` when given, otherwise search from the current directory.
pub fn find_manifest_with_optional(explicit_path: Option<PathBuf>) -> Result<PathBuf> {
    match explicit_path {
        Some(path) if path.is_dir() => {
            let candidate = path.join(MANIFEST_FILE);
            if candidate.exists() {
                Ok(candidate)
            } else {
                Err(GitpinError::ManifestNotFound.into())
            }
        }
        Some(path) if path.exists() => Ok(path),
        Some(_) => Err(GitpinError::ManifestNotFound.into()),
        None => find_manifest(),
    }
}

/// Walk from `current` up to the filesystem root looking for `gitpin.toml`.
pub fn find_manifest_from(mut current: PathBuf) -> Result<PathBuf> {
    loop {
        let candidate = current.join(MANIFEST_FILE);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !current.pop() {
            return Err(GitpinError::ManifestNotFound.into());
        }
    }
}
