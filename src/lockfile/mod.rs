//! Lockfile: the persisted record of source pins and resolved packages.
//!
//! `gitpin.lock` sits next to the manifest and is meant to be committed. It has
//! one `[[git]]` entry per repository and one `[[packages]]` entry per package:
//!
//! ```toml
//! # Auto-generated by gitpin. Do not edit.
//! version = 1
//!
//! [[git]]
//! remote = "https://github.com/rack/rack.git"
//! revision = "0123456789abcdef0123456789abcdef01234567"
//! branch = "main"
//!
//! [[packages]]
//! name = "rack"
//! version = "1.0"
//! source = "git+https://github.com/rack/rack.git"
//! ```
//!
//! # Stability
//!
//! Entries are sorted (git sources by remote, packages by name) and the file is
//! produced only by [`LockFile::to_toml_string`], so serializing an unchanged
//! resolution reproduces the previous file byte for byte. [`LockFile::save`]
//! skips the write entirely when nothing changed.
//!
//! # Authority
//!
//! A [`LockEntry`]'s `revision` is authoritative: plain installs reproduce it
//! exactly. It only moves on `gitpin update`, or when the declaration it was made
//! for changes (a different URL, branch, tag or ref).

mod io;


use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::git::normalize_url;
use crate::models::{GitReference, RepositorySpec, ResolvedRevision};

/// The whole lockfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub version: u32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub git: Vec<LockEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<LockedPackage>,
}

/// A pinned git source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// The URL or path as declared in the manifest.
    pub remote: String,

    /// Full commit SHA.
    pub revision: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub submodules: bool,
}

/// A resolved package and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    /// `git+<remote>` or `path+<path>`.
    pub source: String,
}

impl Default for LockFile {
    fn default() -> Self {
        Self::new()
    }
}

impl LockFile {
    pub const CURRENT_VERSION: u32 = 1;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            git: Vec::new(),
            packages: Vec::new(),
        }
    }

    /// Find the entry for a repository by its normalized URL. Relative remotes
    /// are resolved against `base_dir`, the lockfile's directory.
    pub fn find_git(&self, normalized_uri: &str, base_dir: Option<&Path>) -> Option<&LockEntry> {
        self.git.iter().find(|entry| normalize_url(&entry.remote, base_dir) == normalized_uri)
    }

    pub fn find_package(&self, name: &str) -> Option<&LockedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Sort entries into their canonical order.
    pub fn sort(&mut self) {
        self.git.sort_by(|a, b| a.remote.cmp(&b.remote).then_with(|| a.revision.cmp(&b.revision)));
        self.packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.source.cmp(&b.source)));
    }
}

impl LockEntry {
    /// Record `revision` as the pin for `spec`.
    pub fn from_resolved(spec: &RepositorySpec, revision: &ResolvedRevision) -> Self {
        Self {
            remote: spec.uri.clone(),
            revision: revision.sha().to_string(),
            branch: spec.declared_branch().map(str::to_string),
            tag: spec.reference.tag().map(str::to_string),
            rev: spec.reference.rev().map(str::to_string),
            submodules: spec.submodules,
        }
    }

    /// The declared reference this entry was resolved from.
    pub fn reference(&self) -> GitReference {
        GitReference::from_parts(self.branch.as_deref(), self.tag.as_deref(), self.rev.as_deref())
            .unwrap_or_default()
    }

    /// Whether this entry was made for the same declaration as `spec`: same
    /// repository, same branch/tag/ref and same branch next to a tag or ref.
    /// The submodules flag is not compared; it changes what is checked out, not
    /// which commit.
    pub fn matches_spec(&self, spec: &RepositorySpec, base_dir: Option<&Path>) -> bool {
        normalize_url(&self.remote, base_dir) == spec.normalized
            && self.reference() == spec.reference
            && self.branch.as_deref() == spec.declared_branch()
    }

    /// The `source` value used by packages from this repository.
    pub fn source_id(&self) -> String {
        git_source_id(&self.remote)
    }
}

/// `source` value for packages from the git repository `remote`.
pub fn git_source_id(remote: &str) -> String {
    format!("git+{remote}")
}

/// `source` value for packages from the local directory `path`.
pub fn path_source_id(path: &str) -> String {
    format!("path+{path}")
}
