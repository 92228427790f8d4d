//! Package metadata found inside a checked-out source.
//!
//! A repository provides one or more packages, each described by a
//! `package.toml` in its directory:
//!
//! ```toml
//! name = "rack"
//! version = "2.0.1"          # or: version-file = "VERSION"
//! extensions = ["make -C ext"]
//! ```
//!
//! Discovery looks at the repository root and up to two directory levels below
//! it. A repository without any `package.toml` still provides one package,
//! named after its directory (`rack-1.2.3` gives `rack` at `1.2.3`) or after
//! the package that was asked for, at version `0`.

mod cache;

pub use cache::MetadataCache;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::PACKAGE_METADATA_FILE;
use crate::core::GitpinError;

/// `<name>-<version>` in a directory name.
const NAME_VERSION_PATTERN: &str = r"^(?P<name>[A-Za-z0-9_.-]+?)-(?P<version>\d+(?:\.[0-9A-Za-z]+)*)$";

/// Deepest walk depth searched for `package.toml`; files in the root are at 1.
const MAX_DISCOVERY_DEPTH: usize = 3;

/// One package provided by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: String,
    /// Package directory relative to the checkout root.
    pub dir: PathBuf,
    /// Extension build commands, run in the package directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
}

impl PackageSpec {
    /// `name-version`.
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PackageFile {
    name: String,
    version: Option<String>,
    version_file: Option<String>,
    #[serde(default)]
    extensions: Vec<String>,
}

/// Find every package declared by a `package.toml` in the checkout at `root`.
///
/// Only what the tree itself declares is returned, so the result can be shared
/// between projects. A checkout without metadata yields an empty list; see
/// [`synthetic_package`] for what stands in for it.
pub fn discover_packages(root: &Path) -> Result<Vec<PackageSpec>> {
    let mut found = Vec::new();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(MAX_DISCOVERY_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() || entry.file_name() != PACKAGE_METADATA_FILE {
            continue;
        }
        found.push(read_package_file(root, entry.path())?);
    }

    if found.is_empty() {
        tracing::debug!("No {} in {}", PACKAGE_METADATA_FILE, root.display());
    }

    Ok(found)
}

fn read_package_file(root: &Path, path: &Path) -> Result<PackageSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: PackageFile = toml::from_str(&content).map_err(|e| GitpinError::Other {
        message: format!("Invalid package metadata in {}: {e}", path.display()),
    })?;

    let package_dir = path.parent().unwrap_or(root);
    let version = match (file.version, file.version_file) {
        (Some(version), _) => version,
        (None, Some(version_file)) => {
            let version_path = package_dir.join(&version_file);
            std::fs::read_to_string(&version_path)
                .with_context(|| {
                    format!("Failed to read version file {}", version_path.display())
                })?
                .trim()
                .to_string()
        }
        (None, None) => {
            return Err(GitpinError::Other {
                message: format!("{} declares no `version` or `version-file`", path.display()),
            }
            .into());
        }
    };

    let dir = package_dir.strip_prefix(root).unwrap_or(Path::new("")).to_path_buf();
    Ok(PackageSpec {
        name: file.name,
        version,
        dir,
        extensions: file.extensions,
    })
}

/// Package for a checkout without metadata: `<name>-<version>` from the
/// directory name, else the requested name at version `0`.
pub fn synthetic_package(dir_hint: &str, requested: &str) -> PackageSpec {
    let hint = dir_hint.strip_suffix(".git").unwrap_or(dir_hint);
    let parsed = Regex::new(NAME_VERSION_PATTERN)
        .ok()
        .and_then(|re| re.captures(hint).map(|caps| (caps["name"].to_string(), caps["version"].to_string())));
    let (name, version) = parsed.unwrap_or_else(|| (requested.to_string(), "0".to_string()));
    PackageSpec {
        name,
        version,
        dir: PathBuf::new(),
        extensions: Vec::new(),
    }
}

/// Whether `version` satisfies `requirement`.
///
/// A plain version (`1.0`) must match exactly, ignoring missing trailing zero
/// components. Requirements starting with an operator (`>=1.0`, `~2.1`, `^1`)
/// use semver matching.
pub fn version_matches(version: &str, requirement: &str) -> bool {
    let requirement = requirement.trim();
    if requirement.is_empty() || requirement == "*" {
        return true;
    }

    if requirement.starts_with(['^', '~', '<', '>', '=']) {
        return match (semver::VersionReq::parse(requirement), parse_lenient(version)) {
            (Ok(req), Some(v)) => req.matches(&v),
            _ => false,
        };
    }

    match (parse_lenient(requirement), parse_lenient(version)) {
        (Some(a), Some(b)) => a == b,
        _ => requirement == version.trim(),
    }
}

/// Parse `1`, `1.2` or `1.2.3[-pre]` as a semver version.
fn parse_lenient(version: &str) -> Option<semver::Version> {
    let version = version.trim();
    if let Ok(v) = semver::Version::parse(version) {
        return Some(v);
    }
    let padded = match version.matches('.').count() {
        0 => format!("{version}.0.0"),
        1 => format!("{version}.0"),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// Pick the package `name` (optionally at `requirement`) from what a source
/// provides at `revision`.
pub fn select_package<'a>(
    packages: &'a [PackageSpec],
    name: &str,
    requirement: Option<&str>,
    uri: &str,
    revision: &str,
) -> Result<&'a PackageSpec> {
    packages
        .iter()
        .find(|p| p.name == name && requirement.is_none_or(|req| version_matches(&p.version, req)))
        .ok_or_else(|| {
            GitpinError::PackageNotFoundInSource {
                name: name.to_string(),
                requirement: requirement.map(str::to_string),
                uri: uri.to_string(),
                revision: revision.to_string(),
                available: packages.iter().map(|p| (p.name.clone(), p.version.clone())).collect(),
            }
            .into()
        })
}
