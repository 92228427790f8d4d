//! Global (per-user) configuration.
//!
//! Stored at `~/.gitpin/config.toml` unless `GITPIN_CONFIG_PATH` or `--config`
//! points elsewhere. It is never committed with a project, which is what makes
//! it the right home for local overrides: they describe one developer's
//! machine, not the project.
//!
//! ```toml
//! # Allow overrides for sources that declare no branch
//! disable_local_branch_check = false
//!
//! # Optional: where clones and checkouts are kept
//! cache_dir = "~/.cache/gitpin"
//!
//! # Optional: how many repositories are resolved concurrently
//! max_parallel = 8
//!
//! # Local overrides: repository URL (or package name) -> working directory
//! [local]
//! "https://github.com/rack/rack.git" = "~/src/rack"
//! sinatra = "/work/sinatra"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::git::{is_local_url, normalize_url};

/// User-level settings read once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Accept local overrides for sources that declare no branch, and skip the
    /// branch comparison.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_local_branch_check: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,

    /// Override bindings, keyed by repository URL or package name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub local: BTreeMap<String, String>,
}

/// A repository redirected to a local working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideBinding {
    /// The key as written in the config.
    pub key: String,
    /// The working directory, `~` expanded.
    pub path: PathBuf,
}

impl GlobalConfig {
    /// Load from the default location, or defaults when the file is absent.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, else from the default location.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            crate::core::GitpinError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// `GITPIN_CONFIG_PATH`, else `~/.gitpin/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(super::CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        Ok(super::gitpin_home()?.join("config.toml"))
    }

    pub fn set_local(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.local.insert(key.into(), path.into());
    }

    pub fn unset_local(&mut self, key: &str) -> bool {
        self.local.remove(key).is_some()
    }

    /// Find the override for a repository.
    ///
    /// A binding matches when its key, normalized, equals the repository's
    /// normalized URL, or when the key is the name of one of the packages
    /// declared from it. URL matches win over name matches.
    pub fn find_override(&self, normalized_uri: &str, package_names: &[&str]) -> Option<OverrideBinding> {
        let to_binding = |key: &String, path: &String| OverrideBinding {
            key: key.clone(),
            path: PathBuf::from(shellexpand::tilde(path).as_ref()),
        };

        let by_uri = self.local.iter().find(|(key, _)| {
            looks_like_url(key) && normalize_url(key, None) == normalized_uri
        });
        if let Some((key, path)) = by_uri {
            return Some(to_binding(key, path));
        }

        self.local
            .iter()
            .find(|(key, _)| package_names.contains(&key.as_str()))
            .map(|(key, path)| to_binding(key, path))
    }
}

fn looks_like_url(key: &str) -> bool {
    !is_local_url(key) || key.contains('/') || key.contains('\\')
}
