//! Reading and writing `gitpin.lock`.

use anyhow::{Context, Result};
use std::path::Path;

use super::LockFile;
use crate::core::GitpinError;
use crate::utils::atomic_write;

const HEADER: &str = "# Auto-generated by gitpin. Do not edit.\n";

impl LockFile {
    /// Load a lockfile. A missing or empty file is an empty lockfile.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read lockfile: {}", path.display()))?;
        Self::parse(&content, path)
    }

    /// Parse lockfile content; `path` only appears in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let lockfile: Self = toml::from_str(content).map_err(|e| GitpinError::LockfileParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if lockfile.version > Self::CURRENT_VERSION {
            return Err(GitpinError::LockfileParse {
                file: path.display().to_string(),
                reason: format!(
                    "lockfile version {} is newer than supported version {}",
                    lockfile.version,
                    Self::CURRENT_VERSION
                ),
            }
            .into());
        }

        Ok(lockfile)
    }

    /// The canonical text of this lockfile.
    pub fn to_toml_string(&self) -> Result<String> {
        let mut sorted = self.clone();
        sorted.sort();
        let body = toml::to_string(&sorted).context("Failed to serialize lockfile")?;
        Ok(format!("{HEADER}{body}"))
    }

    /// Write the lockfile atomically. Returns `false` without touching the
    /// file when its content would not change.
    pub fn save(&self, path: &Path) -> Result<bool> {
        let content = self.to_toml_string()?;
        if let Ok(existing) = std::fs::read_to_string(path)
            && existing == content
        {
            tracing::debug!("Lockfile {} unchanged", path.display());
            return Ok(false);
        }

        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Failed to write lockfile: {}", path.display()))?;
        Ok(true)
    }
}
