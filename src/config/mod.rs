//! Configuration for gitpin.
//!
//! Configuration is read once at the start of a run and never persisted into
//! project files. Sources, highest precedence first:
//!
//! 1. Environment variables: `GITPIN_CACHE_DIR` (cache location) and
//!    `GITPIN_CONFIG_PATH` (global config file)
//! 2. The global config file, `~/.gitpin/config.toml` by default, or the file
//!    passed with `--config`
//! 3. Built-in defaults
//!
//! The global config carries the local override bindings, the branch-check
//! toggle and optional cache and parallelism settings. See [`GlobalConfig`].

pub mod global;

pub use global::{GlobalConfig, OverrideBinding};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "GITPIN_CACHE_DIR";

/// Environment variable overriding the global config file location.
pub const CONFIG_PATH_ENV: &str = "GITPIN_CONFIG_PATH";

/// The directory holding gitpin's per-user state (`~/.gitpin`).
pub fn gitpin_home() -> Result<PathBuf> {
    let base = if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
            .join("gitpin")
    } else {
        dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
            .join(".gitpin")
    };
    Ok(base)
}

/// Resolve the cache directory: `GITPIN_CACHE_DIR`, else `~/.gitpin/cache`.
///
/// Relative locations are anchored at the current directory, so the result is
/// always absolute. The directory is not created here; the cache creates it on
/// first write.
pub fn get_cache_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV)
        && !dir.is_empty()
    {
        return absolute_cache_dir(Path::new(shellexpand::tilde(&dir).as_ref()));
    }
    Ok(gitpin_home()?.join("cache"))
}

/// Resolve the cache directory for a run, letting the global config's
/// `cache_dir` apply when the environment does not set one.
pub fn resolve_cache_dir(config: &GlobalConfig) -> Result<PathBuf> {
    if std::env::var(CACHE_DIR_ENV).is_ok_and(|d| !d.is_empty()) {
        return get_cache_dir();
    }
    match &config.cache_dir {
        Some(dir) => absolute_cache_dir(Path::new(
            shellexpand::tilde(&dir.display().to_string()).as_ref(),
        )),
        None => get_cache_dir(),
    }
}

// git runs inside the bare clones, so every cache path it sees must be absolute
fn absolute_cache_dir(dir: &Path) -> Result<PathBuf> {
    std::path::absolute(dir)
        .with_context(|| format!("Cannot resolve cache directory: {}", dir.display()))
}
