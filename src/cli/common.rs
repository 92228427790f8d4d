//! Setup shared by the commands that operate on a project.

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use super::CliConfig;
use crate::cache::Cache;
use crate::config::{GlobalConfig, resolve_cache_dir};
use crate::installer::{InstallOptions, InstallSummary, Installer, default_parallelism};
use crate::manifest::{Manifest, find_manifest_with_optional};
use crate::source::GitSourceManager;

/// A located and parsed project plus the configuration it runs under.
#[derive(Debug)]
pub struct ProjectContext {
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
    pub config: GlobalConfig,
}

impl ProjectContext {
    /// Find the manifest (explicit path or upward search) and load the global
    /// config.
    pub async fn load(manifest_path: Option<PathBuf>, cli: &CliConfig) -> Result<Self> {
        let manifest_path = find_manifest_with_optional(manifest_path)?;
        let manifest = Manifest::load(&manifest_path)?;
        let config = GlobalConfig::load_with_optional(cli.config_path.clone()).await?;
        tracing::debug!("Using manifest {}", manifest_path.display());
        Ok(Self {
            manifest_path,
            manifest,
            config,
        })
    }

    /// Concurrency for this run: the flag, then the config, then the default.
    pub fn max_parallel(&self, flag: Option<usize>) -> usize {
        flag.or(self.config.max_parallel).unwrap_or_else(default_parallelism).max(1)
    }

    /// Build an installer over the shared cache.
    pub fn into_installer(self, options: InstallOptions) -> Result<Installer> {
        let cache_dir = resolve_cache_dir(&self.config)?;
        tracing::debug!("Using cache at {}", cache_dir.display());
        let manager = GitSourceManager::new(Cache::with_dir(cache_dir), self.config);
        Ok(Installer::new(self.manifest, &self.manifest_path, manager, options))
    }
}

/// Run an installer and print the closing line.
pub async fn run_and_report(installer: Installer, quiet: bool, verb: &str) -> Result<()> {
    let summary: InstallSummary = installer.run().await?;

    if !quiet {
        let count = summary.installed.len();
        let noun = if count == 1 { "package" } else { "packages" };
        println!(
            "{} {count} {noun} installed.",
            format!("{verb} complete!").green().bold()
        );
    }
    Ok(())
}
