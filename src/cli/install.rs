//! `gitpin install`: resolve the manifest against the lockfile.
//!
//! Sources already pinned in `gitpin.lock` stay at their recorded revision and
//! are not fetched when that revision is cached. New or changed sources are
//! resolved and added to the lockfile.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliConfig;
use super::common::{ProjectContext, run_and_report};
use crate::installer::InstallOptions;
use crate::models::ResolveMode;

#[derive(Args, Debug, Default)]
pub struct InstallCommand {
    /// Fail if gitpin.lock is missing or would change, and never write it
    #[arg(long)]
    frozen: bool,

    /// Maximum number of repositories resolved at once
    #[arg(long, value_name = "NUM")]
    max_parallel: Option<usize>,
}

impl InstallCommand {
    pub async fn execute(self, manifest_path: Option<PathBuf>, cli: &CliConfig) -> Result<()> {
        let project = ProjectContext::load(manifest_path, cli).await?;
        let options = InstallOptions {
            mode: ResolveMode::Install,
            update_packages: Vec::new(),
            frozen: self.frozen,
            max_parallel: project.max_parallel(self.max_parallel),
            progress: cli.show_progress(),
            quiet: cli.quiet,
        };
        let installer = project.into_installer(options)?;
        run_and_report(installer, cli.quiet, "Install").await
    }
}
