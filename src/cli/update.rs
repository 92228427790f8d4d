//! `gitpin update`: move sources to their latest matching revision.
//!
//! Without arguments every source is fetched and re-resolved. With package
//! names only the repositories providing those packages are; everything else
//! keeps its locked revision.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::CliConfig;
use super::common::{ProjectContext, run_and_report};
use crate::installer::InstallOptions;
use crate::models::ResolveMode;

#[derive(Args, Debug, Default)]
pub struct UpdateCommand {
    /// Packages to update (all when omitted)
    packages: Vec<String>,

    /// Maximum number of repositories resolved at once
    #[arg(long, value_name = "NUM")]
    max_parallel: Option<usize>,
}

impl UpdateCommand {
    pub async fn execute(self, manifest_path: Option<PathBuf>, cli: &CliConfig) -> Result<()> {
        let project = ProjectContext::load(manifest_path, cli).await?;
        let options = InstallOptions {
            mode: ResolveMode::Update,
            max_parallel: project.max_parallel(self.max_parallel),
            update_packages: self.packages,
            frozen: false,
            progress: cli.show_progress(),
            quiet: cli.quiet,
        };
        let installer = project.into_installer(options)?;
        run_and_report(installer, cli.quiet, "Update").await
    }
}
