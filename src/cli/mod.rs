//! Command-line interface for gitpin.
//!
//! Commands:
//!
//! - `install`: resolve every declared source, honoring the lockfile
//! - `update`: re-resolve all sources, or only the named packages
//! - `cache`: inspect or clean the shared clone cache
//! - `config`: show or edit the global configuration, including local
//!   overrides
//!
//! Global flags apply to every command:
//!
//! ```text
//! -v, --verbose          debug logging
//! -q, --quiet            no output except errors
//! -c, --config <PATH>    global config file to use
//!     --manifest-path    gitpin.toml to use instead of searching upward
//!     --no-progress      disable the spinner
//! ```
//!
//! Logging goes to stderr through `tracing-subscriber`. `RUST_LOG` takes
//! precedence over the level chosen by `--verbose` and `--quiet`.

mod cache;
mod common;
mod config;
mod install;
mod update;


use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::ProjectContext;

/// Settings derived from the global flags, passed down to every command.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` disables logging.
    pub log_level: Option<String>,
    pub no_progress: bool,
    pub quiet: bool,
    /// Explicit global config file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber.
    ///
    /// Safe to call more than once; later calls are ignored.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok_and(|v| !v.is_empty()) {
            EnvFilter::from_default_env()
        } else {
            match &self.log_level {
                Some(level) => EnvFilter::new(format!("gitpin_cli={level}")),
                None => EnvFilter::new("off"),
            }
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
            .try_init();
    }

    /// Whether the spinner should be drawn.
    pub fn show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}

#[derive(Parser)]
#[command(
    name = "gitpin",
    about = "Pin packages to git revisions and keep them cached",
    version,
    long_about = "gitpin resolves packages declared against git repositories to exact commits, \
                  records them in gitpin.lock and keeps the checkouts in a shared cache."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the global config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to gitpin.toml (defaults to searching upward from the current directory)
    #[arg(long, global = true)]
    manifest_path: Option<PathBuf>,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the packages declared in gitpin.toml
    Install(install::InstallCommand),

    /// Re-resolve sources to their latest matching revisions
    Update(update::UpdateCommand),

    /// Inspect or clean the cache
    Cache(cache::CacheCommand),

    /// Show or edit the global configuration
    Config(config::ConfigCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        config.init_logging();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("warn".to_string())
        };

        CliConfig {
            log_level,
            no_progress: self.no_progress,
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Install(cmd) => cmd.execute(self.manifest_path, &config).await,
            Commands::Update(cmd) => cmd.execute(self.manifest_path, &config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
            Commands::Config(cmd) => cmd.execute(&config).await,
        }
    }
}
