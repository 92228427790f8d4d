//! `gitpin config`: the global configuration and local overrides.
//!
//! ```text
//! gitpin config                           # show the current config
//! gitpin config path                      # where it is stored
//! gitpin config set-local rack ~/src/rack # use a working directory for rack
//! gitpin config unset-local rack
//! gitpin config branch-check off          # allow overrides without a branch
//! ```

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};

use super::CliConfig;
use crate::config::GlobalConfig;

#[derive(Args, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: Option<ConfigSubcommands>,
}

#[derive(Subcommand, Debug)]
enum ConfigSubcommands {
    /// Print the configuration
    Show,

    /// Print the location of the config file
    Path,

    /// Redirect a repository to a local working directory
    SetLocal {
        /// Repository URL or package name
        key: String,

        /// Working directory to use instead of the cached checkout
        path: String,
    },

    /// Remove a local override
    UnsetLocal {
        /// Repository URL or package name
        key: String,
    },

    /// Turn the local override branch check on or off
    BranchCheck {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl ConfigCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let path = match &cli.config_path {
            Some(path) => path.clone(),
            None => GlobalConfig::default_path()?,
        };

        match self.command {
            Some(ConfigSubcommands::Show) | None => Self::show(&path).await,
            Some(ConfigSubcommands::Path) => {
                println!("{}", path.display());
                Ok(())
            }
            Some(ConfigSubcommands::SetLocal {
                key,
                path: local,
            }) => Self::set_local(&path, key, local).await,
            Some(ConfigSubcommands::UnsetLocal {
                key,
            }) => Self::unset_local(&path, &key).await,
            Some(ConfigSubcommands::BranchCheck {
                state,
            }) => Self::branch_check(&path, state).await,
        }
    }

    async fn show(path: &Path) -> Result<()> {
        let config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
        println!("{} {}", "Config file:".bold(), path.display());
        if !path.exists() {
            println!("(not created yet, showing defaults)");
        }

        let content = toml::to_string_pretty(&config)?;
        if content.trim().is_empty() {
            println!("\nNo settings.");
        } else {
            println!("\n{content}");
        }
        Ok(())
    }

    async fn set_local(path: &Path, key: String, local: String) -> Result<()> {
        let mut config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;

        let expanded = PathBuf::from(shellexpand::tilde(&local).as_ref());
        if !expanded.exists() {
            eprintln!(
                "{} {} does not exist yet; installs will fail until it does",
                "warning:".yellow().bold(),
                expanded.display()
            );
        }

        config.set_local(key.clone(), local.clone());
        config.save_to(path).await?;
        println!("{} {key} -> {local}", "Local override set:".green().bold());
        Ok(())
    }

    async fn unset_local(path: &Path, key: &str) -> Result<()> {
        let mut config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
        if config.unset_local(key) {
            config.save_to(path).await?;
            println!("{} {key}", "Local override removed:".green().bold());
        } else {
            println!("No local override for {key}");
        }
        Ok(())
    }

    async fn branch_check(path: &Path, state: Toggle) -> Result<()> {
        let mut config = GlobalConfig::load_with_optional(Some(path.to_path_buf())).await?;
        config.disable_local_branch_check = state == Toggle::Off;
        config.save_to(path).await?;
        let label = match state {
            Toggle::On => "enabled",
            Toggle::Off => "disabled",
        };
        println!("Local override branch check {label}");
        Ok(())
    }
}
