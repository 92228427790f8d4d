//! `gitpin cache`: inspect or clean the shared cache.

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

use super::CliConfig;
use crate::cache::Cache;
use crate::config::{GlobalConfig, resolve_cache_dir};

#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: Option<CacheSubcommands>,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommands {
    /// Show the cache location, size and cached repositories
    Info,

    /// Remove all clones, checkouts and cached metadata
    Clean,
}

impl CacheCommand {
    pub async fn execute(self, cli: &CliConfig) -> Result<()> {
        let config = GlobalConfig::load_with_optional(cli.config_path.clone()).await?;
        let cache = Cache::with_dir(resolve_cache_dir(&config)?);

        match self.command {
            Some(CacheSubcommands::Info) | None => Self::info(&cache).await,
            Some(CacheSubcommands::Clean) => Self::clean(&cache, cli.quiet).await,
        }
    }

    async fn info(cache: &Cache) -> Result<()> {
        println!("{} {}", "Cache location:".bold(), cache.dir().display());

        if !cache.dir().exists() {
            println!("The cache is empty.");
            return Ok(());
        }

        println!("{} {}", "Size:".bold(), format_size(cache.size().await?));

        let clones = cache.list_clones().await?;
        if clones.is_empty() {
            println!("No repositories cached.");
        } else {
            println!("{}", format!("Repositories ({}):", clones.len()).bold());
            for (key, _) in clones {
                println!("  {key}");
            }
        }
        Ok(())
    }

    async fn clean(cache: &Cache, quiet: bool) -> Result<()> {
        let freed = if cache.dir().exists() {
            cache.size().await?
        } else {
            0
        };
        cache.clean().await?;
        if !quiet {
            println!("{} freed {}", "Cache cleaned:".green().bold(), format_size(freed));
        }
        Ok(())
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
