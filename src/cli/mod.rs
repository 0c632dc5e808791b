//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::manager::CacheManager;
use crate::utils::init_cli_logging;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tiercache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, default_value = "tiercache.toml", help = "Path to the TOML config")]
    pub config: PathBuf,

    #[arg(long, help = "Cache to operate on (optional when only one is configured)")]
    pub cache: Option<String>,

    #[arg(long, help = "Print request metrics after the command")]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "set", about = "Store a value")]
    Set(SetArgs),

    #[command(name = "get", about = "Read a value")]
    Get(KeyArgs),

    #[command(name = "delete", about = "Remove a key")]
    Delete(KeyArgs),

    #[command(name = "exists", about = "Check whether a key is live")]
    Exists(KeyArgs),

    #[command(name = "expire", about = "Change the expiration of a key")]
    Expire(ExpireArgs),

    #[command(name = "ttl", about = "Show remaining time to live in seconds (-1 = never)")]
    Ttl(KeyArgs),

    #[command(name = "list", about = "List configured caches")]
    List,
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    pub key: String,
    pub value: String,

    #[arg(short, long, help = "Time to live in seconds, 0 = never expires")]
    pub ttl: Option<u64>,
}

#[derive(Parser, Debug)]
pub struct ExpireArgs {
    pub key: String,

    #[arg(help = "Time to live in seconds, 0 = never expires")]
    pub ttl: u64,
}

mod commands;
mod metrics;

pub use commands::execute;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_cli_logging("warn");

    let config = Config::from_file(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let manager = CacheManager::init(&config)
        .await
        .context("Failed to initialize caches")?;

    let result = dispatch(&cli, &config, &manager).await;
    let shutdown = manager.shutdown().await;

    let output = result?;
    if !output.is_empty() {
        println!("{}", output);
    }
    if cli.metrics {
        print!("{}", metrics::render(cli.cache.as_deref()));
    }
    shutdown.context("Failed to close caches")?;
    Ok(())
}

async fn dispatch(cli: &Cli, config: &Config, manager: &CacheManager) -> Result<String> {
    if let Commands::List = cli.command {
        return Ok(manager.names().join("\n"));
    }

    let name = resolve_cache_name(cli.cache.as_deref(), &manager.names())?;
    let cache = manager.get(&name)?;
    execute(&cli.command, cache.as_ref(), &config.global).await
}

/// 选择要操作的缓存：显式指定优先，否则只有一个缓存时使用它
fn resolve_cache_name(requested: Option<&str>, names: &[String]) -> Result<String> {
    match requested {
        Some(name) => Ok(name.to_string()),
        None => match names {
            [only] => Ok(only.clone()),
            [] => bail!("No caches configured"),
            _ => bail!(
                "Multiple caches configured ({}); choose one with --cache",
                names.join(", ")
            ),
        },
    }
}
