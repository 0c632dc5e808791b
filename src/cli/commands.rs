//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了键操作命令的实现。

use super::Commands;
use crate::backend::{CacheBackend, KeyTtl};
use crate::config::GlobalConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// 在指定缓存上执行一条命令，返回要打印的文本
pub async fn execute(
    command: &Commands,
    cache: &dyn CacheBackend,
    global: &GlobalConfig,
) -> Result<String> {
    match command {
        Commands::Set(args) => {
            let ttl = Duration::from_secs(args.ttl.unwrap_or(global.default_ttl));
            cache
                .set(&args.key, args.value.clone(), ttl)
                .await
                .with_context(|| format!("set {}", args.key))?;
            Ok("OK".to_string())
        }
        Commands::Get(args) => Ok(cache
            .get(&args.key)
            .await
            .with_context(|| format!("get {}", args.key))?),
        Commands::Delete(args) => {
            cache
                .delete(&args.key)
                .await
                .with_context(|| format!("delete {}", args.key))?;
            Ok("OK".to_string())
        }
        Commands::Exists(args) => {
            let exists = cache
                .exists(&args.key)
                .await
                .with_context(|| format!("exists {}", args.key))?;
            Ok(exists.to_string())
        }
        Commands::Expire(args) => {
            cache
                .expire(&args.key, Duration::from_secs(args.ttl))
                .await
                .with_context(|| format!("expire {}", args.key))?;
            Ok("OK".to_string())
        }
        Commands::Ttl(args) => {
            let ttl: KeyTtl = cache
                .ttl(&args.key)
                .await
                .with_context(|| format!("ttl {}", args.key))?;
            Ok(ttl.as_secs().to_string())
        }
        Commands::List => Ok(String::new()),
    }
}
