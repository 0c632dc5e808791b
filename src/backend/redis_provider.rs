//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis提供者接口和默认实现。

use crate::{
    config::RedisConfig,
    error::{CacheError, Result},
};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client, ConnectionInfo, IntoConnectionInfo};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// Redis连接提供者
///
/// 负责根据配置建立连接，测试中可替换
#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn get_client(&self, config: &RedisConfig) -> Result<(Client, ConnectionManager)>;
}

pub struct DefaultRedisProvider;

/// 由配置构造连接信息
///
/// `addr` 可以是 `host:port`，也可以是完整的 `redis://` 或 `rediss://` URL。
/// 配置中的密码与非零 `db` 覆盖URL中的对应部分。
pub fn connection_info(config: &RedisConfig) -> Result<ConnectionInfo> {
    let url = if config.addr.contains("://") {
        config.addr.clone()
    } else {
        format!("redis://{}", config.addr)
    };

    let mut info = url.as_str().into_connection_info().map_err(|e| {
        CacheError::InvalidParameter(format!("invalid redis address {}: {}", config.addr, e))
    })?;
    if config.db != 0 {
        info.redis.db = config.db;
    }
    if let Some(password) = &config.password {
        info.redis.password = Some(password.expose_secret().to_string());
    }
    Ok(info)
}

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn get_client(&self, config: &RedisConfig) -> Result<(Client, ConnectionManager)> {
        let info = connection_info(config)?;
        debug!("Connecting to redis at {}", info.addr);

        let client = Client::open(info)?;
        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(CacheError::Connection(format!(
                    "Connection timed out after {}ms. Target: {}",
                    config.connection_timeout_ms, config.addr
                )));
            }
        };
        info!("Redis connection established: {}", config.addr);
        Ok((client, manager))
    }
}
