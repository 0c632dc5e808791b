//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis缓存后端的实现。

use super::redis_provider::{DefaultRedisProvider, RedisProvider};
use super::{clamp_ttl, CacheBackend, KeyTtl};
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// PTTL 对永不过期的键返回的值
const PTTL_NO_EXPIRY: i64 = -1;
/// PTTL 对不存在的键返回的值
const PTTL_MISSING: i64 = -2;

/// 键值存储客户端
///
/// `RedisBackend` 只通过这组命令访问服务器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KvClient: Send + Sync {
    /// SET，`ttl_ms` 存在时附带 PX
    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<()>;
    /// GET，键不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn del(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
    /// PEXPIRE，键不存在时返回 `false`
    async fn pexpire(&self, key: &str, ttl_ms: u64) -> Result<bool>;
    /// PERSIST，键不存在或本就没有过期时间时返回 `false`
    async fn persist(&self, key: &str) -> Result<bool>;
    /// PTTL，原样返回 -1 / -2 哨兵值
    async fn pttl(&self, key: &str) -> Result<i64>;
}

#[async_trait]
impl KvClient for ConnectionManager {
    async fn set(&self, key: &str, value: &str, ttl_ms: Option<u64>) -> Result<()> {
        let mut conn = self.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ms) = ttl_ms {
            cmd.arg("PX").arg(ms);
        }
        cmd.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.clone();
        let count: i64 = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(count > 0)
    }

    async fn pexpire(&self, key: &str, ttl_ms: u64) -> Result<bool> {
        let mut conn = self.clone();
        let updated: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await?;
        Ok(updated == 1)
    }

    async fn persist(&self, key: &str) -> Result<bool> {
        let mut conn = self.clone();
        let updated: i64 = redis::cmd("PERSIST").arg(key).query_async(&mut conn).await?;
        Ok(updated == 1)
    }

    async fn pttl(&self, key: &str) -> Result<i64> {
        let mut conn = self.clone();
        let ttl: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(ttl)
    }
}

/// 将写入TTL换算为毫秒，零值表示不设置过期时间
///
/// 不足一毫秒的非零TTL按一毫秒计，超过上限的按上限计
fn ttl_millis(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        None
    } else {
        Some(u64::try_from(clamp_ttl(ttl).as_millis()).unwrap_or(u64::MAX).max(1))
    }
}

/// Redis缓存后端
///
/// 所有物理键都带有配置的前缀；连接断开由 `ConnectionManager` 自动重连
pub struct RedisBackend {
    client: Arc<dyn KvClient>,
    prefix: String,
}

impl RedisBackend {
    /// 按配置连接Redis并创建后端
    #[instrument(skip(config), level = "info", name = "init_redis_backend", fields(addr = %config.addr))]
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        Self::new_with_provider(config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者创建后端
    pub async fn new_with_provider(
        config: &RedisConfig,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        let (_client, manager) = provider.get_client(config).await?;
        Ok(Self::with_client(Arc::new(manager)))
    }

    /// 使用已有客户端创建后端
    pub fn with_client(client: Arc<dyn KvClient>) -> Self {
        Self {
            client,
            prefix: String::new(),
        }
    }

    /// 为所有键加上前缀
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn physical_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &str {
        "redis"
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let physical = self.physical_key(key);
        self.client.set(&physical, &value, ttl_millis(ttl)).await?;
        debug!("Redis set: key={}, ttl={:?}", physical, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<String> {
        self.client
            .get(&self.physical_key(key))
            .await?
            .ok_or_else(|| CacheError::key_not_found(key))
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.client.del(&self.physical_key(key)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        self.client.exists(&self.physical_key(key)).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let physical = self.physical_key(key);
        match ttl_millis(ttl) {
            Some(ms) => {
                if !self.client.pexpire(&physical, ms).await? {
                    return Err(CacheError::key_not_found(key));
                }
            }
            // 零TTL表示移除过期时间；EXPIRE key 0 会直接删除键
            None => {
                if !self.client.persist(&physical).await? && !self.client.exists(&physical).await? {
                    return Err(CacheError::key_not_found(key));
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        match self.client.pttl(&self.physical_key(key)).await? {
            PTTL_NO_EXPIRY => Ok(KeyTtl::Never),
            PTTL_MISSING => Err(CacheError::key_not_found(key)),
            ms if ms >= 0 => Ok(KeyTtl::Expires(Duration::from_millis(ms as u64))),
            other => Err(CacheError::BackendError(format!(
                "unexpected PTTL reply {} for {}",
                other, key
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        info!("关闭Redis缓存");
        Ok(())
    }
}
