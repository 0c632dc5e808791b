//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存客户端的扩展接口和分层缓存实现。

pub mod tiered;

pub use tiered::TieredCache;

use crate::backend::CacheBackend;
use crate::error::{CacheError, Result};
use crate::serialization::{to_cache_string, CacheValue};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::instrument;

/// 缓存扩展特征
///
/// 在字符串契约之上提供类型化的读写，写入前统一经过值的字符串化策略
#[async_trait]
pub trait CacheExt: CacheBackend {
    /// 写入任意可转换为 [`CacheValue`] 的值
    #[instrument(skip(self, value), level = "debug")]
    async fn put<V: Into<CacheValue> + Send>(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        let text = to_cache_string(value);
        self.set(key, text, ttl).await
    }

    /// 写入可序列化的结构化值
    #[instrument(skip(self, value), level = "debug")]
    async fn put_json<T: Serialize + Debug + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let text = CacheValue::structured(value).into_cache_string();
        self.set(key, text, ttl).await
    }

    /// 读取并按JSON反序列化
    #[instrument(skip(self), level = "debug")]
    async fn get_json<T: DeserializeOwned + Send>(&self, key: &str) -> Result<T> {
        let text = self.get(key).await?;
        serde_json::from_str(&text).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// 读取缓存值，键不存在时返回 `None`
    async fn get_opt(&self, key: &str) -> Result<Option<String>> {
        match self.get(key).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl<T: CacheBackend + ?Sized> CacheExt for T {}
