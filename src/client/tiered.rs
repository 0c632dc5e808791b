//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了分层缓存的实现。
//!
//! 分层缓存按顺序组合若干后端（下标0最快）。写操作依次扇出到每一层，
//! 单层失败只记录日志和指标；读操作按顺序探测，在第i层命中后回填到
//! 所有更快的层。分层缓存本身也实现 [`CacheBackend`]，因此可以嵌套。

use crate::backend::{CacheBackend, KeyTtl, PERSISTENT};
use crate::config::PromotionTtl;
use crate::error::{CacheError, Result};
use crate::metrics::GLOBAL_METRICS;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// 分层缓存
pub struct TieredCache {
    name: String,
    tiers: Vec<Arc<dyn CacheBackend>>,
    promotion_ttl: PromotionTtl,
}

impl TieredCache {
    /// 创建分层缓存
    ///
    /// # 参数
    ///
    /// * `tiers` - 按从快到慢排列的后端列表，不能为空
    pub fn new(tiers: Vec<Arc<dyn CacheBackend>>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(CacheError::InvalidParameter(
                "tiered cache needs at least one tier".to_string(),
            ));
        }
        Ok(Self {
            name: "tiered".to_string(),
            tiers,
            promotion_ttl: PromotionTtl::default(),
        })
    }

    /// 设置缓存名称，用于日志和指标
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 设置回填策略
    pub fn with_promotion_ttl(mut self, promotion_ttl: PromotionTtl) -> Self {
        self.promotion_ttl = promotion_ttl;
        self
    }

    pub fn tiers(&self) -> &[Arc<dyn CacheBackend>] {
        &self.tiers
    }

    fn tier_label(index: usize, tier: &Arc<dyn CacheBackend>) -> String {
        format!("{}.{}", index, tier.name())
    }

    fn record(&self, index: usize, op: &str, result: &str) {
        let label = Self::tier_label(index, &self.tiers[index]);
        GLOBAL_METRICS.record_request(&self.name, &label, op, result);
    }

    /// 记录被吞掉的单层错误
    fn swallow(&self, index: usize, op: &str, key: &str, err: &CacheError) {
        warn!(
            "Tiered cache {} tier {} ({}) {} failed for key {}: {}",
            self.name,
            index,
            self.tiers[index].name(),
            op,
            key,
            err
        );
        self.record(index, op, "error");
    }

    /// 将第 `source` 层命中的值回填到所有更快的层
    async fn promote(&self, key: &str, value: &str, source: usize) {
        let ttl = match self.promotion_ttl {
            PromotionTtl::Never => PERSISTENT,
            PromotionTtl::Inherit => match self.tiers[source].ttl(key).await {
                Ok(KeyTtl::Never) => PERSISTENT,
                // 命中后立即过期的值不再回填，零TTL会被当作永不过期
                Ok(KeyTtl::Expires(remaining)) if remaining.is_zero() => return,
                Ok(KeyTtl::Expires(remaining)) => remaining,
                Err(e) => {
                    debug!("Skipping promotion of {}: ttl lookup failed: {}", key, e);
                    return;
                }
            },
        };

        for index in 0..source {
            match self.tiers[index].set(key, value.to_string(), ttl).await {
                Ok(()) => self.record(index, "promote", "ok"),
                Err(e) => self.swallow(index, "promote", key, &e),
            }
        }
        debug!(
            "Promoted key {} from tier {} into {} faster tier(s)",
            key, source, source
        );
    }
}

#[async_trait]
impl CacheBackend for TieredCache {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, value), level = "debug", fields(cache = %self.name))]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        for (index, tier) in self.tiers.iter().enumerate() {
            if let Err(e) = tier.set(key, value.clone(), ttl).await {
                self.swallow(index, "set", key, &e);
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    async fn get(&self, key: &str) -> Result<String> {
        let start = Instant::now();
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.get(key).await {
                Ok(value) => {
                    self.record(index, "get", "hit");
                    if index > 0 {
                        self.promote(key, &value, index).await;
                    }
                    GLOBAL_METRICS.record_duration(&self.name, "get", start.elapsed().as_secs_f64());
                    return Ok(value);
                }
                Err(e) if e.is_not_found() => self.record(index, "get", "miss"),
                Err(e) => self.swallow(index, "get", key, &e),
            }
        }
        GLOBAL_METRICS.record_duration(&self.name, "get", start.elapsed().as_secs_f64());
        Err(CacheError::key_not_found(key))
    }

    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    async fn delete(&self, key: &str) -> Result<()> {
        for (index, tier) in self.tiers.iter().enumerate() {
            if let Err(e) = tier.delete(key).await {
                self.swallow(index, "delete", key, &e);
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    async fn exists(&self, key: &str) -> Result<bool> {
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.exists(key).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => self.swallow(index, "exists", key, &e),
            }
        }
        Ok(false)
    }

    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        for (index, tier) in self.tiers.iter().enumerate() {
            match tier.expire(key, ttl).await {
                Ok(()) => {}
                // 键只存在于部分层是正常情况
                Err(e) if e.is_not_found() => self.record(index, "expire", "miss"),
                Err(e) => self.swallow(index, "expire", key, &e),
            }
        }
        Ok(())
    }

    #[instrument(skip(self), level = "debug", fields(cache = %self.name))]
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        for tier in &self.tiers {
            if let Ok(ttl) = tier.ttl(key).await {
                return Ok(ttl);
            }
        }
        Err(CacheError::key_not_found(key))
    }

    async fn close(&self) -> Result<()> {
        info!("关闭分层缓存 {}", self.name);
        for (index, tier) in self.tiers.iter().enumerate() {
            if let Err(e) = tier.close().await {
                self.swallow(index, "close", "-", &e);
            }
        }
        Ok(())
    }
}
