//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存管理器，负责按配置构建并管理所有命名缓存。

use crate::backend::redis_provider::{DefaultRedisProvider, RedisProvider};
use crate::backend::{CacheBackend, FileBackend, MemoryBackend, RedisBackend};
use crate::client::TieredCache;
use crate::config::{CacheConfig, CacheType, Config, GlobalConfig};
use crate::error::{CacheError, Result};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// 缓存管理器
///
/// 被分层缓存引用的缓存与同名的独立缓存共享同一个实例
pub struct CacheManager {
    caches: DashMap<String, Arc<dyn CacheBackend>>,
    /// 没有被任何分层缓存引用的缓存，关闭时只关闭它们
    roots: Vec<String>,
}

impl CacheManager {
    /// 按配置初始化所有缓存
    ///
    /// # 参数
    ///
    /// * `config` - 缓存系统配置
    ///
    /// # 返回值
    ///
    /// 配置无效或任一缓存构建失败时返回错误
    pub async fn init(config: &Config) -> Result<Self> {
        Self::init_with_provider(config, Arc::new(DefaultRedisProvider)).await
    }

    /// 使用指定的Redis提供者初始化
    #[instrument(skip(config, provider), level = "info", fields(cache_count = config.caches.len()))]
    pub async fn init_with_provider(
        config: &Config,
        provider: Arc<dyn RedisProvider>,
    ) -> Result<Self> {
        config.validate().map_err(CacheError::InvalidParameter)?;
        let order = config
            .build_order()
            .map_err(CacheError::InvalidParameter)?;

        info!("Initializing CacheManager with {} caches", order.len());
        let caches: DashMap<String, Arc<dyn CacheBackend>> = DashMap::new();
        for name in &order {
            let cache_cfg = config.caches.get(name).ok_or_else(|| {
                CacheError::InvalidParameter(format!("Unknown cache '{}'", name))
            })?;
            let cache = match build_cache(name, cache_cfg, &config.global, &caches, &provider).await
            {
                Ok(cache) => cache,
                Err(e) => {
                    // 已经构建的缓存需要释放（例如内存缓存的清理任务）
                    close_all(&caches).await;
                    return Err(e);
                }
            };
            info!("Cache '{}' ({:?}) initialized", name, cache_cfg.cache_type);
            caches.insert(name.clone(), cache);
        }

        let referenced: HashSet<&String> = config
            .caches
            .values()
            .filter(|c| c.cache_type == CacheType::Tiered)
            .flat_map(|c| c.tiers.iter())
            .collect();
        let roots = order
            .iter()
            .filter(|name| !referenced.contains(name))
            .cloned()
            .collect();

        Ok(Self { caches, roots })
    }

    /// 按名称获取缓存
    pub fn get(&self, name: &str) -> Result<Arc<dyn CacheBackend>> {
        self.caches
            .get(name)
            .map(|c| c.value().clone())
            .ok_or_else(|| CacheError::InvalidParameter(format!("Unknown cache '{}'", name)))
    }

    /// 所有缓存名称（已排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 关闭所有缓存
    ///
    /// 分层缓存会关闭其引用的各层，因此只关闭未被引用的缓存。
    /// 所有缓存都会被尝试关闭，返回遇到的错误汇总。
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down {} root caches", self.roots.len());
        let mut errors = Vec::new();
        for name in &self.roots {
            let cache = match self.caches.get(name) {
                Some(c) => c.value().clone(),
                None => continue,
            };
            if let Err(e) = cache.close().await {
                warn!("Failed to close cache '{}': {}", name, e);
                errors.push(format!("{}: {}", name, e));
            }
        }
        self.caches.clear();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CacheError::BackendError(format!(
                "Shutdown errors: {}",
                errors.join("; ")
            )))
        }
    }
}

async fn close_all(caches: &DashMap<String, Arc<dyn CacheBackend>>) {
    let built: Vec<Arc<dyn CacheBackend>> = caches.iter().map(|e| e.value().clone()).collect();
    for cache in built {
        if let Err(e) = cache.close().await {
            warn!("Failed to close cache '{}' during rollback: {}", cache.name(), e);
        }
    }
}

/// 构建单个缓存，分层缓存引用的缓存必须已经构建
async fn build_cache(
    name: &str,
    cfg: &CacheConfig,
    global: &GlobalConfig,
    built: &DashMap<String, Arc<dyn CacheBackend>>,
    provider: &Arc<dyn RedisProvider>,
) -> Result<Arc<dyn CacheBackend>> {
    let prefix = cfg.effective_prefix(global);
    let cache: Arc<dyn CacheBackend> = match cfg.cache_type {
        CacheType::Memory => {
            let interval = cfg
                .memory
                .as_ref()
                .map(|m| Duration::from_secs(m.sweep_interval_secs))
                .unwrap_or(crate::backend::memory::DEFAULT_SWEEP_INTERVAL);
            Arc::new(MemoryBackend::with_sweep_interval(interval)?)
        }
        CacheType::File => {
            let file = cfg.file.as_ref().ok_or_else(|| {
                CacheError::InvalidParameter(format!("Cache '{}' has no [file] section", name))
            })?;
            Arc::new(FileBackend::new(&file.dir).await?.with_prefix(prefix))
        }
        CacheType::Redis => {
            let redis = cfg.redis.as_ref().ok_or_else(|| {
                CacheError::InvalidParameter(format!("Cache '{}' has no [redis] section", name))
            })?;
            Arc::new(
                RedisBackend::new_with_provider(redis, provider.clone())
                    .await?
                    .with_prefix(prefix),
            )
        }
        CacheType::Tiered => {
            let tiers = cfg
                .tiers
                .iter()
                .map(|tier| {
                    built
                        .get(tier)
                        .map(|c| c.value().clone())
                        .ok_or_else(|| {
                            CacheError::InvalidParameter(format!(
                                "Tiered cache '{}' references unknown cache '{}'",
                                name, tier
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(
                TieredCache::new(tiers)?
                    .with_name(name)
                    .with_promotion_ttl(cfg.promotion_ttl),
            )
        }
    };
    Ok(cache)
}
