//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了内存缓存后端的实现。

use super::{expires_at, CacheBackend, KeyTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// 默认的过期清理间隔
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

type EntryMap = Arc<RwLock<HashMap<String, MemoryEntry>>>;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expire_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expire_at {
            Some(t) => now < t,
            None => true,
        }
    }
}

/// 内存缓存后端
///
/// 所有条目保存在一个由读写锁保护的 `HashMap` 中。
/// 每个实例拥有一个后台清理任务，按固定间隔删除已过期条目；
/// 读操作只会跳过过期条目，不会修改映射。
pub struct MemoryBackend {
    entries: EntryMap,
    shutdown: CancellationToken,
}

impl MemoryBackend {
    /// 使用默认清理间隔创建内存后端
    ///
    /// 必须在 tokio 运行时中调用
    pub fn new() -> Self {
        Self::spawn(DEFAULT_SWEEP_INTERVAL)
    }

    /// 使用指定清理间隔创建内存后端
    ///
    /// # 参数
    ///
    /// * `interval` - 清理间隔，不能为零
    pub fn with_sweep_interval(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(CacheError::InvalidParameter(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self::spawn(interval))
    }

    fn spawn(interval: Duration) -> Self {
        let entries: EntryMap = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        spawn_sweeper(entries.clone(), interval, shutdown.clone());
        Self { entries, shutdown }
    }

    /// 当前保存的条目数（包含尚未清理的过期条目）
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// 是否没有任何条目
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// 立即执行一次过期清理
    ///
    /// # 返回值
    ///
    /// 返回被删除的条目数
    pub async fn purge_expired(&self) -> usize {
        purge(&self.entries).await
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn purge(entries: &EntryMap) -> usize {
    let now = Instant::now();
    let mut guard = entries.write().await;
    let before = guard.len();
    guard.retain(|_, entry| entry.is_live(now));
    before - guard.len()
}

fn spawn_sweeper(entries: EntryMap, interval: Duration, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 第一次 tick 立即完成，跳过它
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Memory sweep task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let removed = purge(&entries).await;
                    if removed > 0 {
                        debug!("Memory sweep: removed {} expired entries", removed);
                    }
                }
            }
        }
    });
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let entry = MemoryEntry {
            value,
            expire_at: expires_at(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        debug!("Memory set: key={}, ttl={:?}", key, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<String> {
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => Ok(entry.value.clone()),
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        let guard = self.entries.read().await;
        Ok(guard
            .get(key)
            .map(|entry| entry.is_live(Instant::now()))
            .unwrap_or(false))
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut guard = self.entries.write().await;
        match guard.get_mut(key) {
            Some(entry) if entry.is_live(Instant::now()) => {
                entry.expire_at = expires_at(ttl);
                Ok(())
            }
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let now = Instant::now();
        let guard = self.entries.read().await;
        match guard.get(key) {
            Some(entry) if entry.is_live(now) => Ok(match entry.expire_at {
                Some(t) => KeyTtl::Expires(t.saturating_duration_since(now)),
                None => KeyTtl::Never,
            }),
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    async fn close(&self) -> Result<()> {
        info!("关闭内存缓存");
        self.shutdown.cancel();
        Ok(())
    }
}
