//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存后端契约以及内存、文件、Redis三种后端实现。

pub mod file;
pub mod memory;
pub mod redis_provider;
pub mod remote;

use crate::error::Result;
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use remote::{KvClient, RedisBackend};

/// "永不过期" 的TTL哨兵值
pub const NO_EXPIRATION: i64 = -1;

/// 表示永不过期的写入TTL
pub const PERSISTENT: Duration = Duration::ZERO;

/// 写入TTL的上限（100年），更大的值按此截断，仍然是有期限的条目
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// 将写入TTL截断到 [`MAX_TTL`]
pub(crate) fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.min(MAX_TTL)
}

/// 键的剩余生存时间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// 永不过期
    Never,
    /// 剩余生存时间
    Expires(Duration),
}

impl KeyTtl {
    /// 以秒表示的剩余时间，永不过期时返回 [`NO_EXPIRATION`]
    pub fn as_secs(&self) -> i64 {
        match self {
            KeyTtl::Never => NO_EXPIRATION,
            KeyTtl::Expires(d) => i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// 剩余时间，永不过期时返回 `None`
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Never => None,
            KeyTtl::Expires(d) => Some(*d),
        }
    }

    /// 转换为可再次写入的TTL（永不过期对应 [`PERSISTENT`]）
    pub fn as_write_ttl(&self) -> Duration {
        self.remaining().unwrap_or(PERSISTENT)
    }
}

/// 根据写入TTL计算过期时刻，零值表示永不过期
pub(crate) fn expires_at(ttl: Duration) -> Option<Instant> {
    if ttl.is_zero() {
        None
    } else {
        Some(Instant::now() + clamp_ttl(ttl))
    }
}

/// 缓存后端契约
///
/// 所有后端（包括组合后端 `TieredCache`）都实现这一组操作。
/// 已过期的条目对 `get`、`exists`、`ttl` 而言与不存在的键完全一致。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 后端名称，用于日志和指标
    fn name(&self) -> &str;

    /// 写入键值对
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `value` - 已字符串化的缓存值
    /// * `ttl` - 过期时间，[`PERSISTENT`]（零值）表示永不过期
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// 读取缓存值
    ///
    /// 键不存在或已过期时返回 `KeyNotFound`
    async fn get(&self, key: &str) -> Result<String>;

    /// 删除缓存项，删除不存在的键不是错误
    async fn delete(&self, key: &str) -> Result<()>;

    /// 检查键是否存在且未过期
    async fn exists(&self, key: &str) -> Result<bool>;

    /// 更新键的过期时间
    ///
    /// 与 `set` 相同的TTL语义，键不存在时返回 `KeyNotFound`
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// 获取键的剩余生存时间
    ///
    /// 键不存在或已过期时返回 `KeyNotFound`
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// 释放后端资源，只应调用一次
    async fn close(&self) -> Result<()>;
}
