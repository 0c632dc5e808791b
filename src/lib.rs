//! tiercache - 统一的键值缓存库
//!
//! 在内存、本地文件和Redis三种存储之上提供同一套缓存操作，
//! 并支持把它们组合成读时自动回填的分层缓存。

#![doc(html_root_url = "https://docs.rs/tiercache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod metrics;
pub mod serialization;
pub mod utils;

// Re-export commonly used items
pub use backend::{
    CacheBackend, FileBackend, KeyTtl, MemoryBackend, RedisBackend, MAX_TTL, NO_EXPIRATION,
    PERSISTENT,
};
pub use client::{CacheExt, TieredCache};
pub use config::{Config, PromotionTtl};
pub use error::{CacheError, Result};
pub use manager::CacheManager;
pub use serialization::{to_cache_string, CacheValue};

/// tiercache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
