//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub config_version: Option<u32>,
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub caches: HashMap<String, CacheConfig>,
}

/// 全局配置
///
/// 定义适用于所有缓存的默认配置
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// 键前缀，作用于Redis与文件缓存
    pub prefix_key: String,
    /// 命令行写入时的默认过期时间（秒），0表示永不过期
    pub default_ttl: u64,
}

/// 缓存配置
///
/// 定义单个命名缓存
#[derive(Deserialize, Clone, Debug, Default)]
pub struct CacheConfig {
    /// 缓存类型
    #[serde(rename = "type", default)]
    pub cache_type: CacheType,
    /// 键前缀，可覆盖全局配置
    pub prefix_key: Option<String>,
    pub memory: Option<MemoryConfig>,
    pub file: Option<FileConfig>,
    pub redis: Option<RedisConfig>,
    /// 分层缓存引用的其他缓存名称，按从快到慢排列
    #[serde(default)]
    pub tiers: Vec<String>,
    /// 分层缓存回填时使用的过期时间
    #[serde(default)]
    pub promotion_ttl: PromotionTtl,
}

/// 缓存类型枚举
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// 进程内存缓存
    #[default]
    Memory,
    /// 本地文件缓存
    File,
    /// Redis缓存
    Redis,
    /// 由其他缓存组合而成的分层缓存
    Tiered,
}

/// 分层缓存回填策略
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromotionTtl {
    /// 回填的副本永不过期
    #[default]
    Never,
    /// 回填时沿用命中层的剩余过期时间
    Inherit,
}

/// 内存缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MemoryConfig {
    /// 过期清理间隔（秒）
    pub sweep_interval_secs: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 10,
        }
    }
}

/// 文件缓存配置
#[derive(Deserialize, Clone, Debug, Default)]
pub struct FileConfig {
    /// 缓存目录
    pub dir: PathBuf,
}

/// Redis缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// `host:port` 或 `redis://` URL
    pub addr: String,
    pub password: Option<SecretString>,
    pub db: i64,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:6379".to_string(),
            password: None,
            db: 0,
            connection_timeout_ms: 5000,
        }
    }
}

impl CacheConfig {
    /// 该缓存实际使用的键前缀
    pub fn effective_prefix<'a>(&'a self, global: &'a GlobalConfig) -> &'a str {
        self.prefix_key.as_deref().unwrap_or(&global.prefix_key)
    }
}

impl Config {
    /// 从TOML文本解析配置
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text)
            .map_err(|e| CacheError::InvalidParameter(format!("Failed to parse config: {}", e)))
    }

    /// 从TOML文件读取配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CacheError::InvalidParameter(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// 验证配置
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = self.config_version {
            if version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.caches.is_empty() {
            return Err("At least one cache must be configured".to_string());
        }

        for (name, cache) in &self.caches {
            if name.is_empty() {
                return Err("Cache name cannot be empty".to_string());
            }

            match cache.cache_type {
                CacheType::Memory => {
                    if let Some(memory) = &cache.memory {
                        if memory.sweep_interval_secs == 0 {
                            return Err(format!(
                                "Cache '{}': sweep_interval_secs must be greater than 0",
                                name
                            ));
                        }
                    }
                }
                CacheType::File => {
                    let file = cache.file.as_ref().ok_or_else(|| {
                        format!("Cache '{}' is of type file but has no [file] section", name)
                    })?;
                    if file.dir.as_os_str().is_empty() {
                        return Err(format!("Cache '{}': file dir cannot be empty", name));
                    }
                }
                CacheType::Redis => {
                    let redis = cache.redis.as_ref().ok_or_else(|| {
                        format!("Cache '{}' is of type redis but has no [redis] section", name)
                    })?;
                    if redis.addr.is_empty() {
                        return Err(format!("Cache '{}': redis addr cannot be empty", name));
                    }
                    if redis.db < 0 {
                        return Err(format!("Cache '{}': redis db cannot be negative", name));
                    }
                    if redis.connection_timeout_ms == 0 {
                        return Err(format!(
                            "Cache '{}': connection_timeout_ms must be greater than 0",
                            name
                        ));
                    }
                }
                CacheType::Tiered => {
                    if cache.tiers.is_empty() {
                        return Err(format!("Tiered cache '{}' has no tiers", name));
                    }
                    for tier in &cache.tiers {
                        if !self.caches.contains_key(tier) {
                            return Err(format!(
                                "Tiered cache '{}' references unknown cache '{}'",
                                name, tier
                            ));
                        }
                    }
                }
            }
        }

        self.build_order().map(|_| ())
    }

    /// 计算缓存的构建顺序，被引用的缓存排在引用者之前
    ///
    /// 检测到循环引用时返回错误
    pub fn build_order(&self) -> std::result::Result<Vec<String>, String> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            name: &str,
            caches: &HashMap<String, CacheConfig>,
            marks: &mut BTreeMap<String, Mark>,
            order: &mut Vec<String>,
        ) -> std::result::Result<(), String> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => {
                    return Err(format!("Cache '{}' is part of a tier cycle", name))
                }
                None => {}
            }
            marks.insert(name.to_string(), Mark::Visiting);
            if let Some(cache) = caches.get(name) {
                if cache.cache_type == CacheType::Tiered {
                    for tier in &cache.tiers {
                        visit(tier, caches, marks, order)?;
                    }
                }
            }
            marks.insert(name.to_string(), Mark::Done);
            order.push(name.to_string());
            Ok(())
        }

        let mut names: Vec<&String> = self.caches.keys().collect();
        names.sort();

        let mut marks = BTreeMap::new();
        let mut order = Vec::with_capacity(names.len());
        for name in names {
            visit(name, &self.caches, &mut marks, &mut order)?;
        }
        Ok(order)
    }
}
