//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了文件缓存后端的实现。
//!
//! 每个键对应目录中的一个JSON文件：
//!
//! ```json
//! {"value":"...","expiration":"2026-01-01T00:00:00Z"}
//! ```
//!
//! 永不过期的条目写入零时间 `0001-01-01T00:00:00Z`，
//! 读取时零时间、`null` 或缺失字段都视为永不过期。

use super::{clamp_ttl, CacheBackend, KeyTtl};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// 永不过期条目写入的零时间
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// 文件名（不含扩展名）的最大长度，超过后改用哈希命名
const MAX_HEX_NAME_LEN: usize = 200;

#[derive(Serialize)]
struct StoredEntry<'a> {
    value: &'a str,
    expiration: String,
}

#[derive(Deserialize)]
struct LoadedEntry {
    value: String,
    #[serde(default)]
    expiration: Option<DateTime<Utc>>,
}

impl LoadedEntry {
    /// 过期时刻，零时间视为永不过期
    fn deadline(&self) -> Option<DateTime<Utc>> {
        self.expiration.filter(|t| t.year() > 1)
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.deadline(), Some(t) if now >= t)
    }
}

/// 文件缓存后端
///
/// 不持有任何内部锁。写入先落到同目录的临时文件再原子重命名，
/// 读者不会看到写了一半的文件；同一键的并发写入以最后一次为准。
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    prefix: String,
}

impl FileBackend {
    /// 创建文件缓存后端
    ///
    /// 目录（及其父目录）不存在时会被创建。
    ///
    /// # 参数
    ///
    /// * `dir` - 缓存目录
    ///
    /// # 返回值
    ///
    /// 路径为空时返回 `InvalidParameter`，目录无法创建或不可写时返回错误
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if dir.as_os_str().is_empty() {
            return Err(CacheError::InvalidParameter(
                "file cache directory must not be empty".to_string(),
            ));
        }

        tokio::fs::create_dir_all(dir).await?;
        let metadata = tokio::fs::metadata(dir).await?;
        if !metadata.is_dir() {
            return Err(CacheError::InvalidParameter(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        if metadata.permissions().readonly() {
            return Err(CacheError::InvalidParameter(format!(
                "{} is read-only",
                dir.display()
            )));
        }

        info!("文件缓存目录: {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: String::new(),
        })
    }

    /// 为所有键加上前缀
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// 缓存目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 计算键对应的文件路径
    ///
    /// 文件名为带前缀键的UTF-8字节的十六进制表示；
    /// 过长时使用 murmur3 128位哈希
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        let physical = format!("{}{}", self.prefix, key);
        let hex = to_hex(physical.as_bytes());
        let name = if hex.len() > MAX_HEX_NAME_LEN {
            let hash = murmur3::murmur3_x64_128(&mut Cursor::new(physical.as_bytes()), 0)?;
            format!("h-{:032x}.json", hash)
        } else {
            format!("{}.json", hex)
        };
        Ok(self.dir.join(name))
    }

    /// 读取一个仍然有效的条目
    ///
    /// 过期、不可读或无法解析的文件会被删除并视为不存在
    async fn load(&self, key: &str) -> Result<Option<(PathBuf, LoadedEntry)>> {
        let path = self.file_path(key)?;
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("Unreadable cache file {}, removing: {}", path.display(), e);
                remove_quietly(&path).await;
                return Ok(None);
            }
        };

        let entry: LoadedEntry = match serde_json::from_slice(&data) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Corrupt cache file {}, removing: {}", path.display(), e);
                remove_quietly(&path).await;
                return Ok(None);
            }
        };

        if entry.is_expired(Utc::now()) {
            debug!("File entry expired: key={}", key);
            remove_quietly(&path).await;
            return Ok(None);
        }

        Ok(Some((path, entry)))
    }

    async fn write_entry(&self, path: &Path, value: &str, ttl: Duration) -> Result<()> {
        let entry = StoredEntry {
            value,
            expiration: expiration_text(ttl)?,
        };
        let data =
            serde_json::to_vec(&entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let tmp = self
            .dir
            .join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            remove_quietly(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

fn expiration_text(ttl: Duration) -> Result<String> {
    if ttl.is_zero() {
        return Ok(ZERO_TIME.to_string());
    }
    let delta = chrono::Duration::from_std(clamp_ttl(ttl))
        .map_err(|e| CacheError::InvalidParameter(format!("ttl out of range: {}", e)))?;
    let deadline = Utc::now()
        .checked_add_signed(delta)
        .ok_or_else(|| CacheError::InvalidParameter(format!("ttl out of range: {:?}", ttl)))?;
    Ok(deadline.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Failed to remove cache file {}: {}", path.display(), e);
        }
    }
}

#[async_trait]
impl CacheBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let path = self.file_path(key)?;
        self.write_entry(&path, &value, ttl).await?;
        debug!("File set: key={}, ttl={:?}", key, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<String> {
        match self.load(key).await? {
            Some((_, entry)) => Ok(entry.value),
            None => Err(CacheError::key_not_found(key)),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.file_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.load(key).await?.is_some())
    }

    #[instrument(skip(self), level = "debug")]
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        match self.load(key).await? {
            Some((path, entry)) => self.write_entry(&path, &entry.value, ttl).await,
            None => Err(CacheError::key_not_found(key)),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let (_, entry) = self
            .load(key)
            .await?
            .ok_or_else(|| CacheError::key_not_found(key))?;
        match entry.deadline() {
            None => Ok(KeyTtl::Never),
            // 读取与计算之间刚好过期时按零剩余时间报告
            Some(t) => Ok(KeyTtl::Expires(
                (t - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            )),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
