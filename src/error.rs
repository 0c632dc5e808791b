//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的错误类型和处理机制。

use thiserror::Error;

/// 缓存系统错误类型枚举
///
/// 过期的键与从未存在的键一样，统一报告为 `KeyNotFound`
#[derive(Error, Debug)]
pub enum CacheError {
    /// 键不存在或已过期
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// 无法连接远程缓存服务
    #[error("Connection error: {0}")]
    Connection(String),

    /// 参数或配置无效
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 后端错误
    #[error("Backend error: {0}")]
    BackendError(String),
}

impl CacheError {
    /// 为指定键构造 `KeyNotFound` 错误
    pub fn key_not_found(key: &str) -> Self {
        CacheError::KeyNotFound(key.to_string())
    }

    /// 判断是否为键不存在错误
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::KeyNotFound(_))
    }
}

/// 将Redis错误归类为连接错误或后端错误
impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::BackendError(err.to_string())
        }
    }
}

/// 缓存操作结果类型别名
pub type Result<T> = std::result::Result<T, CacheError>;
