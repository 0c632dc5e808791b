//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use std::time::Duration;
use tiercache::{CacheBackend, KeyTtl, NO_EXPIRATION, PERSISTENT};

pub use tiercache::utils::{generate_unique_name, setup_logging};

/// 测试使用的Redis地址，来自 `REDIS_URL`，默认本机
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 检查Redis是否可用
pub async fn is_redis_available() -> bool {
    tiercache::utils::is_redis_available_url(&redis_url()).await
}

/// 对任意后端运行一遍契约检查
///
/// 键使用 `ns` 作为前缀，避免共享后端（如Redis）上的测试互相干扰
pub async fn assert_contract(cache: &dyn CacheBackend, ns: &str) {
    let key = |k: &str| format!("{}:{}", ns, k);

    // 写入后读取
    cache
        .set(&key("a"), "1".to_string(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), "1");
    assert!(cache.exists(&key("a")).await.unwrap());

    // 覆盖写入
    cache
        .set(&key("a"), "2".to_string(), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(cache.get(&key("a")).await.unwrap(), "2");

    // 不存在的键
    assert!(cache.get(&key("missing")).await.unwrap_err().is_not_found());
    assert!(!cache.exists(&key("missing")).await.unwrap());
    assert!(cache.ttl(&key("missing")).await.unwrap_err().is_not_found());
    cache.delete(&key("missing")).await.unwrap();

    // 永不过期
    cache
        .set(&key("forever"), "v".to_string(), PERSISTENT)
        .await
        .unwrap();
    assert_eq!(
        cache.ttl(&key("forever")).await.unwrap().as_secs(),
        NO_EXPIRATION
    );

    // 更新过期时间
    cache
        .expire(&key("forever"), Duration::from_secs(30))
        .await
        .unwrap();
    match cache.ttl(&key("forever")).await.unwrap() {
        KeyTtl::Expires(d) => assert!(d <= Duration::from_secs(30) && d >= Duration::from_secs(28)),
        KeyTtl::Never => panic!("expire did not set a deadline"),
    }
    cache.expire(&key("forever"), PERSISTENT).await.unwrap();
    assert_eq!(cache.ttl(&key("forever")).await.unwrap(), KeyTtl::Never);

    // 删除
    cache.delete(&key("a")).await.unwrap();
    assert!(cache.get(&key("a")).await.unwrap_err().is_not_found());
    cache.delete(&key("forever")).await.unwrap();
}

/// 检查单一后端对不存在的键更新过期时间时报告 `KeyNotFound`
///
/// 分层缓存的扇出写入会吞掉单层错误，不适用此检查
pub async fn assert_expire_missing(cache: &dyn CacheBackend, ns: &str) {
    let key = format!("{}:missing", ns);
    assert!(cache
        .expire(&key, Duration::from_secs(5))
        .await
        .unwrap_err()
        .is_not_found());
    assert!(cache.expire(&key, PERSISTENT).await.unwrap_err().is_not_found());
}

/// 检查条目过期后与不存在的键表现一致
pub async fn assert_expiry(cache: &dyn CacheBackend, ns: &str) {
    let key = format!("{}:short", ns);
    cache
        .set(&key, "v".to_string(), Duration::from_millis(300))
        .await
        .unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), "v");

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(cache.get(&key).await.unwrap_err().is_not_found());
    assert!(!cache.exists(&key).await.unwrap());
    assert!(cache.ttl(&key).await.unwrap_err().is_not_found());
}
