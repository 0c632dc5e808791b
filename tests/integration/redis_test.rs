//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis集成测试
//!
//! 需要可访问的Redis服务（`REDIS_URL`，默认本机），不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{
    assert_contract, assert_expire_missing, assert_expiry, generate_unique_name,
    is_redis_available, redis_url, setup_logging,
};
use std::sync::Arc;
use std::time::Duration;
use tiercache::config::RedisConfig;
use tiercache::{CacheBackend, KeyTtl, MemoryBackend, RedisBackend, TieredCache};

fn redis_config() -> RedisConfig {
    RedisConfig {
        addr: redis_url(),
        connection_timeout_ms: 2000,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_redis_backend_contract() {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过test_redis_backend_contract：Redis不可用");
        return;
    }

    let ns = generate_unique_name("contract");
    let cache = RedisBackend::new(&redis_config())
        .await
        .unwrap()
        .with_prefix("tiercache-test:");
    assert_contract(&cache, &ns).await;
    assert_expire_missing(&cache, &ns).await;
    assert_expiry(&cache, &ns).await;
    cache.close().await.unwrap();
}

/// 零TTL的 expire 移除过期时间而不是删除键
#[tokio::test]
async fn test_redis_persist_keeps_key() {
    if !is_redis_available().await {
        println!("跳过test_redis_persist_keeps_key：Redis不可用");
        return;
    }

    let key = generate_unique_name("persist");
    let cache = RedisBackend::new(&redis_config()).await.unwrap();
    cache
        .set(&key, "v".to_string(), Duration::from_secs(30))
        .await
        .unwrap();
    cache.expire(&key, Duration::ZERO).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), "v");
    assert_eq!(cache.ttl(&key).await.unwrap(), KeyTtl::Never);

    // 已经永不过期的键再次 persist 仍然成功
    cache.expire(&key, Duration::ZERO).await.unwrap();
    cache.delete(&key).await.unwrap();
}

/// 内存在前、Redis在后的分层缓存
#[tokio::test]
async fn test_memory_over_redis() {
    if !is_redis_available().await {
        println!("跳过test_memory_over_redis：Redis不可用");
        return;
    }

    let key = generate_unique_name("tiered");
    let fast = Arc::new(MemoryBackend::new());
    let remote = Arc::new(RedisBackend::new(&redis_config()).await.unwrap());
    let tiers: Vec<Arc<dyn CacheBackend>> = vec![fast.clone(), remote.clone()];
    let cache = TieredCache::new(tiers).unwrap();

    remote
        .set(&key, "from-redis".to_string(), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), "from-redis");
    assert_eq!(fast.get(&key).await.unwrap(), "from-redis");

    cache.delete(&key).await.unwrap();
    assert!(!remote.exists(&key).await.unwrap());
}
