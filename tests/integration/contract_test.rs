//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 缓存契约集成测试：内存、文件与分层缓存

#[path = "../common/mod.rs"]
mod common;

use common::{assert_contract, assert_expire_missing, assert_expiry, setup_logging};
use std::sync::Arc;
use std::time::Duration;
use tiercache::{CacheBackend, CacheExt, FileBackend, MemoryBackend, TieredCache};

#[tokio::test]
async fn test_memory_backend_contract() {
    setup_logging();
    let cache = MemoryBackend::new();
    assert_contract(&cache, "mem").await;
    assert_expire_missing(&cache, "mem").await;
    assert_expiry(&cache, "mem").await;
    cache.close().await.unwrap();
}

#[tokio::test]
async fn test_file_backend_contract() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let cache = FileBackend::new(dir.path().join("cache")).await.unwrap();
    assert_contract(&cache, "file").await;
    assert_expire_missing(&cache, "file").await;
    assert_expiry(&cache, "file").await;
    cache.close().await.unwrap();
}

#[tokio::test]
async fn test_tiered_cache_contract() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let tiers: Vec<Arc<dyn CacheBackend>> = vec![
        Arc::new(MemoryBackend::new()),
        Arc::new(FileBackend::new(dir.path()).await.unwrap()),
    ];
    let cache = TieredCache::new(tiers).unwrap();
    assert_contract(&cache, "tiered").await;
    // 扇出写入吞掉单层的 KeyNotFound
    cache
        .expire("tiered:missing", Duration::from_secs(5))
        .await
        .unwrap();
    assert_expiry(&cache, "tiered").await;
    cache.close().await.unwrap();
}

/// 文件缓存在重新打开同一目录后仍能读到数据
#[tokio::test]
async fn test_file_backend_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let cache = FileBackend::new(dir.path()).await.unwrap().with_prefix("app:");
        cache
            .put("user:1", "alice", Duration::from_secs(60))
            .await
            .unwrap();
    }

    let reopened = FileBackend::new(dir.path()).await.unwrap().with_prefix("app:");
    assert_eq!(reopened.get("user:1").await.unwrap(), "alice");

    // 不同前缀看不到同一个键
    let other = FileBackend::new(dir.path()).await.unwrap();
    assert!(other.get("user:1").await.unwrap_err().is_not_found());
}

/// 同一个键的并发写入最终保留其中一次完整写入
#[tokio::test]
async fn test_file_backend_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(FileBackend::new(dir.path()).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache
                .set("shared", format!("writer-{}", i), Duration::from_secs(60))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let value = cache.get("shared").await.unwrap();
    assert!(value.starts_with("writer-"));
}
