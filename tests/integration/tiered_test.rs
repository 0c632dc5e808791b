//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 分层缓存集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{generate_unique_name, setup_logging};
use std::sync::Arc;
use std::time::Duration;
use tiercache::metrics::GLOBAL_METRICS;
use tiercache::{
    CacheBackend, CacheExt, FileBackend, KeyTtl, MemoryBackend, PromotionTtl, TieredCache,
};

async fn memory_over_file(
    dir: &tempfile::TempDir,
    name: &str,
) -> (Arc<MemoryBackend>, Arc<FileBackend>, TieredCache) {
    let fast = Arc::new(MemoryBackend::new());
    let slow = Arc::new(FileBackend::new(dir.path()).await.unwrap());
    let tiers: Vec<Arc<dyn CacheBackend>> = vec![fast.clone(), slow.clone()];
    let cache = TieredCache::new(tiers).unwrap().with_name(name);
    (fast, slow, cache)
}

/// 更快的层丢失数据后，读取由慢层提供并回填
#[tokio::test]
async fn test_read_through_promotion() {
    setup_logging();
    let dir = tempfile::tempdir().unwrap();
    let name = generate_unique_name("promotion");
    let (fast, _slow, cache) = memory_over_file(&dir, &name).await;

    cache
        .set("k", "v".to_string(), Duration::from_secs(60))
        .await
        .unwrap();
    fast.delete("k").await.unwrap();
    assert!(fast.get("k").await.unwrap_err().is_not_found());

    assert_eq!(cache.get("k").await.unwrap(), "v");
    assert_eq!(fast.get("k").await.unwrap(), "v");

    assert_eq!(GLOBAL_METRICS.request_count(&name, "0.memory", "get", "miss"), 1);
    assert_eq!(GLOBAL_METRICS.request_count(&name, "1.file", "get", "hit"), 1);

    // 回填后再次读取直接命中最快的层
    assert_eq!(cache.get("k").await.unwrap(), "v");
    assert_eq!(GLOBAL_METRICS.request_count(&name, "0.memory", "get", "hit"), 1);
}

/// 同一个缓存上的覆盖写入
#[tokio::test]
async fn test_overwrite_through_composite() {
    let dir = tempfile::tempdir().unwrap();
    let (fast, slow, cache) = memory_over_file(&dir, &generate_unique_name("overwrite")).await;

    cache
        .set("x", "1".to_string(), Duration::from_secs(120))
        .await
        .unwrap();
    cache
        .set("x", "2".to_string(), Duration::from_secs(120))
        .await
        .unwrap();

    assert_eq!(cache.get("x").await.unwrap(), "2");
    assert_eq!(fast.get("x").await.unwrap(), "2");
    assert_eq!(slow.get("x").await.unwrap(), "2");
}

/// 默认回填的副本永不过期，可能比源数据活得更久
#[tokio::test]
async fn test_default_promotion_never_expires() {
    let dir = tempfile::tempdir().unwrap();
    let (fast, slow, cache) = memory_over_file(&dir, &generate_unique_name("never")).await;

    slow.set("k", "v".to_string(), Duration::from_millis(300))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap(), "v");
    assert_eq!(fast.ttl("k").await.unwrap(), KeyTtl::Never);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(slow.get("k").await.unwrap_err().is_not_found());
    assert_eq!(cache.get("k").await.unwrap(), "v");
}

/// 继承策略下回填副本与源数据同时过期
#[tokio::test]
async fn test_inherited_promotion_expires_with_source() {
    let dir = tempfile::tempdir().unwrap();
    let fast = Arc::new(MemoryBackend::new());
    let slow = Arc::new(FileBackend::new(dir.path()).await.unwrap());
    let tiers: Vec<Arc<dyn CacheBackend>> = vec![fast.clone(), slow.clone()];
    let cache = TieredCache::new(tiers)
        .unwrap()
        .with_promotion_ttl(PromotionTtl::Inherit);

    slow.set("k", "v".to_string(), Duration::from_millis(400))
        .await
        .unwrap();
    assert_eq!(cache.get("k").await.unwrap(), "v");
    assert!(matches!(fast.ttl("k").await.unwrap(), KeyTtl::Expires(_)));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(fast.get("k").await.unwrap_err().is_not_found());
    assert!(cache.get("k").await.unwrap_err().is_not_found());
}

/// 三层缓存：在最慢的层命中时回填所有更快的层
#[tokio::test]
async fn test_three_tier_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let l0 = Arc::new(MemoryBackend::new());
    let l1 = Arc::new(MemoryBackend::new());
    let l2 = Arc::new(FileBackend::new(dir.path()).await.unwrap());
    let tiers: Vec<Arc<dyn CacheBackend>> = vec![l0.clone(), l1.clone(), l2.clone()];
    let cache = TieredCache::new(tiers).unwrap();

    l2.put("deep", "value", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(cache.get("deep").await.unwrap(), "value");
    assert_eq!(l0.get("deep").await.unwrap(), "value");
    assert_eq!(l1.get("deep").await.unwrap(), "value");

    assert!(cache.exists("deep").await.unwrap());
    cache.delete("deep").await.unwrap();
    assert!(!l2.exists("deep").await.unwrap());
    assert!(!cache.exists("deep").await.unwrap());
}

/// 写入结构化值后在各层看到相同的规范化文本
#[tokio::test]
async fn test_structured_values_are_normalized_once() {
    let dir = tempfile::tempdir().unwrap();
    let (fast, slow, cache) = memory_over_file(&dir, &generate_unique_name("json")).await;

    let mut fields = std::collections::BTreeMap::new();
    fields.insert("Name", serde_json::json!("t1"));
    fields.insert("Age", serde_json::json!(18));
    cache
        .put_json("user", &fields, Duration::from_secs(60))
        .await
        .unwrap();

    let expected = r#"{"Age":18,"Name":"t1"}"#;
    assert_eq!(fast.get("user").await.unwrap(), expected);
    assert_eq!(slow.get("user").await.unwrap(), expected);
}

/// 超大TTL在每一层都写入成功，且都保留过期时间
#[tokio::test]
async fn test_huge_ttl_reaches_every_tier() {
    let dir = tempfile::tempdir().unwrap();
    let name = generate_unique_name("huge_ttl");
    let (fast, slow, cache) = memory_over_file(&dir, &name).await;

    cache.set("k", "v".to_string(), Duration::MAX).await.unwrap();
    assert_eq!(fast.get("k").await.unwrap(), "v");
    assert_eq!(slow.get("k").await.unwrap(), "v");
    assert!(matches!(fast.ttl("k").await.unwrap(), KeyTtl::Expires(_)));
    assert!(matches!(slow.ttl("k").await.unwrap(), KeyTtl::Expires(_)));
    assert_eq!(GLOBAL_METRICS.request_count(&name, "1.file", "set", "error"), 0);
}
