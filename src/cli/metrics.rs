//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了指标输出的实现。

use crate::metrics::{get_metrics_string, GLOBAL_METRICS};

/// 渲染指标文本
///
/// 指定缓存时输出该缓存的命中摘要，否则输出全部原始指标
pub fn render(cache: Option<&str>) -> String {
    let Some(cache_name) = cache else {
        return get_metrics_string();
    };

    let prefix = format!("{}:", cache_name);
    let mut total_gets = 0;
    let mut hits = 0;
    let mut errors = 0;
    // DashMap 无锁迭代
    for entry in GLOBAL_METRICS.requests_total.iter() {
        let Some(rest) = entry.key().strip_prefix(&prefix) else {
            continue;
        };
        let count = *entry.value();
        if rest.ends_with(":get:hit") || rest.ends_with(":get:miss") {
            total_gets += count;
        }
        if rest.ends_with(":get:hit") {
            hits += count;
        }
        if rest.ends_with(":error") {
            errors += count;
        }
    }

    let mut output = format!("=== Cache Metrics: {} ===\n", cache_name);
    output.push_str(&format!("  Tier lookups: {}\n", total_gets));
    output.push_str(&format!("  Hits:         {}\n", hits));
    output.push_str(&format!("  Tier errors:  {}\n", errors));
    output
}
