//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的指标收集功能。

use dashmap::DashMap;
use lazy_static::lazy_static;
use std::sync::Arc;
use tracing::{span, Level};

/// 指标收集器
///
/// 用于收集和存储缓存系统的各种运行时指标
#[derive(Clone, Debug, Default)]
pub struct Metrics {
    /// 请求总数统计
    /// key: "cache:tier:op:result"
    pub requests_total: Arc<DashMap<String, u64>>,
    /// 操作耗时，key: "cache:op" -> (total_duration_secs, count)
    pub operation_duration: Arc<DashMap<String, (f64, u64)>>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    /// 记录请求指标
    ///
    /// # 参数
    ///
    /// * `cache` - 缓存名称
    /// * `tier` - 层标识（如 `0.memory`）
    /// * `op` - 操作类型（get/set/delete/...）
    /// * `result` - 操作结果（hit/miss/promote/error）
    pub fn record_request(&self, cache: &str, tier: &str, op: &str, result: &str) {
        let span = span!(Level::TRACE, "cache_request", cache, tier, op, result);
        let _enter = span.enter();
        let key = format!("{}:{}:{}:{}", cache, tier, op, result);
        *self.requests_total.entry(key).or_insert(0) += 1;
    }

    /// 记录操作耗时
    pub fn record_duration(&self, cache: &str, op: &str, duration_secs: f64) {
        let key = format!("{}:{}", cache, op);
        let mut entry = self.operation_duration.entry(key).or_insert((0.0, 0));
        entry.0 += duration_secs;
        entry.1 += 1;
    }

    /// 查询某个请求计数
    pub fn request_count(&self, cache: &str, tier: &str, op: &str, result: &str) -> u64 {
        let key = format!("{}:{}:{}:{}", cache, tier, op, result);
        self.requests_total.get(&key).map(|v| *v).unwrap_or(0)
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为按标签排序的文本，用于监控系统采集
pub fn get_metrics_string() -> String {
    let metrics = &GLOBAL_METRICS;

    let mut reqs: Vec<(String, u64)> = metrics
        .requests_total
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    reqs.sort();

    let mut durations: Vec<(String, (f64, u64))> = metrics
        .operation_duration
        .iter()
        .map(|e| (e.key().clone(), *e.value()))
        .collect();
    durations.sort_by(|a, b| a.0.cmp(&b.0));

    let mut output = String::new();
    for (k, v) in reqs {
        output.push_str(&format!("cache_requests_total{{labels=\"{}\"}} {}\n", k, v));
    }
    for (k, (total, count)) in durations {
        if let Some((cache, op)) = k.rsplit_once(':') {
            output.push_str(&format!(
                "cache_operation_duration_seconds_sum{{cache=\"{}\", operation=\"{}\"}} {}\n",
                cache, op, total
            ));
            output.push_str(&format!(
                "cache_operation_duration_seconds_count{{cache=\"{}\", operation=\"{}\"}} {}\n",
                cache, op, count
            ));
        }
    }
    output
}
