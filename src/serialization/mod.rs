//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存值的字符串化策略。
//!
//! 所有后端只存储字符串。调用方传入的任意值在写入前统一经过
//! [`to_cache_string`] 转换，回退顺序固定：
//!
//! 1. 字符串原样返回
//! 2. 字节序列按UTF-8解码
//! 3. 空值渲染为空字符串
//! 4. 其他值编码为键有序的JSON文本
//! 5. JSON编码失败时使用 `Debug` 格式

use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;

/// 待写入缓存的值
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// 字符串
    Text(String),
    /// 原始字节
    Bytes(Vec<u8>),
    /// 空值
    Null,
    /// 结构化值（已转换为JSON）
    Json(Value),
    /// JSON编码失败后的可读渲染
    Rendered(String),
}

impl CacheValue {
    /// 从任意可序列化值构造
    ///
    /// 序列化结果为字符串时归入 `Text`。只有真正的空值（`None`、`()`、
    /// JSON null）归入 `Null`；非空值被编码成 null（如 NaN、无穷大）
    /// 或序列化失败时回退到 `Debug` 渲染
    pub fn structured<T: Serialize + Debug + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(Value::String(s)) => CacheValue::Text(s),
            Ok(Value::Null) => {
                let rendered = format!("{:?}", value);
                if is_absent_rendering(&rendered) {
                    CacheValue::Null
                } else {
                    CacheValue::Rendered(rendered)
                }
            }
            Ok(v) => CacheValue::Json(v),
            Err(e) => {
                tracing::debug!("JSON encoding failed, falling back to Debug rendering: {}", e);
                CacheValue::Rendered(format!("{:?}", value))
            }
        }
    }

    /// 转换为最终存储的字符串
    pub fn into_cache_string(self) -> String {
        match self {
            CacheValue::Text(s) => s,
            CacheValue::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
            CacheValue::Null => String::new(),
            CacheValue::Json(v) => sort_keys(v).to_string(),
            CacheValue::Rendered(s) => s,
        }
    }
}

fn is_absent_rendering(rendered: &str) -> bool {
    matches!(rendered, "None" | "()" | "Null")
}

/// 递归地按键名重排JSON对象
///
/// 即使依赖树启用了 serde_json 的 `preserve_order`，输出也保持有序
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// 将任意值转换为缓存字符串
pub fn to_cache_string(value: impl Into<CacheValue>) -> String {
    value.into().into_cache_string()
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Text(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Text(value.to_string())
    }
}

impl From<&String> for CacheValue {
    fn from(value: &String) -> Self {
        CacheValue::Text(value.clone())
    }
}

impl From<Vec<u8>> for CacheValue {
    fn from(value: Vec<u8>) -> Self {
        CacheValue::Bytes(value)
    }
}

impl From<&[u8]> for CacheValue {
    fn from(value: &[u8]) -> Self {
        CacheValue::Bytes(value.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for CacheValue {
    fn from(value: &[u8; N]) -> Self {
        CacheValue::Bytes(value.to_vec())
    }
}

impl From<()> for CacheValue {
    fn from(_: ()) -> Self {
        CacheValue::Null
    }
}

impl From<Value> for CacheValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => CacheValue::Text(s),
            Value::Null => CacheValue::Null,
            other => CacheValue::Json(other),
        }
    }
}

impl<T: Into<CacheValue>> From<Option<T>> for CacheValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => CacheValue::Null,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CacheValue {
                fn from(value: $ty) -> Self {
                    CacheValue::structured(&value)
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char);
