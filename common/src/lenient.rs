//! 既存ファイル読み込み用の寛容なデシリアライザ
//!
//! 過去の出力には `null` や型の異なる値が含まれることがある。
//! レコードを捨てずに読み込めるよう、合わない値は既定値に読み替える。

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::age::AGE_NOT_AVAILABLE;
use crate::types::{ModelSummary, ServerStatus, UNKNOWN_VERSION};

/// 文字列・数値・真偽値を文字列として読む
fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(Value::deserialize(deserializer)?).unwrap_or_default())
}

pub(crate) fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(Value::deserialize(deserializer)?))
}

pub(crate) fn version<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(Value::deserialize(deserializer)?).unwrap_or_else(|| UNKNOWN_VERSION.to_string()))
}

pub(crate) fn age<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(Value::deserialize(deserializer)?).unwrap_or_else(|| AGE_NOT_AVAILABLE.to_string()))
}

/// 数値または数値文字列。読めなければ0
pub(crate) fn port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let port = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(port.unwrap_or(0))
}

/// 認識できない状態は `unreachable` として読む
pub(crate) fn status<'de, D>(deserializer: D) -> Result<ServerStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ServerStatus::Unreachable))
}

pub(crate) fn optional_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// モデル一覧。文字列要素はモデル名として扱い、それ以外の要素は読み飛ばす
pub(crate) fn models<'de, D>(deserializer: D) -> Result<Vec<ModelSummary>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(_) => serde_json::from_value(item).ok(),
            Value::String(name) => Some(ModelSummary {
                name: Some(name),
                ..ModelSummary::default()
            }),
            _ => None,
        })
        .collect())
}
