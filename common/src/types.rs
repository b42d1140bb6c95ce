//! 共通型定義
//!
//! CandidateEndpoint, ProbeResult, InventoryRecord等のコアデータ型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::age::AGE_NOT_AVAILABLE;
use crate::error::CommonError;
use crate::lenient;

/// バージョンが取得できなかった場合の値
pub const UNKNOWN_VERSION: &str = "unknown";

/// 位置情報（スキャナーは解釈せずそのまま引き継ぐ）
///
/// フィードによって文字列・数値のどちらもあり得るため、値はJSONのまま保持する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    /// 都市名
    #[serde(default)]
    pub city: Option<Value>,
    /// 国コード
    #[serde(default)]
    pub country: Option<Value>,
    /// 国名
    #[serde(default)]
    pub country_name: Option<Value>,
    /// 地域名
    #[serde(default)]
    pub region: Option<Value>,
    /// 緯度
    #[serde(default)]
    pub latitude: Option<Value>,
    /// 経度
    #[serde(default)]
    pub longitude: Option<Value>,
}

/// スキャン候補のエンドポイント
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEndpoint {
    /// 生のアドレス（IPv4ドット表記を想定）
    pub address: String,
    /// ポート番号
    pub port: u16,
    /// 位置情報
    pub geo: GeoInfo,
}

impl CandidateEndpoint {
    /// 位置情報なしで作成
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            geo: GeoInfo::default(),
        }
    }
}

/// エンドポイント状態
///
/// 永続化形式は `live` / `http_error_<code>` / `unreachable`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServerStatus {
    /// 稼働確認のリクエストが200を返した
    Live,
    /// 稼働確認のリクエストが200以外を返した
    HttpError(u16),
    /// リトライを使い切っても接続できなかった
    Unreachable,
}

impl ServerStatus {
    /// オンラインかどうか
    pub fn is_live(&self) -> bool {
        matches!(self, ServerStatus::Live)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Live => f.write_str("live"),
            ServerStatus::HttpError(code) => write!(f, "http_error_{}", code),
            ServerStatus::Unreachable => f.write_str("unreachable"),
        }
    }
}

impl FromStr for ServerStatus {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(ServerStatus::Live),
            "unreachable" => Ok(ServerStatus::Unreachable),
            other => other
                .strip_prefix("http_error_")
                .and_then(|code| code.parse::<u16>().ok())
                .map(ServerStatus::HttpError)
                .ok_or_else(|| CommonError::InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ServerStatus {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ServerStatus> for String {
    fn from(status: ServerStatus) -> Self {
        status.to_string()
    }
}

/// モデル（ローカル保存済み・ロード中のどちらにも使う）
///
/// `digest` や `details` などのその他のフィールドは `extra` にそのまま残す。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// モデル名 (例: "llama3:8b")
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub name: Option<String>,
    /// モデル識別子
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub model: Option<String>,
    /// サイズ（バイト）
    #[serde(default, deserialize_with = "lenient::optional_size")]
    pub size: Option<u64>,
    /// その他のフィールド
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 1エンドポイントに対するプローブ結果
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// 稼働状態
    pub status: ServerStatus,
    /// サーバーバージョン（取得失敗時は "unknown"）
    pub version: String,
    /// ローカル保存済みモデル
    pub local_models: Vec<ModelSummary>,
    /// ロード中モデル
    pub running_models: Vec<ModelSummary>,
}

impl ProbeResult {
    /// 稼働確認に失敗した結果（付加情報なし）
    pub fn offline(status: ServerStatus) -> Self {
        Self {
            status,
            version: UNKNOWN_VERSION.to_string(),
            local_models: Vec::new(),
            running_models: Vec::new(),
        }
    }
}

/// 永続化されるインベントリレコード
///
/// JSONのフィールド名は既存の出力ファイルと互換。
/// 未知のフィールドは `extra` に保持し、保存時にそのまま書き戻す。
/// `null` や型の合わない値は既定値として読み、レコード自体は捨てない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// マスク済みアドレス
    #[serde(default, rename = "ip", deserialize_with = "lenient::string")]
    pub address: String,
    /// ポート番号
    #[serde(default, deserialize_with = "lenient::port")]
    pub port: u16,
    /// 位置情報（最終観測値）
    #[serde(flatten)]
    pub geo: GeoInfo,
    /// 稼働状態
    #[serde(default = "default_status", deserialize_with = "lenient::status")]
    pub status: ServerStatus,
    /// サーバーバージョン
    #[serde(default = "default_version", deserialize_with = "lenient::version")]
    pub version: String,
    /// ローカル保存済みモデル
    #[serde(default, rename = "local", deserialize_with = "lenient::models")]
    pub local_models: Vec<ModelSummary>,
    /// ロード中モデル
    #[serde(default, rename = "running", deserialize_with = "lenient::models")]
    pub running_models: Vec<ModelSummary>,
    /// 初めてオンラインを確認した時刻（一度設定したら変更しない）
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub first_seen_online: Option<String>,
    /// 最終観測時刻
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub last_observed: Option<String>,
    /// 最終更新時刻
    #[serde(default, deserialize_with = "lenient::optional_string")]
    pub last_updated: Option<String>,
    /// `first_seen_online` からの経過時間
    #[serde(default = "default_age", deserialize_with = "lenient::age")]
    pub age: String,
    /// 未知のフィールド
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_status() -> ServerStatus {
    ServerStatus::Unreachable
}

fn default_version() -> String {
    UNKNOWN_VERSION.to_string()
}

fn default_age() -> String {
    AGE_NOT_AVAILABLE.to_string()
}

impl InventoryRecord {
    /// 初観測のエンドポイント用の空レコード
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
            geo: GeoInfo::default(),
            status: default_status(),
            version: default_version(),
            local_models: Vec::new(),
            running_models: Vec::new(),
            first_seen_online: None,
            last_observed: None,
            last_updated: None,
            age: default_age(),
            extra: Map::new(),
        }
    }

    /// `first_seen_online` が設定済みか（空文字は未設定扱い）
    pub fn has_been_online(&self) -> bool {
        self.first_seen_online
            .as_deref()
            .is_some_and(|value| !value.is_empty())
    }
}
