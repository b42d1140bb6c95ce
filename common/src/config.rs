//! 設定管理
//!
//! ScanConfig（スキャン設定構造体）

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CommonError;

/// スキャン設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 候補エンドポイントの入力ファイル (デフォルト: "input/raw_input.json")
    #[serde(default = "default_input_path")]
    pub input_path: PathBuf,

    /// インベントリの出力ファイル (デフォルト: "data/live_servers.json")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// ログファイルの出力先ディレクトリ（未指定なら標準エラーのみ）
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 同時に実行するプローブ数の上限 (デフォルト: 50)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// 同時接続数の上限 (デフォルト: 100)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// 接続先ごとの同時接続数の上限 (デフォルト: 10)
    #[serde(default = "default_max_connections_per_host")]
    pub max_connections_per_host: usize,

    /// 1リクエストのタイムアウト（秒）(デフォルト: 5)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// 稼働確認の試行回数 (デフォルト: 2)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// リトライ待機の基準時間（ミリ秒、試行ごとに倍増）(デフォルト: 2000)
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// 入力にポートがない場合のポート番号 (デフォルト: 11434)
    #[serde(default = "default_port")]
    pub default_port: u16,

    /// 指定件数マージするごとに途中保存する
    #[serde(default)]
    pub flush_every: Option<usize>,

    /// 指定秒数ごとにスキャンを繰り返す
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

fn default_input_path() -> PathBuf {
    PathBuf::from("input/raw_input.json")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/live_servers.json")
}

fn default_max_concurrency() -> usize {
    50
}

fn default_max_connections() -> usize {
    100
}

fn default_max_connections_per_host() -> usize {
    10
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_base_delay() -> u64 {
    2000
}

fn default_port() -> u16 {
    11434
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_path: default_output_path(),
            log_dir: None,
            max_concurrency: default_max_concurrency(),
            max_connections: default_max_connections(),
            max_connections_per_host: default_max_connections_per_host(),
            probe_timeout_secs: default_probe_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            default_port: default_port(),
            flush_every: None,
            interval_secs: None,
        }
    }
}

impl ScanConfig {
    /// 設定値を検証する
    pub fn validate(&self) -> Result<(), CommonError> {
        if self.max_concurrency == 0 {
            return Err(CommonError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_connections == 0 || self.max_connections_per_host == 0 {
            return Err(CommonError::Config(
                "connection limits must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(CommonError::Config(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.probe_timeout_secs == 0 {
            return Err(CommonError::Config(
                "probe_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.flush_every == Some(0) {
            return Err(CommonError::Config(
                "flush_every must be at least 1".to_string(),
            ));
        }
        if self.interval_secs == Some(0) {
            return Err(CommonError::Config(
                "interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
