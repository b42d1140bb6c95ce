//! scan サブコマンド
//!
//! 候補フィードの全エンドポイントをプローブし、インベントリを更新します。
//! 設定の優先順位: コマンドライン引数 / 環境変数 > 設定ファイル > 既定値

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::common::config::ScanConfig;
use crate::config::load_scan_config;
use crate::coordinator::{ScanCoordinator, ScanReport};
use crate::error::CensusResult;

/// scan サブコマンドの引数
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// JSON config file
    #[arg(short, long, env = "LLM_CENSUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Candidate feed
    #[arg(short, long, env = "LLM_CENSUS_INPUT")]
    pub input: Option<PathBuf>,

    /// Inventory file to update
    #[arg(short, long, env = "LLM_CENSUS_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Maximum probes in flight
    #[arg(long, env = "LLM_CENSUS_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Maximum open connections
    #[arg(long, env = "LLM_CENSUS_MAX_CONNECTIONS")]
    pub max_connections: Option<usize>,

    /// Maximum open connections per endpoint
    #[arg(long, env = "LLM_CENSUS_MAX_CONNECTIONS_PER_HOST")]
    pub max_connections_per_host: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "LLM_CENSUS_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Liveness attempts before an endpoint is unreachable
    #[arg(long, env = "LLM_CENSUS_RETRIES")]
    pub retries: Option<u32>,

    /// Base backoff between liveness attempts, doubled each retry
    #[arg(long, env = "LLM_CENSUS_RETRY_DELAY_MS")]
    pub retry_delay_ms: Option<u64>,

    /// Save the inventory after every N merged results
    #[arg(long, env = "LLM_CENSUS_FLUSH_EVERY")]
    pub flush_every: Option<usize>,

    /// Repeat the scan every N seconds until interrupted
    #[arg(long, env = "LLM_CENSUS_INTERVAL")]
    pub interval: Option<u64>,

    /// Also write daily log files to this directory
    #[arg(long, env = "LLM_CENSUS_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl ScanArgs {
    /// 指定された引数で設定を上書きする
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(value) = self.concurrency {
            config.max_concurrency = value;
        }
        if let Some(value) = self.max_connections {
            config.max_connections = value;
        }
        if let Some(value) = self.max_connections_per_host {
            config.max_connections_per_host = value;
        }
        if let Some(value) = self.timeout {
            config.probe_timeout_secs = value;
        }
        if let Some(value) = self.retries {
            config.max_retries = value;
        }
        if let Some(value) = self.retry_delay_ms {
            config.retry_base_delay_ms = value;
        }
        if self.flush_every.is_some() {
            config.flush_every = self.flush_every;
        }
        if self.interval.is_some() {
            config.interval_secs = self.interval;
        }
        if self.log_dir.is_some() {
            config.log_dir = self.log_dir.clone();
        }
        config
    }

    /// 設定ファイルと引数から最終的な設定を組み立てる
    pub async fn resolve_config(&self) -> CensusResult<ScanConfig> {
        let config = self.apply(load_scan_config(self.config.as_deref()).await?);
        config.validate()?;
        Ok(config)
    }
}

/// Execute the scan command
pub async fn execute(config: ScanConfig, cancel: CancellationToken) -> CensusResult<ScanReport> {
    info!(
        input = %config.input_path.display(),
        output = %config.output_path.display(),
        "Scan configured"
    );
    let coordinator = ScanCoordinator::from_config(config)?;
    let report = coordinator.run(cancel).await?;
    info!(
        candidates = report.candidates,
        live = report.live,
        http_error = report.http_error,
        unreachable = report.unreachable,
        records = report.records,
        cancelled = report.cancelled,
        "Scan finished"
    );
    Ok(report)
}
