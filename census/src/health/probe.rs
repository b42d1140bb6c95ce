//! HTTPプローブ
//!
//! 稼働確認（`/api/ps`）は通信エラー時のみ指数バックオフでリトライし、
//! 200以外のHTTPステータスは即座に確定する。
//! 付加情報（`/api/version`, `/api/tags`）は一度だけ取得し、失敗時は既定値にする。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{ConnectionLimiter, Probe};
use crate::common::config::ScanConfig;
use crate::common::identity::mask_address;
use crate::common::types::{
    CandidateEndpoint, ModelSummary, ProbeResult, ServerStatus, UNKNOWN_VERSION,
};
use crate::error::CensusResult;

/// 稼働確認とロード中モデルの取得に使うパス
pub const LIVENESS_PATH: &str = "/api/ps";

/// バージョン取得のパス
pub const VERSION_PATH: &str = "/api/version";

/// ローカル保存済みモデル一覧のパス
pub const LOCAL_MODELS_PATH: &str = "/api/tags";

/// 接続プールのアイドルタイムアウト（秒）
const POOL_IDLE_TIMEOUT_SECS: u64 = 60;

/// TCP keepalive（秒）
const TCP_KEEPALIVE_SECS: u64 = 30;

/// バックオフ倍率の上限（2^16倍）
const MAX_BACKOFF_SHIFT: u32 = 16;

/// `/api/version` レスポンス
#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: Option<String>,
}

/// `/api/ps` `/api/tags` 共通のモデル一覧レスポンス
#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelSummary>,
}

/// HTTPレスポンス（ステータスとボディ）
struct Reply {
    status: StatusCode,
    /// 読み取りに失敗した場合は `None`
    body: Option<Vec<u8>>,
}

/// 稼働確認の結果
enum Liveness {
    Live(Vec<ModelSummary>),
    HttpError(u16),
    Unreachable,
}

/// HTTPプローブ
///
/// HTTPクライアント（接続プール）とリミッターは全プローブで共有する。
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: Client,
    limiter: ConnectionLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpProbe {
    /// 設定からプローブを作成
    pub fn new(config: &ScanConfig) -> CensusResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .pool_max_idle_per_host(config.max_connections_per_host)
            .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
            .tcp_keepalive(Duration::from_secs(TCP_KEEPALIVE_SECS))
            .no_proxy()
            .build()?;

        Ok(Self::with_client(
            client,
            ConnectionLimiter::new(config.max_connections, config.max_connections_per_host),
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        ))
    }

    /// 既存のクライアントとリミッターから作成
    pub fn with_client(
        client: Client,
        limiter: ConnectionLimiter,
        max_retries: u32,
        retry_base_delay: Duration,
    ) -> Self {
        Self {
            client,
            limiter,
            max_retries: max_retries.max(1),
            retry_base_delay,
        }
    }

    /// `attempt` 回目の失敗後の待機時間（基準時間を試行ごとに倍増）
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.retry_base_delay.saturating_mul(1u32 << shift)
    }

    /// 単一候補をプローブする
    pub async fn probe_endpoint(&self, candidate: &CandidateEndpoint) -> ProbeResult {
        let destination = destination(&candidate.address, candidate.port);
        let label = format!("{}:{}", mask_address(&candidate.address), candidate.port);

        let running_models = match self.check_liveness(&destination, &label).await {
            Liveness::Live(models) => models,
            Liveness::HttpError(code) => return ProbeResult::offline(ServerStatus::HttpError(code)),
            Liveness::Unreachable => return ProbeResult::offline(ServerStatus::Unreachable),
        };

        let (version, local_models) = tokio::join!(
            self.fetch_version(&destination, &label),
            self.fetch_local_models(&destination, &label),
        );

        ProbeResult {
            status: ServerStatus::Live,
            version,
            local_models,
            running_models,
        }
    }

    /// `/api/ps` で稼働確認する
    async fn check_liveness(&self, destination: &str, label: &str) -> Liveness {
        for attempt in 1..=self.max_retries {
            match self.get(destination, LIVENESS_PATH).await {
                Ok(reply) if reply.status == StatusCode::OK => {
                    let models = parse_models(reply.body.as_deref(), label, LIVENESS_PATH);
                    return Liveness::Live(models);
                }
                Ok(reply) => {
                    warn!(
                        endpoint = %label,
                        status = reply.status.as_u16(),
                        "Liveness check responded with non-200 status"
                    );
                    return Liveness::HttpError(reply.status.as_u16());
                }
                Err(e) => {
                    error!(
                        endpoint = %label,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Network error during liveness check"
                    );
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }
        }

        Liveness::Unreachable
    }

    /// `/api/version` を取得する（失敗時は "unknown"）
    async fn fetch_version(&self, destination: &str, label: &str) -> String {
        let reply = match self.get(destination, VERSION_PATH).await {
            Ok(reply) if reply.status.is_success() => reply,
            Ok(reply) => {
                debug!(
                    endpoint = %label,
                    status = reply.status.as_u16(),
                    "Version request: non-success status"
                );
                return UNKNOWN_VERSION.to_string();
            }
            Err(e) => {
                error!(endpoint = %label, error = %e, "Version request failed");
                return UNKNOWN_VERSION.to_string();
            }
        };

        let Some(body) = reply.body else {
            return UNKNOWN_VERSION.to_string();
        };
        match serde_json::from_slice::<VersionResponse>(&body) {
            Ok(parsed) => parsed
                .version
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            Err(e) => {
                error!(endpoint = %label, error = %e, "Failed to parse version response");
                UNKNOWN_VERSION.to_string()
            }
        }
    }

    /// `/api/tags` を取得する（失敗時は空）
    async fn fetch_local_models(&self, destination: &str, label: &str) -> Vec<ModelSummary> {
        match self.get(destination, LOCAL_MODELS_PATH).await {
            Ok(reply) if reply.status.is_success() => {
                parse_models(reply.body.as_deref(), label, LOCAL_MODELS_PATH)
            }
            Ok(reply) => {
                debug!(
                    endpoint = %label,
                    status = reply.status.as_u16(),
                    "Local models request: non-success status"
                );
                Vec::new()
            }
            Err(e) => {
                error!(endpoint = %label, error = %e, "Local models request failed");
                Vec::new()
            }
        }
    }

    /// 接続許可を保持したままGETし、ボディまで読み取る
    async fn get(&self, destination: &str, path: &str) -> CensusResult<Reply> {
        let _permit = self.limiter.acquire(destination).await?;
        let url = format!("http://{}{}", destination, path);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = match response.bytes().await {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                debug!(path = path, error = %e, "Failed to read response body");
                None
            }
        };

        Ok(Reply { status, body })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, candidate: &CandidateEndpoint) -> ProbeResult {
        self.probe_endpoint(candidate).await
    }
}

/// `{"models": [...]}` 形式のボディを読み取る（失敗時は空）
fn parse_models(body: Option<&[u8]>, label: &str, path: &str) -> Vec<ModelSummary> {
    let Some(body) = body else {
        return Vec::new();
    };
    match serde_json::from_slice::<ModelListResponse>(body) {
        Ok(list) => list.models,
        Err(e) => {
            error!(endpoint = %label, path = path, error = %e, "Failed to parse model list");
            Vec::new()
        }
    }
}

/// URL用の `host:port`（IPv6は角括弧で囲む）
fn destination(address: &str, port: u16) -> String {
    if address.contains(':') && !address.starts_with('[') {
        format!("[{}]:{}", address, port)
    } else {
        format!("{}:{}", address, port)
    }
}
