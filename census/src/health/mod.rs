//! エンドポイントプローブ
//!
//! 候補エンドポイントにHTTPで稼働確認を行い、正規化した結果を返す。
//!
//! - `GET /api/ps` の応答のみで稼働状態を判定（ロード中モデルも同じ応答から取得）
//! - オンラインの場合のみ `GET /api/version` と `GET /api/tags` を並行で取得

pub mod limiter;
pub mod probe;

use async_trait::async_trait;

use crate::common::types::{CandidateEndpoint, ProbeResult};

pub use limiter::ConnectionLimiter;
pub use probe::HttpProbe;

/// 1候補をプローブする処理
///
/// スケジューラーはこのトレイト越しにプローブを呼び出す。
/// 実装は失敗をエラーではなく `ProbeResult::status` で表現する。
#[async_trait]
pub trait Probe: Send + Sync {
    /// 候補エンドポイントをプローブする
    async fn probe(&self, candidate: &CandidateEndpoint) -> ProbeResult;
}
