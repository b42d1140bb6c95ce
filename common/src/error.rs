//! エラー型定義
//!
//! 共通レイヤーのエラー型（thiserror使用）

use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unrecognised endpoint status string
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Persisted identity key is not a hex digest
    #[error("Invalid identity key: {0}")]
    InvalidKey(String),
}
