//! エラー型定義
//!
//! スキャナーの統一エラー型（thiserror使用）
//!
//! 1エンドポイントのプローブ失敗はエラーにならず `ServerStatus` として表現される。
//! ここに現れるのはスキャン全体に影響する失敗のみ。

use std::path::PathBuf;
use thiserror::Error;

use crate::common::CommonError;
use crate::lock::LockError;

/// Scanner error type
#[derive(Debug, Error)]
pub enum CensusError {
    /// Common layer error
    #[error(transparent)]
    Common(#[from] CommonError),

    /// File I/O error
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error (transport failure)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection limiter was shut down
    #[error("Connection limiter closed")]
    LimiterClosed,

    /// Scan lock error
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Logging initialisation error
    #[error("Logging error: {0}")]
    Logging(String),
}

impl CensusError {
    /// I/Oエラーにパスを付与する
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for the scanner
pub type CensusResult<T> = Result<T, CensusError>;
