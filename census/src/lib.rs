//! LLM census
//!
//! Ollama互換エンドポイントの稼働確認と、実行ごとに差分マージされるインベントリの管理

#![warn(missing_docs)]

/// 共通型定義（llm-census-commonの再エクスポート）
pub use llm_census_common as common;

/// 候補フィードの読み込み
pub mod candidates;

/// CLIインターフェース
pub mod cli;

/// 設定管理（設定ファイル・環境変数ヘルパー）
pub mod config;

/// スキャン全体の制御
pub mod coordinator;

/// エラー型
pub mod error;

/// エンドポイントプローブと接続数制限
pub mod health;

/// インベントリのマージと永続化
pub mod inventory;

/// スキャンの排他制御（同一出力ファイル）
pub mod lock;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 並行数制限付きプローブスケジューラー
pub mod scheduler;

pub use coordinator::{ScanCoordinator, ScanReport};
pub use error::{CensusError, CensusResult};
