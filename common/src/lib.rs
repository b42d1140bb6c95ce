//! LLM census 共通ライブラリ
//!
//! スキャナーとインベントリ出力で共有する型・設定・識別子ユーティリティ

#![warn(missing_docs)]

/// 経過時間の表示文字列
pub mod age;

/// スキャン設定
pub mod config;

/// エラー型定義
pub mod error;

mod lenient;

/// 識別キーとアドレスマスク
pub mod identity;

/// コアデータ型
pub mod types;

pub use error::CommonError;
pub use identity::{compute_key, mask_address, IdentityKey};
