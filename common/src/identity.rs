//! 識別キーとアドレスマスク
//!
//! `address:port` から安定した識別キーを導出し、
//! 永続化・表示用にIPv4アドレスの下位2オクテットを伏せる。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// マスク後のオクテットに使うプレースホルダー
pub const MASK_PLACEHOLDER: &str = "XXX";

/// 識別キーの文字数（SHA-256の16進表記）
const KEY_HEX_LEN: usize = 64;

/// エンドポイントの識別キー
///
/// `address:port` のSHA-256ダイジェスト（小文字16進64文字）。
/// インベントリの唯一の検索・マージキーとして使う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// 16進文字列として参照する
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for IdentityKey {
    type Err = CommonError;

    /// 永続化済みのキー文字列を検証して読み込む
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == KEY_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(CommonError::InvalidKey(s.to_string()))
        }
    }
}

/// `address:port` から識別キーを計算する
///
/// 同じ入力は実行やプロセスをまたいで常に同じキーになる。
pub fn compute_key(address: &str, port: u16) -> IdentityKey {
    let digest = Sha256::digest(format!("{}:{}", address, port).as_bytes());
    IdentityKey(format!("{:x}", digest))
}

/// IPv4アドレスの3・4番目のオクテットを伏せる
///
/// 4つの数値成分からなるドット区切り表記のみ対象とし、
/// それ以外（IPv6、ホスト名、マスク済み文字列）はそのまま返す。
pub fn mask_address(address: &str) -> String {
    let parts: Vec<&str> = address.split('.').collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));

    if parts.len() == 4 && numeric {
        format!(
            "{}.{}.{}.{}",
            parts[0], parts[1], MASK_PLACEHOLDER, MASK_PLACEHOLDER
        )
    } else {
        address.to_string()
    }
}
