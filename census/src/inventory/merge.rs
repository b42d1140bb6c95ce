//! レコードマージ
//!
//! 今回のプローブ結果を既存レコードに反映する。
//!
//! - ポート・位置情報・マスク済みアドレス・最終観測時刻は毎回上書き
//! - オンライン時のみバージョン・モデル一覧を更新し、初回は `first_seen_online` を設定
//! - オフライン時は状態のみ更新し、過去に取得した情報は残す
//! - `age` は `first_seen_online` から毎回再計算

use chrono::{DateTime, Utc};
use tracing::error;

use crate::common::age::{
    format_age, format_timestamp, parse_timestamp, AGE_NOT_AVAILABLE, AGE_UNKNOWN,
};
use crate::common::identity::mask_address;
use crate::common::types::{CandidateEndpoint, InventoryRecord, ProbeResult};

/// プローブ結果を既存レコード（なければ空レコード）にマージする
///
/// 同じ入力に対しては常に同じレコードを返す。
pub fn merge_record(
    prior: Option<InventoryRecord>,
    candidate: &CandidateEndpoint,
    probe: &ProbeResult,
    now: DateTime<Utc>,
) -> InventoryRecord {
    let masked = mask_address(&candidate.address);
    let mut record = prior.unwrap_or_else(|| InventoryRecord::new(masked.clone(), candidate.port));

    record.port = candidate.port;
    record.geo = candidate.geo.clone();
    record.address = masked;

    let stamp = format_timestamp(now);
    record.last_observed = Some(stamp.clone());
    record.last_updated = Some(stamp.clone());
    record.status = probe.status;

    if probe.status.is_live() {
        record.version = probe.version.clone();
        record.local_models = probe.local_models.clone();
        record.running_models = probe.running_models.clone();
        if !record.has_been_online() {
            record.first_seen_online = Some(stamp);
        }
    }

    record.age = compute_age(&record, now);
    record
}

/// `first_seen_online` からの経過時間
///
/// 未設定なら "N/A"、解釈できなければ "unknown"（元の値は変更しない）。
pub fn compute_age(record: &InventoryRecord, now: DateTime<Utc>) -> String {
    let Some(first_seen) = record.first_seen_online.as_deref().filter(|v| !v.is_empty()) else {
        return AGE_NOT_AVAILABLE.to_string();
    };

    match parse_timestamp(first_seen) {
        Ok(at) => format_age(now - at),
        Err(e) => {
            error!(
                endpoint = %format!("{}:{}", record.address, record.port),
                value = %first_seen,
                error = %e,
                "Failed to parse first_seen_online"
            );
            AGE_UNKNOWN.to_string()
        }
    }
}
