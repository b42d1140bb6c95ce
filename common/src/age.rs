//! 経過時間の表示文字列
//!
//! `first_seen_online` からの経過時間を「3 hours」のような文字列にする。

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// 一度もオンラインを確認していないエンドポイントの `age`
pub const AGE_NOT_AVAILABLE: &str = "N/A";

/// `first_seen_online` が解釈できない場合の `age`
pub const AGE_UNKNOWN: &str = "unknown";

/// 経過時間を最大単位のみで表す（切り捨て）
///
/// 60秒未満は秒、60分未満は分、24時間未満は時間、7日未満は日、それ以上は週。
/// 負の値（時計の巻き戻り）は0秒として扱う。
pub fn format_age(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        return plural(seconds, "second");
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return plural(minutes, "minute");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return plural(hours, "hour");
    }
    let days = hours / 24;
    if days < 7 {
        return plural(days, "day");
    }
    plural(days / 7, "week")
}

fn plural(value: i64, unit: &str) -> String {
    if value == 1 {
        format!("{} {}", value, unit)
    } else {
        format!("{} {}s", value, unit)
    }
}

/// 永続化されたタイムスタンプを読み込む
///
/// RFC 3339 を優先し、タイムゾーンのない旧形式はUTCとみなす。
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

/// 永続化用のタイムスタンプ文字列
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
