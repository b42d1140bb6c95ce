//! Property-based tests using proptest

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use llm_census::common::identity::{compute_key, mask_address, MASK_PLACEHOLDER};
use llm_census::common::types::{
    CandidateEndpoint, InventoryRecord, ModelSummary, ProbeResult, ServerStatus,
};
use llm_census::inventory::merge_record;

fn status_strategy() -> impl Strategy<Value = ServerStatus> {
    prop_oneof![
        Just(ServerStatus::Live),
        Just(ServerStatus::Unreachable),
        (100u16..600).prop_map(ServerStatus::HttpError),
    ]
}

fn result_strategy() -> impl Strategy<Value = ProbeResult> {
    (status_strategy(), "[0-9]\\.[0-9]{1,2}\\.[0-9]", prop::collection::vec("[a-z]{1,8}:[0-9]b", 0..3))
        .prop_map(|(status, version, names)| {
            if status.is_live() {
                ProbeResult {
                    status,
                    version,
                    local_models: names
                        .into_iter()
                        .map(|name| ModelSummary {
                            name: Some(name),
                            ..ModelSummary::default()
                        })
                        .collect(),
                    running_models: Vec::new(),
                }
            } else {
                ProbeResult::offline(status)
            }
        })
}

// ---------------------------------------------------------------------------
// identity
// ---------------------------------------------------------------------------

proptest! {
    /// 同じ入力からは常に同じキー
    #[test]
    fn key_is_deterministic(a in any::<u8>(), b in any::<u8>(), c in any::<u8>(), d in any::<u8>(), port in 1u16..=u16::MAX) {
        let address = format!("{}.{}.{}.{}", a, b, c, d);
        let first = compute_key(&address, port);
        prop_assert_eq!(&first, &compute_key(&address, port));
        prop_assert_eq!(first.as_str().len(), 64);
        prop_assert!(first.as_str().chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    /// ポートが違えばキーも違う
    #[test]
    fn key_depends_on_port(port in 1u16..u16::MAX) {
        prop_assert_ne!(compute_key("10.0.0.1", port), compute_key("10.0.0.1", port + 1));
    }

    /// IPv4は先頭2要素を残して後半をマスク
    #[test]
    fn mask_keeps_first_two_octets(a in any::<u8>(), b in any::<u8>(), c in any::<u8>(), d in any::<u8>()) {
        let masked = mask_address(&format!("{}.{}.{}.{}", a, b, c, d));
        prop_assert_eq!(masked, format!("{}.{}.{}.{}", a, b, MASK_PLACEHOLDER, MASK_PLACEHOLDER));
    }

    /// IPv4以外はそのまま
    #[test]
    fn mask_leaves_other_forms(host in "[a-z]{1,10}(\\.[a-z]{2,5})?") {
        prop_assert_eq!(mask_address(&host), host);
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

proptest! {
    /// 同じ入力で2回マージしても同じ結果
    #[test]
    fn merge_is_idempotent(result in result_strategy(), offset in 0i64..10_000_000) {
        let candidate = CandidateEndpoint::new("172.16.5.9", 11434);
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(offset);
        let prior = Some(InventoryRecord::new("172.16.XXX.XXX", 11434));

        let once = merge_record(prior.clone(), &candidate, &result, now);
        let twice = merge_record(prior, &candidate, &result, now);
        prop_assert_eq!(&once, &twice);

        let again = merge_record(Some(once.clone()), &candidate, &result, now);
        prop_assert_eq!(again, once);
    }

    /// 一度設定された first_seen_online は変わらない
    #[test]
    fn first_seen_never_changes_once_set(
        results in prop::collection::vec(result_strategy(), 1..12),
        steps in prop::collection::vec(1i64..100_000, 12),
    ) {
        let candidate = CandidateEndpoint::new("198.18.0.1", 8080);
        let mut now = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut record: Option<InventoryRecord> = None;
        let mut first_seen: Option<String> = None;

        for (result, step) in results.iter().zip(steps) {
            now += Duration::seconds(step);
            let merged = merge_record(record.take(), &candidate, result, now);
            match first_seen.clone() {
                Some(seen) => prop_assert_eq!(merged.first_seen_online.clone(), Some(seen)),
                None => first_seen = merged.first_seen_online.clone(),
            }
            prop_assert_eq!(merged.first_seen_online.is_some(), first_seen.is_some());
            record = Some(merged);
        }
    }

    /// オフラインのマージはバージョンとモデル一覧を消さない
    #[test]
    fn offline_merge_preserves_enrichment(status in status_strategy(), version in "[0-9]\\.[0-9]\\.[0-9]") {
        prop_assume!(!status.is_live());
        let candidate = CandidateEndpoint::new("100.64.1.2", 11434);
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();

        let live = ProbeResult {
            status: ServerStatus::Live,
            version: version.clone(),
            local_models: vec![ModelSummary { name: Some("phi3:mini".to_string()), ..ModelSummary::default() }],
            running_models: Vec::new(),
        };
        let before = merge_record(None, &candidate, &live, t0);
        let after = merge_record(
            Some(before.clone()),
            &candidate,
            &ProbeResult::offline(status),
            t0 + Duration::seconds(90),
        );

        prop_assert_eq!(after.status, status);
        prop_assert_eq!(&after.version, &version);
        prop_assert_eq!(&after.local_models, &before.local_models);
        prop_assert_eq!(&after.first_seen_online, &before.first_seen_online);
        prop_assert_eq!(after.age.as_str(), "1 minute");
    }
}
