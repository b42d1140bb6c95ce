//! Prior inventories stored in the legacy list shape

use llm_census::common::identity::compute_key;
use llm_census::common::types::ServerStatus;
use llm_census::inventory::persist::{load_inventory, save_inventory};
use llm_census::ScanCoordinator;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::support::ollama::spawn_mock_ollama;
use crate::support::{test_config, write_feed};

#[tokio::test]
async fn legacy_list_roundtrips_under_derived_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live_servers.json");
    let legacy = json!([
        {
            "ip": "192.0.2.10", "port": 11434, "status": "live", "version": "0.1.32",
            "local": [{"name": "mistral:7b", "size": 4100000000u64}], "running": [],
            "city": "Lisbon", "country": "PT", "latitude": 38.72, "longitude": "-9.14",
            "first_seen_online": "2024-02-01T08:00:00+00:00",
            "last_observed": "2024-02-02T08:00:00+00:00",
            "age": "1 day", "notes": "kept"
        },
        {"ip": "192.0.2.11", "port": "8080", "status": "unreachable"}
    ]);
    std::fs::write(&path, legacy.to_string()).unwrap();

    let loaded = load_inventory(&path).await;
    assert_eq!(loaded.len(), 2);

    save_inventory(&path, &loaded).await.unwrap();
    let reloaded = load_inventory(&path).await;
    assert_eq!(reloaded, loaded);

    let record = &reloaded[&compute_key("192.0.2.10", 11434)];
    assert_eq!(record.address, "192.0.XXX.XXX");
    assert_eq!(record.version, "0.1.32");
    assert_eq!(record.local_models[0].name.as_deref(), Some("mistral:7b"));
    assert_eq!(record.geo.country, Some(json!("PT")));
    assert_eq!(record.geo.latitude, Some(json!(38.72)));
    assert_eq!(record.geo.longitude, Some(json!("-9.14")));
    assert_eq!(record.extra.get("notes"), Some(&json!("kept")));

    let record = &reloaded[&compute_key("192.0.2.11", 8080)];
    assert_eq!(record.port, 8080);
    assert_eq!(record.status, ServerStatus::Unreachable);
}

#[tokio::test]
async fn scan_over_legacy_inventory_keeps_first_seen() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let live = spawn_mock_ollama("0.6.0").await;
    let port = live.address().port();

    std::fs::create_dir_all(config.output_path.parent().unwrap()).unwrap();
    let legacy = json!([{
        "ip": "127.0.0.1", "port": port, "status": "unreachable", "version": "0.2.0",
        "first_seen_online": "2024-01-01T00:00:00+00:00"
    }]);
    std::fs::write(&config.output_path, legacy.to_string()).unwrap();
    write_feed(&config.input_path, &[port]);

    let coordinator = ScanCoordinator::from_config(config.clone()).unwrap();
    let report = coordinator.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.records, 1);

    let inventory = load_inventory(&config.output_path).await;
    let record = &inventory[&compute_key("127.0.0.1", port)];
    assert_eq!(record.status, ServerStatus::Live);
    assert_eq!(record.version, "0.6.0");
    assert_eq!(
        record.first_seen_online.as_deref(),
        Some("2024-01-01T00:00:00+00:00")
    );
    assert!(record.age.ends_with("weeks"), "age was {}", record.age);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&config.output_path).unwrap()).unwrap();
    assert!(raw.is_object());
}
