//! End-to-end scans against mock Ollama servers

use std::sync::Arc;

use llm_census::candidates::JsonFileSource;
use llm_census::common::identity::compute_key;
use llm_census::common::types::ServerStatus;
use llm_census::health::HttpProbe;
use llm_census::inventory::persist::read_inventory;
use llm_census::lock::lock_path;
use llm_census::ScanCoordinator;
use tokio_util::sync::CancellationToken;

use crate::support::ollama::{spawn_mock_ollama, spawn_status_server};
use crate::support::{closed_port, test_config, write_feed};

#[tokio::test]
async fn scan_classifies_live_error_and_unreachable_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let live = spawn_mock_ollama("0.5.7").await;
    let broken = spawn_status_server(500).await;
    let dead = closed_port();
    let live_port = live.address().port();
    let broken_port = broken.address().port();
    write_feed(&config.input_path, &[live_port, broken_port, dead]);

    let coordinator = ScanCoordinator::from_config(config.clone()).unwrap();
    let report = coordinator.run_once(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(report.live, 1);
    assert_eq!(report.http_error, 1);
    assert_eq!(report.unreachable, 1);
    assert!(!report.cancelled);

    let inventory = read_inventory(&config.output_path).await.unwrap();
    assert_eq!(inventory.len(), 3);

    let record = &inventory[&compute_key("127.0.0.1", live_port)];
    assert_eq!(record.address, "127.0.XXX.XXX");
    assert_eq!(record.status, ServerStatus::Live);
    assert_eq!(record.version, "0.5.7");
    assert_eq!(record.local_models.len(), 2);
    assert_eq!(record.running_models.len(), 1);
    assert_eq!(record.geo.city, Some(serde_json::json!("Testville")));
    assert!(record.first_seen_online.is_some());
    assert_eq!(record.age, "0 seconds");

    let record = &inventory[&compute_key("127.0.0.1", broken_port)];
    assert_eq!(record.status, ServerStatus::HttpError(500));
    assert_eq!(record.version, "unknown");
    assert_eq!(record.first_seen_online, None);
    assert_eq!(record.age, "N/A");

    let record = &inventory[&compute_key("127.0.0.1", dead)];
    assert_eq!(record.status, ServerStatus::Unreachable);
    assert!(record.last_observed.is_some());
}

#[tokio::test]
async fn rescan_after_outage_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let live = spawn_mock_ollama("0.4.0").await;
    let port = live.address().port();
    write_feed(&config.input_path, &[port]);

    let coordinator = ScanCoordinator::from_config(config.clone()).unwrap();
    coordinator.run_once(&CancellationToken::new()).await.unwrap();
    let key = compute_key("127.0.0.1", port);
    let first = read_inventory(&config.output_path).await.unwrap()[&key].clone();

    drop(live);

    let report = coordinator.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.unreachable, 1);

    let second = read_inventory(&config.output_path).await.unwrap()[&key].clone();
    assert_eq!(second.status, ServerStatus::Unreachable);
    assert_eq!(second.version, "0.4.0");
    assert_eq!(second.local_models, first.local_models);
    assert_eq!(second.first_seen_online, first.first_seen_online);
    assert_ne!(second.last_observed, first.last_observed);
}

#[tokio::test]
async fn records_outside_the_feed_are_kept() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let a = spawn_mock_ollama("0.3.0").await;
    let b = spawn_mock_ollama("0.3.1").await;
    let a_port = a.address().port();
    let b_port = b.address().port();

    write_feed(&config.input_path, &[a_port]);
    let coordinator = ScanCoordinator::from_config(config.clone()).unwrap();
    coordinator.run_once(&CancellationToken::new()).await.unwrap();

    write_feed(&config.input_path, &[b_port]);
    let report = coordinator.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.records, 2);

    let inventory = read_inventory(&config.output_path).await.unwrap();
    assert_eq!(inventory[&compute_key("127.0.0.1", a_port)].version, "0.3.0");
    assert_eq!(inventory[&compute_key("127.0.0.1", b_port)].version, "0.3.1");
}

#[tokio::test]
async fn cancelled_scan_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let live = spawn_mock_ollama("0.5.0").await;
    write_feed(&config.input_path, &[live.address().port()]);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let coordinator = ScanCoordinator::from_config(config.clone()).unwrap();
    let report = coordinator.run_once(&cancel).await.unwrap();

    assert!(report.cancelled);
    assert!(!config.output_path.exists());
}

#[tokio::test]
async fn run_holds_and_releases_the_output_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let live = spawn_mock_ollama("0.5.0").await;
    write_feed(&config.input_path, &[live.address().port()]);

    let probe = Arc::new(HttpProbe::new(&config).unwrap());
    let source = JsonFileSource::new(&config.input_path, config.default_port);
    let coordinator = ScanCoordinator::new(config.clone(), probe, source);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();
    assert_eq!(report.live, 1);
    assert!(config.output_path.exists());
    assert!(!lock_path(&config.output_path).exists());
}
