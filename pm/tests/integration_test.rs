//! Integration tests for poimap
//!
//! These tests drive the sync engine end to end from a recorded event log
//! and data sets on disk, the same way `pm replay` does.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use poimap::events::{EventBus, SyncEvent};
use poimap::registry::OverlayKeying;
use poimap::render::MapModel;
use poimap::sync::{SyncConfig, SyncEngine, SyncError, SyncReport};
use poimap::transport::{DirectoryTransport, FeedError, jsonl_feed, open_jsonl_feed};
use poimap::{BackendChangeEvent, BackendId};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

fn event(event_type: &str, id: &str, name: &str) -> String {
    json!({
        "eventType": event_type,
        "backendInfo": {"id": id, "displayName": name}
    })
    .to_string()
}

fn write_log(dir: &Path, lines: &[String]) -> std::path::PathBuf {
    let path = dir.join("events.jsonl");
    std::fs::write(&path, lines.join("\n")).expect("Failed to write event log");
    path
}

fn write_data(dir: &Path, id: &str, points: serde_json::Value) {
    let data_dir = dir.join("data");
    std::fs::create_dir_all(&data_dir).expect("Failed to create data dir");
    std::fs::write(data_dir.join(format!("{}.json", id)), points.to_string()).expect("Failed to write data set");
}

fn poi(name: &str, lat: f64, lon: f64) -> serde_json::Value {
    json!({"name": name, "description": format!("{} venue", name), "coordinates": [lat, lon]})
}

async fn replay(dir: &Path, config: SyncConfig) -> Result<SyncReport<MapModel>, SyncError> {
    let bus = EventBus::with_default_capacity();
    let feed = open_jsonl_feed(dir.join("events.jsonl"))
        .await
        .expect("Failed to open event log");
    let transport = Arc::new(DirectoryTransport::new(dir.join("data")));
    let engine = SyncEngine::new(config, MapModel::new(), transport, &bus);

    tokio::time::timeout(Duration::from_secs(10), engine.run(feed))
        .await
        .expect("Engine did not finish")
}

// =============================================================================
// Replay Tests
// =============================================================================

#[tokio::test]
async fn test_replay_builds_one_layer_per_live_backend() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(
        temp_dir.path(),
        "summit-backend",
        json!([poi("Boston", 42.36, -71.05), poi("Raleigh", 35.78, -78.64)]),
    );
    write_data(temp_dir.path(), "devnation-backend", json!([poi("Berlin", 52.52, 13.40)]));
    write_data(temp_dir.path(), "gone-backend", json!([poi("Nowhere", 0.0, 0.0)]));
    write_log(
        temp_dir.path(),
        &[
            event("REGISTERED", "summit-backend", "Red Hat Summit"),
            event("REGISTERED", "devnation-backend", "DevNation"),
            event("REGISTERED", "gone-backend", "Gone"),
            event("UNREGISTERED", "gone-backend", "Gone"),
        ],
    );

    let report = replay(temp_dir.path(), SyncConfig::default()).await.unwrap();

    assert_eq!(
        report.snapshot.overlay_keys(),
        vec!["DevNation".to_string(), "Red Hat Summit".to_string()]
    );
    assert_eq!(report.snapshot.backends.len(), 2);
    assert!(report.snapshot.registration(&BackendId::from("gone-backend")).is_none());

    let view = report.renderer.view();
    assert_eq!(view.layers.len(), 2);
    let markers: usize = view.layers.iter().map(|l| l.markers.len()).sum();
    assert_eq!(markers, 3);
    assert_eq!(report.metrics.in_flight_fetches, 0);
    assert_eq!(report.metrics.displayed_overlays, 2);
}

#[tokio::test]
async fn test_replay_reregistration_keeps_latest_name() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(temp_dir.path(), "1", json!([poi("Boston", 42.36, -71.05)]));
    write_log(
        temp_dir.path(),
        &[event("REGISTERED", "1", "Old Name"), event("REGISTERED", "1", "New Name")],
    );

    let report = replay(temp_dir.path(), SyncConfig::default()).await.unwrap();

    assert_eq!(report.snapshot.overlay_keys(), vec!["New Name".to_string()]);
    assert_eq!(report.snapshot.backends[0].generation, 2);
    assert_eq!(report.renderer.view().layers.len(), 1);
}

#[tokio::test]
async fn test_replay_missing_data_set_leaves_backend_without_overlay() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
    write_log(temp_dir.path(), &[event("REGISTERED", "1", "A")]);

    let report = replay(temp_dir.path(), SyncConfig::default()).await.unwrap();

    assert_eq!(report.snapshot.backend_ids(), vec![BackendId::from("1")]);
    assert!(report.snapshot.overlays.is_empty());
    assert_eq!(report.metrics.fetches_failed, 1);
}

#[tokio::test]
async fn test_replay_shared_name_keyed_by_backend_id() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(temp_dir.path(), "1", json!([poi("a", 1.0, 1.0)]));
    write_data(temp_dir.path(), "2", json!([poi("b", 2.0, 2.0)]));
    write_log(
        temp_dir.path(),
        &[event("REGISTERED", "1", "Same"), event("REGISTERED", "2", "Same")],
    );

    let config = SyncConfig {
        overlay_key: OverlayKeying::BackendId,
        ..Default::default()
    };
    let report = replay(temp_dir.path(), config).await.unwrap();

    assert_eq!(report.snapshot.overlay_keys(), vec!["1".to_string(), "2".to_string()]);
    assert_eq!(report.renderer.view().layers.len(), 2);
}

#[tokio::test]
async fn test_replay_shared_name_keyed_by_display_name() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(temp_dir.path(), "1", json!([poi("a", 1.0, 1.0)]));
    write_data(temp_dir.path(), "2", json!([poi("b", 2.0, 2.0)]));
    write_log(
        temp_dir.path(),
        &[event("REGISTERED", "1", "Same"), event("REGISTERED", "2", "Same")],
    );

    let report = replay(temp_dir.path(), SyncConfig::default()).await.unwrap();

    // One slot, and the map shows exactly what the slot holds
    assert_eq!(report.snapshot.overlay_keys(), vec!["Same".to_string()]);
    assert_eq!(report.renderer.view().layers.len(), 1);
    assert_eq!(report.snapshot.backends.len(), 2);
}

#[tokio::test]
async fn test_replay_unrecognized_event_is_protocol_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
    write_log(
        temp_dir.path(),
        &[event("REGISTERED", "1", "A"), event("SUSPENDED", "1", "A")],
    );

    match replay(temp_dir.path(), SyncConfig::default()).await {
        Err(e) => {
            assert!(e.is_protocol());
            assert!(e.to_string().contains("SUSPENDED"));
        }
        Ok(_) => panic!("Expected protocol error"),
    }
}

#[tokio::test]
async fn test_replay_malformed_line_is_feed_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
    write_log(
        temp_dir.path(),
        &[event("REGISTERED", "1", "A"), "{\"eventType\":".to_string()],
    );

    match replay(temp_dir.path(), SyncConfig::default()).await {
        Err(SyncError::Feed(FeedError::DecodeLine { line, .. })) => assert_eq!(line, 2),
        Err(e) => panic!("Expected decode error, got {}", e),
        Ok(_) => panic!("Expected decode error"),
    }
}

// =============================================================================
// Diagnostics Tests
// =============================================================================

#[tokio::test]
async fn test_diagnostics_cover_fetch_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(temp_dir.path(), "1", json!([poi("a", 1.0, 1.0)]));

    let bus = EventBus::with_default_capacity();
    let mut rx = bus.subscribe();
    let log = format!("{}\n", event("REGISTERED", "1", "A"));
    let feed = jsonl_feed(std::io::Cursor::new(log.into_bytes()));
    let transport = Arc::new(DirectoryTransport::new(temp_dir.path().join("data")));
    let engine = SyncEngine::new(SyncConfig::default(), MapModel::new(), transport, &bus);

    let report = engine.run(feed).await.unwrap();
    assert_eq!(report.metrics.overlays_added, 1);

    let mut types = Vec::new();
    while let Ok(event) = rx.try_recv() {
        types.push(event.event_type());
    }
    for expected in ["EventReceived", "FetchStarted", "FeedEnded", "FetchCompleted", "OverlayAdded"] {
        assert!(types.contains(&expected), "missing {} in {:?}", expected, types);
    }
}

#[tokio::test]
async fn test_handle_reports_live_state() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_data(temp_dir.path(), "1", json!([poi("a", 1.0, 1.0)]));

    let bus = EventBus::with_default_capacity();
    let mut rx = bus.subscribe();
    let transport = Arc::new(DirectoryTransport::new(temp_dir.path().join("data")));
    let engine = SyncEngine::new(SyncConfig::default(), MapModel::new(), transport, &bus);
    let handle = engine.handle();

    let (feed_tx, feed_rx) = futures::channel::mpsc::unbounded::<Result<BackendChangeEvent, FeedError>>();
    let task = tokio::spawn(engine.run(feed_rx));

    let registered: BackendChangeEvent =
        serde_json::from_str(&event("REGISTERED", "1", "A")).expect("Failed to decode event");
    feed_tx.unbounded_send(Ok(registered)).unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let SyncEvent::OverlayAdded { .. } = rx.recv().await.unwrap() {
                break;
            }
        }
    })
    .await
    .expect("Overlay was never added");

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.overlay_keys(), vec!["A".to_string()]);
    let metrics = handle.metrics().await.unwrap();
    assert_eq!(metrics.live_backends, 1);

    handle.shutdown().await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), task).await;
    assert!(result.is_ok(), "Engine should shut down gracefully");
}
