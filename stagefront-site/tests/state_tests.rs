//! Integration tests for layered site state and snapshot persistence

use serde_json::{json, Value};
use stagefront_common::events::{EventBus, SiteEvent};
use stagefront_common::model::Track;
use stagefront_common::snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
use stagefront_common::SiteData;
use stagefront_site::admin::mutations;
use stagefront_site::{Error, SiteStateController};
use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "stagefront_site_data";

fn track(id: u64, title: &str) -> Track {
    Track {
        id,
        title: title.to_string(),
        audio_url: Some(format!("https://cdn.example.com/{}.mp3", id)),
        ..Default::default()
    }
}

fn controller(store: Arc<dyn SnapshotStore>) -> SiteStateController {
    SiteStateController::load(store, KEY, Duration::from_millis(50), Arc::new(EventBus::default()))
}

#[tokio::test]
async fn test_corrupt_snapshot_yields_exact_defaults() {
    let store = Arc::new(MemorySnapshotStore::with_entry(KEY, "{\"hero\": {\"title\": "));
    let controller = controller(store);

    assert_eq!(controller.data(), &SiteData::default());
}

#[tokio::test]
async fn test_partial_snapshot_keeps_default_fields() {
    let snapshot = json!({
        "hero": {"title": "Snapshot Title"},
        "contact": {"email": "band@example.com"}
    });
    let store = Arc::new(MemorySnapshotStore::with_entry(KEY, &snapshot.to_string()));
    let controller = controller(store);
    let defaults = SiteData::default();

    let data = controller.data();
    assert_eq!(data.hero.title, "Snapshot Title");
    assert_eq!(data.hero.description, defaults.hero.description);
    assert_eq!(data.contact.email, "band@example.com");
    assert_eq!(data.contact.phone, defaults.contact.phone);
    assert_eq!(data.tracks, defaults.tracks);
    assert_eq!(data.navigation, defaults.navigation);
}

#[tokio::test]
async fn test_remote_without_tracks_keeps_local_tracks() {
    let local = SiteData {
        tracks: vec![track(1, "A"), track(2, "B")],
        ..Default::default()
    };
    let store = Arc::new(MemorySnapshotStore::with_entry(
        KEY,
        &serde_json::to_string(&local).unwrap(),
    ));
    let mut controller = controller(store);

    controller
        .apply_remote(&json!({"hero": {"title": "Remote Title"}}))
        .unwrap();

    let titles: Vec<&str> = controller.data().tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B"]);
    assert_eq!(controller.data().hero.title, "Remote Title");
}

#[tokio::test]
async fn test_remote_tracks_replace_whole_list() {
    let local = SiteData {
        tracks: vec![track(1, "A"), track(2, "B")],
        ..Default::default()
    };
    let store = Arc::new(MemorySnapshotStore::with_entry(
        KEY,
        &serde_json::to_string(&local).unwrap(),
    ));
    let mut controller = controller(store);

    controller
        .apply_remote(&json!({"tracks": [{"id": 9, "title": "Only"}]}))
        .unwrap();

    assert_eq!(controller.data().tracks.len(), 1);
    assert_eq!(controller.data().tracks[0].id, 9);
}

#[tokio::test]
async fn test_rejected_remote_leaves_data_untouched() {
    let mut controller = controller(Arc::new(MemorySnapshotStore::new()));
    let before = controller.data().clone();

    assert!(controller.apply_remote(&json!(["not", "an", "object"])).is_err());
    assert!(controller.apply_remote(&Value::Null).is_ok());

    assert_eq!(controller.data(), &before);
}

#[tokio::test]
async fn test_admin_edit_is_persisted_and_announced() {
    let store = Arc::new(MemorySnapshotStore::new());
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let mut controller = SiteStateController::load(
        store.clone() as Arc<dyn SnapshotStore>,
        KEY,
        Duration::from_millis(50),
        Arc::clone(&bus),
    );

    let id = controller.update("admin", |data| mutations::upsert_track(data, track(0, "New Song")));
    controller.flush().await;

    let saved: SiteData = serde_json::from_str(&store.load(KEY).unwrap().unwrap()).unwrap();
    assert!(saved.tracks.iter().any(|t| t.id == id && t.title == "New Song"));
    assert!(matches!(
        rx.try_recv(),
        Ok(SiteEvent::SiteDataChanged { ref source, .. }) if source == "admin"
    ));
}

#[tokio::test]
async fn test_track_lookup_by_id() {
    let local = SiteData {
        tracks: vec![track(1, "A"), track(2, "B")],
        ..Default::default()
    };
    let store = Arc::new(MemorySnapshotStore::with_entry(
        KEY,
        &serde_json::to_string(&local).unwrap(),
    ));
    let controller = controller(store);

    assert_eq!(controller.track(2).unwrap().title, "B");
    assert!(matches!(controller.track(99), Err(Error::TrackNotFound(99))));
}

#[tokio::test]
async fn test_initial_load_does_not_write() {
    let store = Arc::new(MemorySnapshotStore::new());
    let controller = controller(store.clone());

    controller.flush().await;

    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_shutdown_flushes_pending_edit_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FileSnapshotStore::new(dir.path()));
    let mut controller = SiteStateController::load(
        store.clone(),
        KEY,
        Duration::from_secs(3600),
        Arc::new(EventBus::default()),
    );

    controller.update("admin", |data| data.hero.title = "Saved On Exit".to_string());
    controller.shutdown().await;

    let reloaded = SiteStateController::load(
        store,
        KEY,
        Duration::from_millis(50),
        Arc::new(EventBus::default()),
    );
    assert_eq!(reloaded.data().hero.title, "Saved On Exit");
}
