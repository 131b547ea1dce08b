//! Site state controller
//!
//! Builds the live [`SiteData`] from three layers (built-in defaults, the
//! local snapshot, the remote snapshot) and is the single writer afterwards.
//! Every change after the initial load is scheduled onto the debounced
//! snapshot writer and announced on the event bus.

use crate::error::{Error, Result};
use crate::remote::StoreClient;
use chrono::Utc;
use serde_json::Value;
use stagefront_common::events::{EventBus, SiteEvent};
use stagefront_common::merge::merge_site_data;
use stagefront_common::snapshot::{SnapshotStore, SnapshotWriter};
use stagefront_common::model::{Track, TrackId};
use stagefront_common::SiteData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Merge a raw local snapshot over the defaults
///
/// A missing, unparseable or ill-typed snapshot yields the defaults unchanged.
pub fn initial_state(snapshot: Option<&str>) -> SiteData {
    let defaults = SiteData::default();
    let Some(raw) = snapshot else {
        debug!("No local snapshot, starting from defaults");
        return defaults;
    };

    let overlay: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Local snapshot is not valid JSON, using defaults: {}", e);
            return defaults;
        }
    };

    match merge_site_data(&defaults, &overlay) {
        Ok(merged) => merged,
        Err(e) => {
            warn!("Local snapshot could not be merged, using defaults: {}", e);
            defaults
        }
    }
}

fn log_issues(data: &SiteData) {
    for issue in data.validate() {
        warn!("Site data issue: {}", issue);
    }
}

pub struct SiteStateController {
    data: SiteData,
    writer: SnapshotWriter,
    bus: Arc<EventBus>,
}

impl SiteStateController {
    /// Load defaults plus the local snapshot stored under `key`
    ///
    /// Must be called inside a tokio runtime (spawns the snapshot writer).
    pub fn load(
        store: Arc<dyn SnapshotStore>,
        key: &str,
        debounce: Duration,
        bus: Arc<EventBus>,
    ) -> Self {
        let raw = match store.load(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read local snapshot {}: {}", key, e);
                None
            }
        };

        let data = initial_state(raw.as_deref());
        log_issues(&data);
        info!(
            "Site data loaded: {} tracks, {} articles, {} artists, {} resources",
            data.tracks.len(),
            data.articles.len(),
            data.artists.len(),
            data.resources.len()
        );

        Self {
            data,
            writer: SnapshotWriter::spawn(store, key, debounce),
            bus,
        }
    }

    pub fn data(&self) -> &SiteData {
        &self.data
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Copy of the track with `id`
    pub fn track(&self, id: TrackId) -> Result<Track> {
        self.data
            .find_track(id)
            .cloned()
            .ok_or(Error::TrackNotFound(id))
    }

    /// Mutate the live data; the result is persisted and announced
    pub fn update<R>(&mut self, source: &str, f: impl FnOnce(&mut SiteData) -> R) -> R {
        let result = f(&mut self.data);
        self.committed(source);
        result
    }

    /// Replace the live data wholesale
    pub fn replace(&mut self, source: &str, data: SiteData) {
        self.data = data;
        self.committed(source);
    }

    /// Merge a remote snapshot over the current data
    ///
    /// `null` leaves the data untouched. On error nothing changes.
    pub fn apply_remote(&mut self, overlay: &Value) -> Result<()> {
        if overlay.is_null() {
            return Ok(());
        }
        let merged = merge_site_data(&self.data, overlay)?;
        log_issues(&merged);
        if merged != self.data {
            self.replace("remote", merged);
        } else {
            debug!("Remote snapshot matches local data");
        }
        Ok(())
    }

    /// Fetch the remote snapshot once and merge it
    ///
    /// Failures are logged and broadcast; local data is kept. Returns whether
    /// a remote snapshot was applied.
    pub async fn sync_from_remote(&mut self, client: &StoreClient) -> bool {
        let outcome = match client.fetch().await {
            Ok(Some(remote)) => self.apply_remote(&remote).map(|_| true),
            Ok(None) => {
                info!("Remote store is empty; keeping local data");
                Ok(false)
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(applied) => applied,
            Err(e) => {
                warn!("Remote sync from {} failed, keeping local data: {}", client.endpoint(), e);
                self.bus.emit(SiteEvent::RemoteSyncFailed {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                false
            }
        }
    }

    fn committed(&mut self, source: &str) {
        match serde_json::to_string(&self.data) {
            Ok(payload) => self.writer.schedule(payload),
            Err(e) => warn!("Failed to serialize site data snapshot: {}", e),
        }
        self.bus.emit(SiteEvent::SiteDataChanged {
            source: source.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Write any pending snapshot now
    pub async fn flush(&self) {
        self.writer.flush().await;
    }

    /// Flush and stop the snapshot writer
    pub async fn shutdown(self) -> SiteData {
        self.writer.close().await;
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_without_snapshot_is_defaults() {
        assert_eq!(initial_state(None), SiteData::default());
    }

    #[test]
    fn test_corrupt_snapshot_falls_back_to_defaults() {
        assert_eq!(initial_state(Some("{not json")), SiteData::default());
        assert_eq!(initial_state(Some("")), SiteData::default());
    }

    #[test]
    fn test_ill_typed_snapshot_falls_back_to_defaults() {
        assert_eq!(
            initial_state(Some(r#"{"tracks": "not a list"}"#)),
            SiteData::default()
        );
    }

    #[test]
    fn test_snapshot_fields_override_defaults() {
        let data = initial_state(Some(r#"{"hero": {"title": "Local Title"}}"#));
        let defaults = SiteData::default();

        assert_eq!(data.hero.title, "Local Title");
        assert_eq!(data.hero.subtitle, defaults.hero.subtitle);
        assert_eq!(data.tracks, defaults.tracks);
    }
}
