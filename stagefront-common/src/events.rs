//! Event types for the Stagefront event system
//!
//! Provides the shared event definitions and the EventBus used by the site
//! state controller and the audio session manager.

use crate::model::TrackId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle phase of the current audio session
///
/// `Idle → Loading → Playing ⇄ Paused → Ended`. A track switch tears the
/// session down and starts over at `Loading`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Loading => write!(f, "loading"),
            SessionPhase::Playing => write!(f, "playing"),
            SessionPhase::Paused => write!(f, "paused"),
            SessionPhase::Ended => write!(f, "ended"),
        }
    }
}

/// Stagefront event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so they
/// can be forwarded to a browser as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SiteEvent {
    /// The live SiteData value changed (admin edit or remote merge)
    SiteDataChanged {
        /// What caused the change ("admin", "remote", ...)
        source: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Remote snapshot could not be fetched or merged; local state kept
    RemoteSyncFailed {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A new audio session was created for a track
    SessionStarted {
        track_id: TrackId,
        /// Previous session's track, if one was replaced
        replaced: Option<TrackId>,
        /// Whether the cross-origin restricted path was taken
        restricted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Session phase changed (play, pause, ended)
    PlaybackStateChanged {
        track_id: TrackId,
        old_phase: SessionPhase,
        new_phase: SessionPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The analyser could not be attached; audio continues without it
    VisualizationUnavailable {
        track_id: TrackId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback failed to start for a reason other than a track switch
    PlaybackFailed {
        track_id: TrackId,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for [`SiteEvent`]s
pub struct EventBus {
    tx: broadcast::Sender<SiteEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SiteEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit(&self, event: SiteEvent) {
        // No receivers is fine
        let _ = self.tx.send(event);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
