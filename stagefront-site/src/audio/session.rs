//! Audio session manager
//!
//! Owns at most one live [`MediaElement`] and the lazily created analysis
//! context. Selecting a different track tears the current session down
//! (analyser disconnected first, then the element released) before anything
//! new is created, so at most one source is ever connected.
//!
//! Player state seen by observers (phase, position, duration) changes only in
//! response to element events, never optimistically.

use super::analyser::{Analyser, AnalyserConfig, AnalysisContext, ContextState};
use super::element::{
    CrossOrigin, ElementId, MediaBackend, MediaElement, MediaEvent, MediaEventKind,
    MediaEventReceiver, MediaEventSender, PlayError, PlayRequest,
};
use super::policy::{Restriction, RestrictedPolicy};
use crate::error::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use stagefront_common::events::{EventBus, SessionPhase, SiteEvent};
use stagefront_common::model::{Track, TrackId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Observer view of the player
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub track_id: Option<TrackId>,
    pub phase: SessionPhase,
    pub current_time: f64,
    pub duration: Option<f64>,
    pub playing: bool,
    pub visualizing: bool,
}

/// How a play request settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayStart {
    Started,
    /// Request toggled the current track to paused
    Paused,
    /// Interrupted by a newer request; not an error
    Suppressed,
    Failed(String),
}

enum Ticket {
    Ready(PlayStart),
    Pending(JoinHandle<PlayStart>),
}

/// Handle to the settlement of a play request
///
/// Failures are logged and broadcast whether or not the ticket is awaited.
pub struct PlayTicket {
    track_id: TrackId,
    inner: Ticket,
}

impl PlayTicket {
    fn ready(track_id: TrackId, start: PlayStart) -> Self {
        Self {
            track_id,
            inner: Ticket::Ready(start),
        }
    }

    pub fn track_id(&self) -> TrackId {
        self.track_id
    }

    pub async fn outcome(self) -> PlayStart {
        match self.inner {
            Ticket::Ready(start) => start,
            Ticket::Pending(handle) => handle
                .await
                .unwrap_or_else(|e| PlayStart::Failed(format!("play task failed: {}", e))),
        }
    }
}

struct Session {
    track_id: TrackId,
    element: Box<dyn MediaElement>,
    phase: SessionPhase,
    restriction: Option<Restriction>,
    visualizing: bool,
}

pub struct AudioSessionManager {
    backend: Arc<dyn MediaBackend>,
    policy: RestrictedPolicy,
    analyser_config: AnalyserConfig,
    context: Option<AnalysisContext>,
    session: Option<Session>,
    next_element_id: ElementId,
    events_tx: MediaEventSender,
    events_rx: MediaEventReceiver,
    snapshot_tx: watch::Sender<PlayerSnapshot>,
    bus: Arc<EventBus>,
}

impl AudioSessionManager {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        policy: RestrictedPolicy,
        analyser_config: AnalyserConfig,
        bus: Arc<EventBus>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(PlayerSnapshot::default());
        Self {
            backend,
            policy,
            analyser_config,
            context: None,
            session: None,
            next_element_id: 1,
            events_tx,
            events_rx,
            snapshot_tx,
            bus,
        }
    }

    /// Play `track`, or toggle play/pause if it is already the current track
    pub fn play_track(&mut self, track: &Track) -> Result<PlayTicket> {
        if let Some(session) = self.session.as_mut() {
            if session.track_id == track.id {
                return Ok(Self::toggle(session, &self.events_tx));
            }
        }
        self.replace(track)
    }

    /// Tear down the current session unconditionally and start `track`
    ///
    /// A track without an audio URL is rejected before anything is torn down.
    pub fn replace(&mut self, track: &Track) -> Result<PlayTicket> {
        let url = track
            .audio_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(Error::NoAudioSource(track.id))?
            .to_string();

        let replaced = self.teardown();

        let restriction = self.policy.check(track, &url);
        let cross_origin = match restriction {
            Some(_) => None,
            None => Some(CrossOrigin::Anonymous),
        };

        let id = self.next_element_id;
        self.next_element_id += 1;

        let element = match self
            .backend
            .create_element(id, &url, cross_origin, self.events_tx.clone())
        {
            Ok(element) => element,
            Err(e) => {
                warn!("Failed to create element for track {}: {}", track.id, e);
                self.bus.emit(SiteEvent::PlaybackFailed {
                    track_id: track.id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.publish();
                return Err(Error::Playback(e.to_string()));
            }
        };

        match &restriction {
            Some(r) => info!(
                "Track {} is served by a restricted provider ({}); playing without visualization",
                track.id, r
            ),
            None => debug!("Track {} playing in anonymous cross-origin mode", track.id),
        }

        let restricted = restriction.is_some();
        self.session = Some(Session {
            track_id: track.id,
            element,
            phase: SessionPhase::Loading,
            restriction,
            visualizing: false,
        });

        if !restricted {
            self.attach_analyser();
        }

        self.bus.emit(SiteEvent::SessionStarted {
            track_id: track.id,
            replaced,
            restricted,
            timestamp: Utc::now(),
        });

        let ticket = match self.session.as_mut() {
            Some(session) => {
                let request = session.element.play();
                Self::spawn_ticket(session, request, &self.events_tx)
            }
            None => PlayTicket::ready(track.id, PlayStart::Failed("session vanished".to_string())),
        };
        self.publish();
        Ok(ticket)
    }

    fn toggle(session: &mut Session, events_tx: &MediaEventSender) -> PlayTicket {
        if session.element.paused() {
            debug!("Resuming track {}", session.track_id);
            let request = session.element.play();
            Self::spawn_ticket(session, request, events_tx)
        } else {
            debug!("Pausing track {}", session.track_id);
            session.element.pause();
            PlayTicket::ready(session.track_id, PlayStart::Paused)
        }
    }

    /// Await a play request off the manager
    ///
    /// Rejections other than an abort come back as a media error on the
    /// element's own event channel, so the session ends and the analyser is
    /// detached by [`handle_media_event`](Self::handle_media_event).
    fn spawn_ticket(
        session: &Session,
        request: PlayRequest,
        events_tx: &MediaEventSender,
    ) -> PlayTicket {
        let track_id = session.track_id;
        let element = session.element.id();
        let events_tx = events_tx.clone();
        let handle = tokio::spawn(async move {
            match request.await.unwrap_or(Err(PlayError::Aborted)) {
                Ok(()) => PlayStart::Started,
                Err(PlayError::Aborted) => {
                    debug!("Play request for track {} interrupted", track_id);
                    PlayStart::Suppressed
                }
                Err(e) => {
                    warn!("Playback of track {} failed: {}", track_id, e);
                    let _ = events_tx.send(MediaEvent {
                        element,
                        kind: MediaEventKind::Error(e.to_string()),
                    });
                    PlayStart::Failed(e.to_string())
                }
            }
        });
        PlayTicket {
            track_id,
            inner: Ticket::Pending(handle),
        }
    }

    /// Route the current element into the analyser; failures leave playback alone
    fn attach_analyser(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let context = self
            .context
            .get_or_insert_with(|| AnalysisContext::new(&self.analyser_config));

        let attached = if context.state() == ContextState::Suspended {
            context.resume()
        } else {
            Ok(())
        }
        .and_then(|_| context.connect(session.element.as_mut()));

        match attached {
            Ok(()) => session.visualizing = true,
            Err(e) => {
                warn!(
                    "Visualization unavailable for track {}: {}",
                    session.track_id, e
                );
                session.visualizing = false;
                self.bus.emit(SiteEvent::VisualizationUnavailable {
                    track_id: session.track_id,
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    /// Disconnect and release the current session; returns its track id
    fn teardown(&mut self) -> Option<TrackId> {
        let mut session = self.session.take()?;
        if let Some(context) = self.context.as_mut() {
            context.disconnect(session.element.as_mut());
        }
        session.element.release();
        debug!(
            "Released element {} (track {})",
            session.element.id(),
            session.track_id
        );
        Some(session.track_id)
    }

    /// Seek the current session, clamped to `[0, duration]`
    ///
    /// An unknown duration clamps to 0. Returns the applied position, or
    /// `None` when nothing is loaded.
    pub fn seek(&mut self, seconds: f64) -> Option<f64> {
        let session = self.session.as_mut()?;
        let duration = session
            .element
            .duration()
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0);
        let target = if seconds.is_nan() { 0.0 } else { seconds };
        let clamped = target.clamp(0.0, duration);
        session.element.set_current_time(clamped);
        self.publish();
        Some(clamped)
    }

    /// Pause the current session, if any
    pub fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.element.pause();
        }
    }

    /// Apply one element event; events from released elements are ignored
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.element.id() != event.element {
            debug!("Ignoring {:?} from stale element {}", event.kind, event.element);
            return;
        }

        let next = match &event.kind {
            MediaEventKind::LoadedMetadata { duration } => {
                debug!("Track {} duration {:.1}s", session.track_id, duration);
                None
            }
            MediaEventKind::TimeUpdate { .. } => None,
            MediaEventKind::Play => Some(SessionPhase::Playing),
            MediaEventKind::Pause if session.phase != SessionPhase::Ended => {
                Some(SessionPhase::Paused)
            }
            MediaEventKind::Pause => None,
            MediaEventKind::Ended => Some(SessionPhase::Ended),
            MediaEventKind::Error(reason) => {
                if let Some(context) = self.context.as_mut() {
                    context.disconnect(session.element.as_mut());
                }
                session.visualizing = false;
                if session.phase == SessionPhase::Ended {
                    debug!("Further media error on track {}: {}", session.track_id, reason);
                } else {
                    warn!("Media error on track {}: {}", session.track_id, reason);
                    self.bus.emit(SiteEvent::PlaybackFailed {
                        track_id: session.track_id,
                        reason: reason.clone(),
                        timestamp: Utc::now(),
                    });
                }
                Some(SessionPhase::Ended)
            }
        };

        if let Some(new_phase) = next {
            if new_phase != session.phase {
                let old_phase = session.phase;
                session.phase = new_phase;
                debug!(
                    "Track {} {} -> {}",
                    session.track_id, old_phase, new_phase
                );
                self.bus.emit(SiteEvent::PlaybackStateChanged {
                    track_id: session.track_id,
                    old_phase,
                    new_phase,
                    timestamp: Utc::now(),
                });
            }
        }
        self.publish();
    }

    /// Apply every element event already queued; returns how many were seen
    pub fn drain_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_media_event(event);
            count += 1;
        }
        count
    }

    /// Wait for the next element event and apply it
    pub async fn process_next_event(&mut self) -> Option<MediaEvent> {
        let event = self.events_rx.recv().await?;
        self.handle_media_event(event.clone());
        Some(event)
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        match &self.session {
            Some(s) => PlayerSnapshot {
                track_id: Some(s.track_id),
                phase: s.phase,
                current_time: s.element.current_time(),
                duration: s.element.duration(),
                playing: s.phase == SessionPhase::Playing,
                visualizing: s.visualizing,
            },
            None => PlayerSnapshot::default(),
        }
    }

    /// Watch the player snapshot
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn current_track(&self) -> Option<TrackId> {
        self.session.as_ref().map(|s| s.track_id)
    }

    pub fn current_element(&self) -> Option<ElementId> {
        self.session.as_ref().map(|s| s.element.id())
    }

    pub fn phase(&self) -> SessionPhase {
        self.session.as_ref().map_or(SessionPhase::Idle, |s| s.phase)
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.session.as_ref().and_then(|s| s.restriction.as_ref())
    }

    /// Analyser of the current session, when visualization is active
    pub fn analyser(&self) -> Option<&Analyser> {
        let session = self.session.as_ref()?;
        if !session.visualizing {
            return None;
        }
        self.context.as_ref().map(AnalysisContext::analyser)
    }

    pub fn context_state(&self) -> Option<ContextState> {
        self.context.as_ref().map(AnalysisContext::state)
    }

    /// Release the session and close the analysis context
    pub fn dispose(&mut self) {
        if let Some(track_id) = self.teardown() {
            info!("Audio session for track {} disposed", track_id);
        }
        if let Some(context) = self.context.as_mut() {
            context.close();
        }
        self.publish();
    }
}

impl Drop for AudioSessionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}
