//! Playable element abstraction
//!
//! A `MediaElement` is one bound audio source: it knows its URL, its
//! cross-origin mode, and its playback position. Elements report lifecycle
//! changes (metadata loaded, time update, play, pause, ended, error) as
//! [`MediaEvent`]s on the channel they were created with; observers are
//! updated from those events only.

use super::analyser::SampleSink;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Identifies one element instance; never reused within a manager
pub type ElementId = u64;

/// Cross-origin request mode chosen when the element is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOrigin {
    /// Request without credentials; samples may be analysed
    Anonymous,
    /// Request with credentials
    UseCredentials,
}

/// Lifecycle notification from an element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEventKind {
    /// Duration became known (seconds)
    LoadedMetadata { duration: f64 },
    /// Playback position advanced (seconds)
    TimeUpdate { current_time: f64 },
    Play,
    Pause,
    Ended,
    /// Media failed after creation (network, codec)
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaEvent {
    pub element: ElementId,
    pub kind: MediaEventKind,
}

pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;
pub type MediaEventReceiver = mpsc::UnboundedReceiver<MediaEvent>;

/// Why a play request did not start playback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// Interrupted by pause or teardown before starting (rapid track switch)
    #[error("play request was interrupted")]
    Aborted,

    /// Refused by an autoplay or permission policy
    #[error("playback not allowed: {0}")]
    NotAllowed(String),

    /// Source could not be loaded or decoded
    #[error("playback failed: {0}")]
    Failed(String),
}

/// Pending result of [`MediaElement::play`]; a dropped sender reads as aborted
pub type PlayRequest = oneshot::Receiver<Result<(), PlayError>>;

/// Build an already-resolved [`PlayRequest`]
pub fn resolved_play_request(result: Result<(), PlayError>) -> PlayRequest {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(result);
    rx
}

/// Failure to route an element's samples into the analyser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// Element was not created in anonymous cross-origin mode
    #[error("element is not CORS-enabled")]
    NotCorsEnabled,

    /// Element already feeds an analyser
    #[error("element already has a source connection")]
    AlreadyConnected,

    #[error("{0}")]
    Backend(String),
}

/// A single playable audio element
pub trait MediaElement: Send {
    fn id(&self) -> ElementId;

    fn src(&self) -> &str;

    fn cross_origin(&self) -> Option<CrossOrigin>;

    /// Request playback; resolves once playback actually starts
    fn play(&mut self) -> PlayRequest;

    fn pause(&mut self);

    /// True until `play` is called and after `pause` or the end of media
    fn paused(&self) -> bool;

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    /// Media duration in seconds, `None` until metadata is loaded
    fn duration(&self) -> Option<f64>;

    /// Start copying decoded samples into `sink`
    fn connect_sink(&mut self, sink: SampleSink) -> Result<(), AttachError>;

    fn disconnect_sink(&mut self);

    /// Stop playback, drop the source and stop emitting events
    fn release(&mut self);
}

/// Factory for playable elements
pub trait MediaBackend: Send + Sync {
    /// Create an element bound to `src`. The cross-origin mode is fixed at
    /// creation and cannot change afterwards.
    fn create_element(
        &self,
        id: ElementId,
        src: &str,
        cross_origin: Option<CrossOrigin>,
        events: MediaEventSender,
    ) -> Result<Box<dyn MediaElement>, PlayError>;
}
