//! Audio playback and visualization
//!
//! - `element`: playable element and backend traits
//! - `analyser`: FFT analyser and analysis context
//! - `policy`: cross-origin restricted provider table
//! - `session`: single-session manager tying the above together
//! - `headless`: symphonia-backed backend with no device output

pub mod analyser;
pub mod element;
pub mod headless;
pub mod policy;
pub mod session;

pub use analyser::{Analyser, AnalyserConfig, AnalysisContext, ContextState, SampleSink};
pub use element::{
    AttachError, CrossOrigin, ElementId, MediaBackend, MediaElement, MediaEvent, MediaEventKind,
    MediaEventSender, PlayError, PlayRequest,
};
pub use headless::{decode_to_mono, DecodedAudio, HeadlessBackend};
pub use policy::{Restriction, RestrictedPolicy};
pub use session::{AudioSessionManager, PlayStart, PlayTicket, PlayerSnapshot};
