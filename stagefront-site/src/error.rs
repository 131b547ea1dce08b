//! Error types for stagefront-site
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use stagefront_common::model::TrackId;
use thiserror::Error;

/// Main error type for stagefront-site
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared crate (config, snapshot store, merge)
    #[error(transparent)]
    Common(#[from] stagefront_common::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// Store proxy answered with a non-success status
    #[error("Store proxy error: {0}")]
    Http(String),

    /// Store proxy rejected the sync key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Track id not present in the site data
    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    /// Track has no playable audio URL
    #[error("Track {0} has no audio URL")]
    NoAudioSource(TrackId),

    /// Playable element could not be created or started
    #[error("Playback error: {0}")]
    Playback(String),

    /// Audio could not be fetched or decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration problem in the site client
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using stagefront-site Error
pub type Result<T> = std::result::Result<T, Error>;
