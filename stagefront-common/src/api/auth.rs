//! Shared-secret check for the store proxy
//!
//! # Architecture
//!
//! Writes to the KV record require the `x-auth-key` request header to equal
//! the secret configured on the server. Reads are public. When no secret is
//! configured the write path is closed entirely.
//!
//! # Pure Functions
//!
//! This module contains ONLY pure functions. No HTTP framework dependencies
//! (Axum, etc.); the KV service and the site client wrap these.

/// Header carrying the sync secret on PUT requests
pub const AUTH_HEADER: &str = "x-auth-key";

/// Body message for a rejected key
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or missing Key";

/// Sync secret validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAuthError {
    /// Server has no secret configured; writes are disabled
    NotConfigured,

    /// Request carried no key header
    MissingKey,

    /// Request key does not match the configured secret
    InvalidKey,
}

impl std::fmt::Display for SyncAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAuthError::NotConfigured => write!(f, "Sync secret not configured"),
            SyncAuthError::MissingKey => write!(f, "Missing {} header", AUTH_HEADER),
            SyncAuthError::InvalidKey => write!(f, "Invalid {} header", AUTH_HEADER),
        }
    }
}

impl std::error::Error for SyncAuthError {}

/// Validate a provided key against the configured secret
///
/// An empty configured secret counts as not configured.
///
/// # Examples
///
/// ```
/// use stagefront_common::api::auth::{check_sync_key, SyncAuthError};
///
/// assert!(check_sync_key(Some("s3cret"), Some("s3cret")).is_ok());
/// assert_eq!(check_sync_key(Some("s3cret"), Some("nope")), Err(SyncAuthError::InvalidKey));
/// assert_eq!(check_sync_key(None, Some("s3cret")), Err(SyncAuthError::NotConfigured));
/// ```
pub fn check_sync_key(configured: Option<&str>, provided: Option<&str>) -> Result<(), SyncAuthError> {
    let secret = match configured {
        Some(s) if !s.is_empty() => s,
        _ => return Err(SyncAuthError::NotConfigured),
    };

    let provided = provided.ok_or(SyncAuthError::MissingKey)?;

    if keys_match(secret.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(SyncAuthError::InvalidKey)
    }
}

/// Length-independent comparison; always walks the longer input
fn keys_match(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff == 0
}
