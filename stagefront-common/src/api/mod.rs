//! API module for the store proxy contract
//!
//! Shared by the KV service (server side) and the site client (client side).
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Shared types

pub mod auth;
pub mod types;

pub use auth::{check_sync_key, SyncAuthError, AUTH_HEADER, UNAUTHORIZED_MESSAGE};
pub use types::{ErrorResponse, SuccessResponse};
