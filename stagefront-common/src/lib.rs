//! # Stagefront Common Library
//!
//! Shared code for the Stagefront band site services including:
//! - Site data model and built-in defaults
//! - Declarative merge of defaults, local snapshot and remote snapshot
//! - Local snapshot persistence with write coalescing
//! - Event types (SiteEvent enum) and the event bus
//! - Store proxy auth helpers
//! - Configuration loading

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod merge;
pub mod model;
pub mod snapshot;

pub use error::{Error, Result};
pub use model::SiteData;
