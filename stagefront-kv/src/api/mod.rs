//! HTTP API handlers for stagefront-kv

pub mod error;
pub mod health;
pub mod record;

pub use error::ApiError;
pub use health::health_routes;
pub use record::record_handler;
