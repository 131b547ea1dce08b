//! stagefront-site library
//!
//! Client core of the band site: layered site data with a debounced local
//! snapshot, the store proxy client, the admin gate and the audio session
//! manager.

pub mod admin;
pub mod audio;
pub mod error;
pub mod remote;
pub mod state;

pub use error::{Error, Result};
pub use remote::StoreClient;
pub use state::SiteStateController;
