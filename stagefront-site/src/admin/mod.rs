//! Admin panel support: unlock gate and collection edits

pub mod gate;
pub mod mutations;

pub use gate::AdminGate;
