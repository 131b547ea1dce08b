//! Admin panel unlock gate
//!
//! A plaintext comparison that only hides the editing UI. It is not a
//! security boundary: the password travels inside the public site data.

use stagefront_common::SiteData;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct AdminGate {
    default_password: String,
    unlocked: bool,
    error: bool,
    failed_attempts: u32,
}

impl AdminGate {
    /// `default_password` applies while `SiteData.admin_password` is empty
    pub fn new(default_password: impl Into<String>) -> Self {
        Self {
            default_password: default_password.into(),
            unlocked: false,
            error: false,
            failed_attempts: 0,
        }
    }

    /// Password currently in force for `data`
    pub fn expected<'a>(&'a self, data: &'a SiteData) -> &'a str {
        if data.admin_password.is_empty() {
            &self.default_password
        } else {
            &data.admin_password
        }
    }

    /// Try to unlock; a wrong attempt sets the error flag
    pub fn submit(&mut self, candidate: &str, data: &SiteData) -> bool {
        if candidate == self.expected(data) {
            info!("Admin panel unlocked");
            self.unlocked = true;
            self.error = false;
            self.failed_attempts = 0;
        } else {
            self.failed_attempts += 1;
            debug!("Admin unlock rejected (attempt {})", self.failed_attempts);
            self.unlocked = false;
            self.error = true;
        }
        self.unlocked
    }

    pub fn lock(&mut self) {
        self.unlocked = false;
        self.error = false;
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }
}
