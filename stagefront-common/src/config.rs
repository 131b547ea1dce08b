//! Configuration loading
//!
//! Values resolve in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! Steps 1 and 2 are handled by each binary's clap definition (`env = ...`);
//! this module provides steps 3 and 4. A missing config file is not an
//! error: the service logs a warning and starts with defaults.

use crate::snapshot::DEFAULT_SNAPSHOT_KEY;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the store-sync secret
pub const SYNC_SECRET_ENV: &str = "STAGEFRONT_SYNC_SECRET";

/// Environment variable holding the default admin gate password
pub const ADMIN_PASSWORD_ENV: &str = "STAGEFRONT_ADMIN_PASSWORD";

/// Fallback admin gate password when neither SiteData nor the environment set one
pub const COMPILED_ADMIN_PASSWORD: &str = "admin";

/// `[store]` section: the KV proxy service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub bind: String,
    pub port: u16,
    /// Directory of the file-backed KV binding
    pub data_dir: Option<PathBuf>,
    /// Key of the single record the proxy serves
    pub record_key: String,
    /// Upper bound for PUT bodies
    pub max_body_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8788,
            data_dir: None,
            record_key: "site_data".to_string(),
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// `[site]` section: the site client core
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Store proxy URL, e.g. `https://example.com/api/data`
    pub remote_endpoint: Option<String>,
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_key: String,
    /// Quiet period before a coalesced snapshot write
    pub debounce_ms: u64,
    /// Default admin gate password (prefer the environment variable)
    pub admin_password: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            remote_endpoint: None,
            snapshot_dir: None,
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            debounce_ms: 500,
            admin_password: None,
        }
    }
}

/// Provider whose hosts refuse cross-origin sample access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedProviderConfig {
    /// Matches the provider name of a track's external reference
    pub name: String,
    /// Hosts (and their subdomains) serving this provider's audio
    pub hosts: Vec<String>,
}

/// `[audio]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub restricted_providers: Vec<RestrictedProviderConfig>,
    /// Analyser FFT size (power of two)
    pub fft_size: usize,
    /// Analyser time smoothing constant, 0.0 to 1.0
    pub smoothing: f32,
    /// Interval between time-update events from the headless backend
    pub time_update_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            restricted_providers: vec![RestrictedProviderConfig {
                name: "netease".to_string(),
                hosts: vec!["music.163.com".to_string(), "music.126.net".to_string()],
            }],
            fft_size: 2048,
            smoothing: 0.8,
            time_update_ms: 250,
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `config.toml`; every section and field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub store: StoreConfig,
    pub site: SiteConfig,
    pub audio: AudioConfig,
    pub logging: LoggingConfig,
}

impl TomlConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// `<config dir>/stagefront/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stagefront").join("config.toml"))
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("stagefront"))
        .unwrap_or_else(|| PathBuf::from("./stagefront_data"))
}

/// Load the TOML config
///
/// An explicit path must exist. Without one, the platform default path is
/// tried and its absence yields compiled defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            Some(path) => {
                warn!("No config file at {}; using defaults", path.display());
                return Ok(TomlConfig::default());
            }
            None => {
                warn!("Could not determine config directory; using defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)?;
    let config = TomlConfig::from_toml_str(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [store]
            port = 9000

            [audio]
            fft_size = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.store.port, 9000);
        assert_eq!(config.store.record_key, "site_data");
        assert_eq!(config.audio.fft_size, 1024);
        assert_eq!(config.audio.restricted_providers[0].name, "netease");
        assert_eq!(config.site.debounce_ms, 500);
    }

    #[test]
    fn test_provider_table_replaced_from_toml() {
        let config = TomlConfig::from_toml_str(
            r#"
            [[audio.restricted_providers]]
            name = "qq"
            hosts = ["y.qq.com"]
            "#,
        )
        .unwrap();

        assert_eq!(config.audio.restricted_providers.len(), 1);
        assert_eq!(config.audio.restricted_providers[0].hosts, vec!["y.qq.com"]);
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        assert!(TomlConfig::from_toml_str("[store\nport = ").is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
