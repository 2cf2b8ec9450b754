//! Environment configuration
//!
//! Read once at startup, after `.env` has been loaded.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_STORAGE_DIR: &str = ".wizard-state";
pub const DEFAULT_STORAGE_KEY: &str = "tax-assistant-wizard-state-v1";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq)]
pub struct WizardConfig {
    pub backend_url: String,
    pub storage_dir: PathBuf,
    pub storage_key: String,
    /// `None` leaves the HTTP client's default in place.
    pub backend_timeout: Option<Duration>,
    pub port: u16,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            backend_timeout: None,
            port: DEFAULT_PORT,
        }
    }
}

impl WizardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Bad numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend_timeout = non_empty("BACKEND_TIMEOUT_SECS").and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    warn!(value = %raw, "Ignoring invalid BACKEND_TIMEOUT_SECS");
                    None
                }
            }
        });

        let port = non_empty("PORT")
            .or_else(|| non_empty("API_PORT"))
            .and_then(|raw| match raw.trim().parse::<u16>() {
                Ok(port) => Some(port),
                Err(_) => {
                    warn!(value = %raw, "Ignoring invalid PORT");
                    None
                }
            })
            .unwrap_or(defaults.port);

        Self {
            backend_url: non_empty("TAX_BACKEND_URL").unwrap_or(defaults.backend_url),
            storage_dir: non_empty("WIZARD_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            storage_key: non_empty("WIZARD_STORAGE_KEY").unwrap_or(defaults.storage_key),
            backend_timeout,
            port,
        }
    }
}
