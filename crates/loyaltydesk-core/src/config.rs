//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API base URLs, the organization id, and the last
//! email used to log in.
//!
//! Configuration is stored at `~/.config/loyaltydesk/config.json` and can be
//! overridden per-process with `LOYALTYDESK_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "loyaltydesk";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL for loyalty endpoints (tiers, wallets, check-in, points)
pub const DEFAULT_API_BASE_URL: &str = "https://api-yeshtery.dev.meetusvr.com/v1/";

/// Base URL for identity endpoints (login, registration)
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://api.dev.meetusvr.com/";

/// Where activation emails send newly registered users
pub const DEFAULT_ACTIVATION_REDIRECT_URL: &str = "https://www.dev.meetusvr.com/tseppas/activate";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub identity_base_url: String,
    pub organization_id: Option<i64>,
    pub activation_redirect_url: String,
    /// Landing page encoded into shop check-in QR codes
    pub checkin_page_url: Option<String>,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            organization_id: None,
            activation_redirect_url: DEFAULT_ACTIVATION_REDIRECT_URL.to_string(),
            checkin_page_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `LOYALTYDESK_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("LOYALTYDESK_API_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = lookup("LOYALTYDESK_IDENTITY_URL") {
            self.identity_base_url = url;
        }
        if let Some(raw) = lookup("LOYALTYDESK_ORG_ID") {
            match raw.trim().parse() {
                Ok(id) => self.organization_id = Some(id),
                Err(_) => warn!(value = %raw, "Ignoring non-numeric LOYALTYDESK_ORG_ID"),
            }
        }
        if let Some(url) = lookup("LOYALTYDESK_REDIRECT_URL") {
            self.activation_redirect_url = url;
        }
        if let Some(url) = lookup("LOYALTYDESK_CHECKIN_PAGE") {
            self.checkin_page_url = Some(url);
        }
        if let Some(raw) = lookup("LOYALTYDESK_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => warn!(value = %raw, "Ignoring invalid LOYALTYDESK_TIMEOUT_SECS"),
            }
        }
        if let Some(email) = lookup("LOYALTYDESK_EMAIL") {
            self.last_email = Some(email);
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted session entries.
    pub fn session_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join("session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"organization_id": 7}"#).unwrap();
        assert_eq!(config.organization_id, Some(7));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LOYALTYDESK_API_URL", "http://localhost:8060/v1/"),
            ("LOYALTYDESK_ORG_ID", "12"),
            ("LOYALTYDESK_TIMEOUT_SECS", "not-a-number"),
            ("LOYALTYDESK_CHECKIN_PAGE", "https://shop.example/checkin"),
        ]);

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "http://localhost:8060/v1/");
        assert_eq!(config.organization_id, Some(12));
        // Invalid values leave the previous setting in place
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.checkin_page_url.as_deref(), Some("https://shop.example/checkin"));
        assert_eq!(config.identity_base_url, DEFAULT_IDENTITY_BASE_URL);
    }

    #[test]
    fn test_request_timeout_never_zero() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
