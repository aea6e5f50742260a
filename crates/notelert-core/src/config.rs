//! Notelert configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{NotelertError, Result};
use crate::types::{Platform, SavedLocation, ScheduledEmailRecord};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotelertConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub platform: PlatformConfig,
}

impl NotelertConfig {
    /// Load config from the default path (~/.notelert/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NotelertError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| NotelertError::Config(format!("Failed to parse config: {e}")))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| NotelertError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `NOTELERT_TOKEN` wins over the stored token when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("NOTELERT_TOKEN")
            && !token.trim().is_empty()
        {
            self.settings.plugin_token = token.trim().to_string();
        }
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Notelert home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".notelert")
    }
}

/// Backend API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Long enough to ride out serverless cold starts.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_header")]
    pub token_header: String,
    #[serde(default = "default_push_path")]
    pub schedule_push_path: String,
    #[serde(default = "default_email_path")]
    pub schedule_email_path: String,
    #[serde(default = "default_premium_path")]
    pub premium_status_path: String,
    #[serde(default = "default_locations_path")]
    pub list_locations_path: String,
}

fn default_base_url() -> String { "https://api.notelert.app".into() }
fn default_timeout_secs() -> u64 { 25 }
fn default_token_header() -> String { "x-plugin-token".into() }
fn default_push_path() -> String { "/api/schedule-push".into() }
fn default_email_path() -> String { "/api/schedule-email".into() }
fn default_premium_path() -> String { "/api/premium-status".into() }
fn default_locations_path() -> String { "/api/list-locations".into() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            token_header: default_token_header(),
            schedule_push_path: default_push_path(),
            schedule_email_path: default_email_path(),
            premium_status_path: default_premium_path(),
            list_locations_path: default_locations_path(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join the base URL with an endpoint path.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// User settings owned by the host application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub plugin_token: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub vault_name: Option<String>,
    #[serde(default)]
    pub saved_locations: Vec<SavedLocation>,
    #[serde(default)]
    pub scheduled_emails: Vec<ScheduledEmailRecord>,
}

impl Settings {
    pub fn has_valid_token(&self) -> bool {
        crate::is_valid_plugin_token(&self.plugin_token)
    }

    /// Configured email address, ignoring blank values.
    pub fn email(&self) -> Option<&str> {
        self.user_email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    /// Case-insensitive lookup of a saved location by name.
    pub fn find_location(&self, name: &str) -> Option<&SavedLocation> {
        let wanted = name.trim().to_lowercase();
        self.saved_locations
            .iter()
            .find(|l| l.name.trim().to_lowercase() == wanted)
    }
}

/// Platform the CLI pretends to be.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub kind: Platform,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NotelertConfig::default();
        assert_eq!(config.api.timeout_secs, 25);
        assert_eq!(config.api.token_header, "x-plugin-token");
        assert_eq!(config.platform.kind, Platform::Desktop);
        assert!(config.settings.plugin_token.is_empty());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [api]
            base_url = "http://localhost:8787/"
            timeout_secs = 5

            [settings]
            plugin_token = "abc"
            user_email = "me@example.com"

            [[settings.saved_locations]]
            name = "Home"
            latitude = 48.85
            longitude = 2.35

            [platform]
            kind = "android"
        "#;

        let config: NotelertConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api.timeout(), Duration::from_secs(5));
        assert_eq!(
            config.api.url("/api/schedule-push"),
            "http://localhost:8787/api/schedule-push"
        );
        assert_eq!(config.settings.email(), Some("me@example.com"));
        assert_eq!(config.settings.saved_locations.len(), 1);
        assert_eq!(config.platform.kind, Platform::Android);
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: NotelertConfig = toml::from_str("").unwrap();
        assert_eq!(config.api.premium_status_path, "/api/premium-status");
        assert!(config.settings.saved_locations.is_empty());
    }

    #[test]
    fn test_blank_email_is_none() {
        let settings = Settings {
            user_email: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(settings.email(), None);
    }

    #[test]
    fn test_find_location_case_insensitive() {
        let settings = Settings {
            saved_locations: vec![SavedLocation {
                name: "Office".into(),
                latitude: 1.0,
                longitude: 2.0,
                radius: 150.0,
                address: None,
            }],
            ..Default::default()
        };
        assert!(settings.find_location(" office ").is_some());
        assert!(settings.find_location("home").is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("notelert-test-config");
        let path = dir.join("config.toml");
        let mut config = NotelertConfig::default();
        config.settings.user_email = Some("a@b.c".into());
        config.save_to(&path).unwrap();

        let loaded = NotelertConfig::load_from(&path).unwrap();
        assert_eq!(loaded.settings.email(), Some("a@b.c"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_home_dir() {
        let home = NotelertConfig::home_dir();
        assert!(home.to_string_lossy().contains("notelert"));
    }
}
