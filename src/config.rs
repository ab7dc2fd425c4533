//! Configuration and settings management
//!
//! Loads settings from config files and environment variables.

use crate::relay::{
    RelayConfig, DEFAULT_API_BASE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_IDLE_TIMEOUT_SECS,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Application settings loaded from environment variables
#[derive(Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub bot_api_token: String,

    /// Bearer token for the Bunny Stream API
    #[serde(default)]
    pub stream_api_key: String,

    /// Video library name used in the upload path
    #[serde(default)]
    pub storage_zone_name: String,

    /// Base URL of the upload API
    #[serde(default = "default_stream_api_base")]
    pub stream_api_base: String,

    /// Connect timeout for outbound HTTP calls, in seconds
    #[serde(default = "default_http_connect_timeout_secs")]
    pub http_connect_timeout_secs: u64,

    /// Abort a relay when no bytes move for this many seconds
    #[serde(default = "default_http_idle_timeout_secs")]
    pub http_idle_timeout_secs: u64,
}

fn default_stream_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

const fn default_http_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_http_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("bot_api_token", &"[MASKED]")
            .field("stream_api_key", &"[MASKED]")
            .field("storage_zone_name", &self.storage_zone_name)
            .field("stream_api_base", &self.stream_api_base)
            .field("http_connect_timeout_secs", &self.http_connect_timeout_secs)
            .field("http_idle_timeout_secs", &self.http_idle_timeout_secs)
            .finish()
    }
}

/// Build the layered configuration source.
///
/// # Errors
///
/// Returns a `ConfigError` if a present config file cannot be parsed.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Local overrides, not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__STORAGE_ZONE_NAME=demo` sets `storage_zone_name`
        .add_source(Environment::with_prefix("APP").separator("__"))
        // Plain UPPER_SNAKE_CASE variables map onto snake_case keys
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stream_relay_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let mut settings: Self = build_config()?.try_deserialize()?;

        // Names used by earlier deployments
        if settings.bot_api_token.is_empty() {
            settings.bot_api_token = env_non_empty("TELEGRAM_BOT_API_TOKEN").unwrap_or_default();
        }
        if settings.stream_api_key.is_empty() {
            settings.stream_api_key = env_non_empty("BUNNY_STREAM_API_KEY").unwrap_or_default();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Check that every required value is present
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` naming the first missing variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_idle_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "HTTP_IDLE_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        let required = [
            ("BOT_API_TOKEN", &self.bot_api_token),
            ("STREAM_API_KEY", &self.stream_api_key),
            ("STORAGE_ZONE_NAME", &self.storage_zone_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Message(format!("{name} is not set")));
            }
        }
        Ok(())
    }

    /// Relay configuration derived from these settings
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::new(self.storage_zone_name.clone(), self.stream_api_key.clone())
            .with_api_base(self.stream_api_base.clone())
            .with_connect_timeout(Duration::from_secs(self.http_connect_timeout_secs))
            .with_idle_timeout(Duration::from_secs(self.http_idle_timeout_secs))
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|val| !val.is_empty())
}
