//! Configuration module for mentorchat.

use serde::Deserialize;
use std::path::Path;

use url::Url;

use crate::{ChatError, Result};

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the web application (e.g., "http://localhost:8080/AlumniMentoring").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the REST API below the base URL.
    #[serde(default = "default_api_path")]
    pub api_path: String,
    /// Path of the chat WebSocket endpoint below the base URL.
    #[serde(default = "default_chat_path")]
    pub chat_path: String,
    /// Timezone the server writes its timestamps in (e.g., "Africa/Johannesburg", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Connect timeout in seconds for REST calls.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds for REST calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080/AlumniMentoring".to_string()
}

fn default_api_path() -> String {
    "resources".to_string()
}

fn default_chat_path() -> String {
    "chat".to_string()
}

fn default_timezone() -> String {
    "Africa/Johannesburg".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_path: default_api_path(),
            chat_path: default_chat_path(),
            timezone: default_timezone(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Session cookie configuration.
///
/// The client never logs in by itself; it reuses the cookie of a session
/// established elsewhere.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Value of the session cookie.
    #[serde(default)]
    pub cookie: String,
}

fn default_cookie_name() -> String {
    "JSESSIONID".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie: String::new(),
        }
    }
}

/// Upper bound for `chat.pending_timeout_secs`.
pub const MAX_PENDING_TIMEOUT_SECS: u64 = 86_400;

/// Chat behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Number of history messages fetched when a room is opened.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Seconds after which an unconfirmed message is marked as not delivered.
    #[serde(default = "default_pending_timeout")]
    pub pending_timeout_secs: u64,
    /// Interval in seconds between pending-message sweeps.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_history_limit() -> u32 {
    50
}

fn default_pending_timeout() -> u64 {
    30
}

fn default_sweep_interval() -> u64 {
    5
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            pending_timeout_secs: default_pending_timeout(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/mentorchat.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Backend server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Session cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Chat configuration.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ChatError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ChatError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `MENTORCHAT_SESSION_COOKIE`: Override the session cookie value
    /// - `MENTORCHAT_BASE_URL`: Override the server base URL
    pub fn apply_env_overrides(&mut self) {
        if let Ok(cookie) = std::env::var("MENTORCHAT_SESSION_COOKIE") {
            if !cookie.is_empty() {
                self.session.cookie = cookie;
            }
        }
        if let Ok(base_url) = std::env::var("MENTORCHAT_BASE_URL") {
            if !base_url.is_empty() {
                self.server.base_url = base_url;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The base URL is not an http or https URL
    /// - The server timezone is unknown
    /// - The history limit is zero
    /// - The sweep interval is zero or the pending timeout exceeds a day
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.server.base_url)
            .map_err(|e| ChatError::Config(format!("invalid base_url: {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "base_url must use http or https, got {}",
                base.scheme()
            )));
        }
        if self.server.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(ChatError::Config(format!(
                "unknown timezone: {}",
                self.server.timezone
            )));
        }
        if self.chat.history_limit == 0 {
            return Err(ChatError::Config(
                "chat.history_limit must be greater than zero".to_string(),
            ));
        }
        if self.chat.sweep_interval_secs == 0 {
            return Err(ChatError::Config(
                "chat.sweep_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.chat.pending_timeout_secs > MAX_PENDING_TIMEOUT_SECS {
            return Err(ChatError::Config(format!(
                "chat.pending_timeout_secs must be at most {MAX_PENDING_TIMEOUT_SECS}"
            )));
        }
        Ok(())
    }

    /// Base URL of the REST API, without a trailing slash.
    pub fn api_base(&self) -> String {
        format!(
            "{}/{}",
            self.server.base_url.trim_end_matches('/'),
            self.server.api_path.trim_matches('/')
        )
    }

    /// Base URL of the chat WebSocket endpoint (`ws://` for http, `wss://` for https).
    pub fn ws_base(&self) -> Result<Url> {
        let raw = format!(
            "{}/{}",
            self.server.base_url.trim_end_matches('/'),
            self.server.chat_path.trim_matches('/')
        );
        let mut url =
            Url::parse(&raw).map_err(|e| ChatError::Config(format!("invalid base_url: {e}")))?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => {
                return Err(ChatError::Config(format!(
                    "base_url must use http or https, got {other}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| ChatError::Config(format!("cannot switch {raw} to {scheme}")))?;
        Ok(url)
    }
}
