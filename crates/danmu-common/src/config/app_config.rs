//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub room: RoomSettings,
    pub connection: ConnectionSettings,
    pub api: ApiSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Which room to monitor and with which credentials
#[derive(Clone, Deserialize)]
pub struct RoomSettings {
    pub room_id: u64,
    /// Raw login cookie. Empty means anonymous.
    #[serde(default)]
    pub cookie: String,
    /// Pinned chat host; skips the discovered host list when set
    #[serde(default)]
    pub host: Option<String>,
}

impl std::fmt::Debug for RoomSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSettings")
            .field("room_id", &self.room_id)
            .field("cookie", &if self.cookie.is_empty() { "<none>" } else { "<redacted>" })
            .field("host", &self.host)
            .finish()
    }
}

/// Session timing and dispatch limits
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_connect_retry_delay_ms")]
    pub connect_retry_delay_ms: u64,
    #[serde(default = "default_read_retry_delay_ms")]
    pub read_retry_delay_ms: u64,
    /// `None` retries forever
    #[serde(default)]
    pub max_connect_attempts: Option<u32>,
    /// `None` spawns handler tasks without limit
    #[serde(default)]
    pub max_in_flight_handlers: Option<usize>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            connect_retry_delay_ms: default_connect_retry_delay_ms(),
            read_retry_delay_ms: default_read_retry_delay_ms(),
            max_connect_attempts: None,
            max_in_flight_handlers: None,
        }
    }
}

/// Room discovery HTTP API settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_live_base_url")]
    pub live_base_url: String,
    #[serde(default = "default_main_base_url")]
    pub main_base_url: String,
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            live_base_url: default_live_base_url(),
            main_base_url: default_main_base_url(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "danmu-client".to_string()
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_connect_retry_delay_ms() -> u64 {
    2_000
}

fn default_read_retry_delay_ms() -> u64 {
    3
}

fn default_live_base_url() -> String {
    "https://api.live.bilibili.com".to_string()
}

fn default_main_base_url() -> String {
    "https://api.bilibili.com".to_string()
}

fn default_api_timeout_secs() -> u64 {
    10
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DANMU_ROOM_ID` is missing, a numeric variable fails to parse,
    /// or the heartbeat interval is 0
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let room_id = lookup("DANMU_ROOM_ID").ok_or(ConfigError::MissingVar("DANMU_ROOM_ID"))?;
        let room_id = room_id
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue("DANMU_ROOM_ID", room_id))?;

        let heartbeat_interval_secs = parse_or(
            &lookup,
            "DANMU_HEARTBEAT_INTERVAL_SECS",
            default_heartbeat_interval_secs(),
        )?;
        if heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "DANMU_HEARTBEAT_INTERVAL_SECS",
                "0".to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            room: RoomSettings {
                room_id,
                cookie: lookup("DANMU_COOKIE").unwrap_or_default(),
                host: lookup("DANMU_HOST").filter(|h| !h.trim().is_empty()),
            },
            connection: ConnectionSettings {
                heartbeat_interval_secs,
                connect_retry_delay_ms: parse_or(
                    &lookup,
                    "DANMU_CONNECT_RETRY_DELAY_MS",
                    default_connect_retry_delay_ms(),
                )?,
                read_retry_delay_ms: parse_or(
                    &lookup,
                    "DANMU_READ_RETRY_DELAY_MS",
                    default_read_retry_delay_ms(),
                )?,
                max_connect_attempts: non_zero(parse_or(&lookup, "DANMU_MAX_CONNECT_ATTEMPTS", 0)?),
                max_in_flight_handlers: non_zero(parse_or(
                    &lookup,
                    "DANMU_MAX_IN_FLIGHT_HANDLERS",
                    0,
                )?),
            },
            api: ApiSettings {
                live_base_url: lookup("DANMU_API_LIVE_BASE_URL")
                    .unwrap_or_else(default_live_base_url),
                main_base_url: lookup("DANMU_API_MAIN_BASE_URL")
                    .unwrap_or_else(default_main_base_url),
                timeout_secs: parse_or(&lookup, "DANMU_API_TIMEOUT_SECS", default_api_timeout_secs())?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

// 0 means "no limit" in the environment
fn non_zero<T: Default + PartialEq>(value: T) -> Option<T> {
    (value != T::default()).then_some(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
