//! Session timing configuration

use danmu_common::ConnectionSettings;
use std::time::Duration;

/// Timing and limits for a [`Session`](super::Session)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub heartbeat_interval: Duration,
    /// Wait between failed connect attempts
    pub connect_retry_delay: Duration,
    /// Wait after a read failure before reconnecting
    pub read_retry_delay: Duration,
    /// Connect attempts per connect sequence; `None` is unbounded
    pub max_connect_attempts: Option<u32>,
    /// Concurrently running handlers; `None` is unbounded
    pub max_in_flight_handlers: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&ConnectionSettings::default())
    }
}

impl From<&ConnectionSettings> for SessionConfig {
    fn from(settings: &ConnectionSettings) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(settings.heartbeat_interval_secs),
            connect_retry_delay: Duration::from_millis(settings.connect_retry_delay_ms),
            read_retry_delay: Duration::from_millis(settings.read_retry_delay_ms),
            max_connect_attempts: settings.max_connect_attempts.filter(|n| *n > 0),
            max_in_flight_handlers: settings.max_in_flight_handlers.filter(|n| *n > 0),
        }
    }
}
