//! Configuration structs

mod app_config;

pub use app_config::{
    ApiSettings, AppConfig, AppSettings, ConfigError, ConnectionSettings, Environment,
    RoomSettings,
};
