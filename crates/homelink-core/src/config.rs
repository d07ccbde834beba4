//! Application configuration.
//!
//! Loaded from a TOML file with environment overrides for secrets. The
//! transport connection string is never written to the config file in
//! production deployments; `HOMELINK_CONNECTION_STRING` takes precedence.

use serde::{Deserialize, Serialize};

/// Environment variable names.
pub mod env_vars {
    /// Vendor hub connection string for cloud-to-device commands.
    pub const CONNECTION_STRING: &str = "HOMELINK_CONNECTION_STRING";
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Vendor transport settings.
    pub transport: TransportConfig,
    /// Scheduler cadences.
    pub scheduler: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            transport: TransportConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9480,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend type: "memory" or "redb".
    pub backend: String,
    /// Database file path (redb backend).
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "redb".to_string(),
            path: "homelink.redb".to_string(),
        }
    }
}

/// Vendor transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Hub connection string. Overridden by `HOMELINK_CONNECTION_STRING`.
    pub connection_string: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
        }
    }
}

impl TransportConfig {
    /// The effective connection string, preferring the environment.
    pub fn effective_connection_string(&self) -> Option<String> {
        std::env::var(env_vars::CONNECTION_STRING)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.connection_string.clone())
    }
}

/// Recurring job cadences, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time-rule sweep interval.
    pub time_rules_secs: u64,
    /// Sensor-rule sweep interval.
    pub sensor_rules_secs: u64,
    /// Sensor snapshot interval.
    pub snapshot_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_rules_secs: 60,
            sensor_rules_secs: 300,
            snapshot_secs: 3600,
        }
    }
}

impl AppConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 9480);
        assert_eq!(config.storage.backend, "redb");
        assert_eq!(config.scheduler.time_rules_secs, 60);
        assert_eq!(config.scheduler.sensor_rules_secs, 300);
        assert_eq!(config.scheduler.snapshot_secs, 3600);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            port = 8080

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.scheduler.snapshot_secs, 3600);
    }
}
