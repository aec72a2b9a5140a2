//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub announcements: AnnouncementConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "social.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://social.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Scheduled announcement publishing
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementConfig {
    /// Run the background publisher for scheduled announcements
    #[serde(default = "default_scheduler_enabled")]
    pub scheduler_enabled: bool,
    /// Seconds between publisher sweeps (default: 60)
    #[serde(default = "default_publish_interval_seconds")]
    pub publish_interval_seconds: u64,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            scheduler_enabled: default_scheduler_enabled(),
            publish_interval_seconds: default_publish_interval_seconds(),
        }
    }
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_publish_interval_seconds() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SOCIALCORE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/socialcore.db")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("announcements.scheduler_enabled", true)?
            .set_default("announcements.publish_interval_seconds", 60)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SOCIALCORE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if !matches!(self.server.protocol.as_str(), "http" | "https") {
            return Err(crate::error::AppError::Config(format!(
                "server.protocol must be http or https, got {}",
                self.server.protocol
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be pretty or json, got {}",
                self.logging.format
            )));
        }

        if self.announcements.publish_interval_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "announcements.publish_interval_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/socialcore-test.db"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
            announcements: AnnouncementConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.base_url(), "http://localhost");
        assert!(config.announcements.scheduler_enabled);
        assert_eq!(config.announcements.publish_interval_seconds, 60);
    }

    #[test]
    fn validate_rejects_zero_publish_interval() {
        let mut config = valid_config();
        config.announcements.publish_interval_seconds = 0;

        let error = config
            .validate()
            .expect_err("zero publish interval must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("publish_interval_seconds")
        ));
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = valid_config();
        config.logging.format = "xml".to_string();

        let error = config.validate().expect_err("unknown format must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("logging.format")
        ));
    }
}
