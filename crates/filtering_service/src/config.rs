//! Configuration management for the filtering service.
//!
//! Settings are loaded from a TOML file, overridden from the command line and
//! validated before the server is built.

use crate::cli::CliArgs;
use anyhow::{bail, Context, Result};
use filter_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Rectangle log settings
    pub storage: StorageSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
}

/// Where the rectangle log is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// CSV file the matched rectangles are appended to
    pub data_file: String,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "0.0.0.0:8080".to_string(),
            },
            storage: StorageSettings {
                data_file: "data.csv".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to `path`
    /// and returns it.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to write config file {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command-line overrides on top of the loaded file.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(data_file) = &args.data_file {
            self.storage.data_file = data_file.to_string_lossy().to_string();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            bail!("Invalid bind address: {}", self.server.bind_address);
        }

        if self.storage.data_file.trim().is_empty() {
            bail!("Data file path cannot be empty");
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                VALID_LOG_LEVELS
            );
        }

        Ok(())
    }

    /// Converts to the library's `ServerConfig`.
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            bind_address: self
                .server
                .bind_address
                .parse()
                .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))?,
            data_file: PathBuf::from(&self.storage.data_file),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args() -> CliArgs {
        CliArgs {
            config_path: PathBuf::from("config.toml"),
            bind_address: None,
            data_file: None,
            log_level: None,
            json_logs: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.bind_address.port(), 8080);
        assert_eq!(server_config.data_file, PathBuf::from("data.csv"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.bind_address = "invalid".to_string();
        assert!(config.validate().is_err());

        config.server.bind_address = "127.0.0.1:8080".to_string();
        config.storage.data_file = "  ".to_string();
        assert!(config.validate().is_err());

        config.storage.data_file = "data.csv".to_string();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "warn".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[server]
bind_address = "127.0.0.1:3000"

[storage]
data_file = "/var/lib/rects/data.csv"

[logging]
level = "debug"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert_eq!(config.storage.data_file, "/var/lib/rects/data.csv");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        let overrides = CliArgs {
            bind_address: Some("127.0.0.1:9000".to_string()),
            data_file: Some(PathBuf::from("other.csv")),
            log_level: Some("trace".to_string()),
            json_logs: true,
            ..args()
        };

        config.apply_overrides(&overrides);

        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.storage.data_file, "other.csv");
        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);

        let mut untouched = AppConfig::default();
        untouched.apply_overrides(&args());
        assert_eq!(untouched.server.bind_address, "0.0.0.0:8080");
        assert!(!untouched.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.storage.data_file, config.storage.data_file);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nbind_address = 1").unwrap();

        assert!(AppConfig::load_from_file(&path).await.is_err());
    }
}
