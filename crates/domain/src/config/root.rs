use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::network::NetworkConfig;
use super::upstream::UpstreamConfig;
use crate::upstream::ServerDefaults;

/// Main configuration structure for ferrous-netd
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listener and interface configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Upstream resolver configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-netd.toml in current directory
    /// 3. /etc/ferrous-netd/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new("ferrous-netd.toml").exists() {
            Self::from_file("ferrous-netd.toml")?
        } else if std::path::Path::new("/etc/ferrous-netd/config.toml").exists() {
            Self::from_file("/etc/ferrous-netd/config.toml")?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.port {
            self.network.port = port;
        }
        if !overrides.interfaces.is_empty() {
            self.network.interfaces = overrides.interfaces;
        }
        if overrides.bind_interfaces {
            self.network.bind_interfaces = true;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn server_defaults(&self) -> ServerDefaults {
        ServerDefaults {
            port: ServerDefaults::default().port,
            query_port: self.network.query_port,
            routing_mark: self.network.routing_mark,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;

        self.upstream
            .static_servers(&self.server_defaults())
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if self.upstream.servers.is_empty() && self.upstream.no_resolv {
            return Err(ConfigError::Validation(
                "No upstream servers configured and resolv file disabled".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub interfaces: Vec<String>,
    pub bind_interfaces: bool,
    pub log_level: Option<String>,
}
