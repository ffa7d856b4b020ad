//! Configuration for the motion node
//!
//! Loaded from a TOML file with three sections: `[node]` (location used as
//! the publish topic), `[mqtt]` (broker connection) and `[sensor]` (GPIO pin
//! and startup settle delay).

use crate::protocol::Topic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Highest BCM GPIO number on the 40-pin header
pub const MAX_BCM_PIN: u8 = 27;

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    pub node: NodeSection,
    pub mqtt: MqttSection,
    #[serde(default)]
    pub sensor: SensorSection,
}

/// Node identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSection {
    /// Location identifier, published to as the motion topic
    pub location: String,
}

/// MQTT broker connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttSection {
    /// MQTT broker URL with protocol and port
    pub broker_url: String,
    /// Environment variable containing username
    pub username_env: Option<String>,
    /// Environment variable containing password
    pub password_env: Option<String>,
    /// Keep-alive interval in seconds (default: 60)
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// How long startup waits for the first ConnAck (default: 30)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_keep_alive() -> u64 {
    60
}

fn default_connect_timeout() -> u64 {
    30
}

impl MqttSection {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Get MQTT username from environment variable
    pub fn username(&self) -> Option<String> {
        self.username_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }

    /// Get MQTT password from environment variable
    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }
}

/// PIR sensor wiring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorSection {
    /// BCM GPIO number (board pin 11 is GPIO 17)
    #[serde(default = "default_pin")]
    pub pin: u8,
    /// Delay between broker connect and arming interrupts, in milliseconds
    #[serde(default = "default_startup_delay")]
    pub startup_delay_ms: u64,
}

fn default_pin() -> u8 {
    17
}

fn default_startup_delay() -> u64 {
    2000
}

impl Default for SensorSection {
    fn default() -> Self {
        Self {
            pin: default_pin(),
            startup_delay_ms: default_startup_delay(),
        }
    }
}

impl SensorSection {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid location: {0}")]
    InvalidLocation(#[from] crate::protocol::TopicError),
    #[error("Invalid GPIO pin {0}: must be a BCM number between 0 and 27")]
    InvalidPin(u8),
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Invalid keep-alive {0}s: must be at least 5 seconds")]
    InvalidKeepAlive(u64),
    #[error("No configuration file found; tried: {searched}")]
    NotFound { searched: String },
}

impl NodeConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load the first existing file among `paths`, returning it with its path
    pub fn load_first_existing<P: AsRef<Path>>(
        paths: &[P],
    ) -> Result<(Self, PathBuf), ConfigError> {
        for path in paths {
            let path = path.as_ref();
            if path.exists() {
                return Ok((Self::load_from_file(path)?, path.to_path_buf()));
            }
        }

        Err(ConfigError::NotFound {
            searched: paths
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that cannot be expressed in the TOML schema
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.topic()?;
        validate_pin(self.sensor.pin)?;
        validate_broker_url(&self.mqtt.broker_url)?;
        if self.mqtt.keep_alive_secs < 5 {
            return Err(ConfigError::InvalidKeepAlive(self.mqtt.keep_alive_secs));
        }
        Ok(())
    }

    /// Publish topic for this node
    pub fn topic(&self) -> Result<Topic, ConfigError> {
        Ok(Topic::from_location(&self.node.location)?)
    }
}

fn validate_pin(pin: u8) -> Result<(), ConfigError> {
    if pin > MAX_BCM_PIN {
        return Err(ConfigError::InvalidPin(pin));
    }
    Ok(())
}

fn validate_broker_url(broker_url: &str) -> Result<(), ConfigError> {
    let url =
        Url::parse(broker_url).map_err(|_| ConfigError::InvalidBrokerUrl(broker_url.to_string()))?;

    if !matches!(url.scheme(), "mqtt" | "mqtts") || url.host_str().is_none() {
        return Err(ConfigError::InvalidBrokerUrl(broker_url.to_string()));
    }
    Ok(())
}
