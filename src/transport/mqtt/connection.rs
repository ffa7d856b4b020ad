//! Pure connection state and option handling for the MQTT client
//!
//! This module contains pure functions for broker option construction,
//! client id generation and reconnection backoff.

use crate::config::MqttSection;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Broker connection state as seen by the lifecycle callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// ConnAck received, subscriptions (re)issued
    Connected,
    /// Not connected; the event loop keeps retrying
    Disconnected,
}

/// Delay schedule between failed event loop polls
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Backoff pattern in milliseconds, indexed by consecutive failure count
    pub backoff_pattern: Vec<u64>,
    /// Delay to use once the pattern is exhausted
    pub sustained_delay: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            backoff_pattern: vec![250, 500, 1000, 2000],
            sustained_delay: 5000,
        }
    }
}

impl ReconnectConfig {
    /// Backoff delay before retry number `attempt` (1-based)
    pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        let delay_ms = self
            .backoff_pattern
            .get(index)
            .copied()
            .unwrap_or(self.sustained_delay);
        Duration::from_millis(delay_ms)
    }
}

/// MQTT transport errors
#[derive(Debug, Error)]
pub enum MqttError {
    #[error("Invalid broker URL: {0}")]
    InvalidBrokerUrl(String),
    #[error("Publishing failed")]
    PublishFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Subscription failed")]
    SubscriptionFailed(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("No ConnAck from broker within {0:?}")]
    ConnectTimeout(Duration),
    #[error("MQTT event loop already started or stopped")]
    EventLoopStopped,
}

/// Split a broker URL into host, port and whether TLS is required
pub fn parse_broker_url(broker_url: &str) -> Result<(String, u16, bool), MqttError> {
    let url =
        Url::parse(broker_url).map_err(|_| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;

    let tls = match url.scheme() {
        "mqtt" => false,
        "mqtts" => true,
        _ => return Err(MqttError::InvalidBrokerUrl(broker_url.to_string())),
    };
    let host = url
        .host_str()
        .ok_or_else(|| MqttError::InvalidBrokerUrl(broker_url.to_string()))?;
    let port = url.port().unwrap_or(if tls { 8883 } else { 1883 });

    Ok((host.to_string(), port, tls))
}

/// Unique client id for this node so two nodes never kick each other off
pub fn build_client_id(location: &str) -> String {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let location: String = location
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("pir-{location}-{suffix}")
}

/// Build rumqttc options from configuration
pub fn configure_mqtt_options(
    client_id: &str,
    config: &MqttSection,
) -> Result<MqttOptions, MqttError> {
    let (host, port, tls) = parse_broker_url(&config.broker_url)?;
    let mut mqtt_options = MqttOptions::new(client_id, host, port);

    if tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(username) = config.username() {
        mqtt_options.set_credentials(username, config.password().unwrap_or_default());
    }

    mqtt_options.set_keep_alive(config.keep_alive());

    Ok(mqtt_options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mqtt_config() -> MqttSection {
        MqttSection {
            broker_url: "mqtt://localhost:1883".to_string(),
            username_env: None,
            password_env: None,
            keep_alive_secs: 60,
            connect_timeout_secs: 30,
        }
    }

    #[test]
    fn test_reconnect_config_default() {
        let config = ReconnectConfig::default();
        assert_eq!(config.backoff_pattern, vec![250, 500, 1000, 2000]);
        assert_eq!(config.sustained_delay, 5000);
    }

    #[test]
    fn test_calculate_backoff_delay() {
        let config = ReconnectConfig::default();

        assert_eq!(config.calculate_backoff_delay(1), Duration::from_millis(250));
        assert_eq!(config.calculate_backoff_delay(2), Duration::from_millis(500));
        assert_eq!(config.calculate_backoff_delay(3), Duration::from_millis(1000));
        assert_eq!(config.calculate_backoff_delay(4), Duration::from_millis(2000));

        // Sustained delay after pattern exhausted
        assert_eq!(config.calculate_backoff_delay(5), Duration::from_millis(5000));
        assert_eq!(config.calculate_backoff_delay(500), Duration::from_millis(5000));
    }

    #[test]
    fn test_backoff_with_empty_pattern() {
        let config = ReconnectConfig {
            backoff_pattern: vec![],
            sustained_delay: 100,
        };
        assert_eq!(config.calculate_backoff_delay(0), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff_delay(1), Duration::from_millis(100));
    }

    #[test]
    fn test_parse_broker_url() {
        assert_eq!(
            parse_broker_url("mqtt://chuck.local:1883").unwrap(),
            ("chuck.local".to_string(), 1883, false)
        );
        assert_eq!(
            parse_broker_url("mqtt://chuck.local").unwrap(),
            ("chuck.local".to_string(), 1883, false)
        );
        assert_eq!(
            parse_broker_url("mqtts://broker.example.com").unwrap(),
            ("broker.example.com".to_string(), 8883, true)
        );
        assert!(matches!(
            parse_broker_url("http://localhost"),
            Err(MqttError::InvalidBrokerUrl(_))
        ));
        assert!(matches!(
            parse_broker_url("invalid-url"),
            Err(MqttError::InvalidBrokerUrl(_))
        ));
    }

    #[test]
    fn test_build_client_id() {
        let id = build_client_id("diy/main/living");
        assert!(id.starts_with("pir-diy-main-living-"));
        assert!(!id.contains('/'));
    }

    #[test]
    fn test_configure_mqtt_options() {
        let config = test_mqtt_config();
        let options = configure_mqtt_options("pir-test", &config).unwrap();
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
        assert_eq!(options.broker_address(), ("localhost".to_string(), 1883));
    }

    #[test]
    fn test_configure_mqtt_options_credentials_from_env() {
        unsafe {
            std::env::set_var("PIR_CONN_TEST_USER", "sensor");
            std::env::set_var("PIR_CONN_TEST_PASS", "hunter2");
        }
        let mut config = test_mqtt_config();
        config.username_env = Some("PIR_CONN_TEST_USER".to_string());
        config.password_env = Some("PIR_CONN_TEST_PASS".to_string());

        let options = configure_mqtt_options("pir-test", &config).unwrap();
        let (username, password) = options.credentials().unwrap();
        assert_eq!(username, "sensor");
        assert_eq!(password, "hunter2");
    }

    #[test]
    fn test_configure_mqtt_options_no_credentials_when_env_unset() {
        let mut config = test_mqtt_config();
        config.username_env = Some("PIR_CONN_TEST_USER_UNSET".to_string());

        let options = configure_mqtt_options("pir-test", &config).unwrap();
        assert!(options.credentials().is_none());
    }

    #[test]
    fn test_configure_mqtt_options_invalid_url() {
        let mut config = test_mqtt_config();
        config.broker_url = "invalid-url".to_string();

        let result = configure_mqtt_options("pir-test", &config);
        assert!(matches!(result, Err(MqttError::InvalidBrokerUrl(_))));
    }

    #[test]
    fn test_mqtt_error_display() {
        let errors = vec![
            MqttError::InvalidBrokerUrl("test".to_string()),
            MqttError::PublishFailed("test".to_string().into()),
            MqttError::SubscriptionFailed("test".to_string().into()),
            MqttError::ConnectTimeout(Duration::from_secs(1)),
            MqttError::EventLoopStopped,
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
        }
    }
}
