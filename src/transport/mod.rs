//! Message bus transport
//!
//! The core depends on the bus only through [`BusClient`]: a retained or
//! plain publish and a subscribe, both at-least-once. The MQTT implementation
//! lives in [`mqtt`]; tests use the mock in `crate::testing`.

pub mod mqtt;

pub use mqtt::MqttError;

/// Publish/subscribe capability the motion pipeline depends on
#[async_trait::async_trait]
pub trait BusClient: Send + Sync {
    /// Publish `payload` to `topic` with QoS at-least-once
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), MqttError>;

    /// Subscribe to `topic` with QoS at-least-once
    async fn subscribe(&self, topic: &str) -> Result<(), MqttError>;
}
