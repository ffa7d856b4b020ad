//! MQTT transport for the motion node
//!
//! The module separates pure functions from I/O so the decision logic can be
//! tested without a broker:
//!
//! - [`connection`] - Broker options, client ids and reconnect backoff
//! - [`message_handler`] - Routing of polled rumqttc events
//! - [`lifecycle`] - Connect/disconnect callbacks and connection state
//! - [`client`] - The rumqttc client and its supervised event loop
//!
//! # Usage
//!
//! ```rust,no_run
//! use pir_motion_node::config::MqttSection;
//! use pir_motion_node::protocol::WHO_TOPIC;
//! use pir_motion_node::transport::mqtt::{BusLifecycle, MqttClient};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let config = MqttSection {
//!     broker_url: "mqtt://localhost:1883".to_string(),
//!     username_env: None,
//!     password_env: None,
//!     keep_alive_secs: 60,
//!     connect_timeout_secs: 30,
//! };
//!
//! let lifecycle = Arc::new(BusLifecycle::new(vec![WHO_TOPIC.to_string()]));
//! let mut client = MqttClient::new("pir-living", &config, lifecycle)?;
//! client.connect().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod lifecycle;
pub mod message_handler;

pub use client::{MqttClient, MqttHandle};
pub use connection::{
    build_client_id, configure_mqtt_options, parse_broker_url, ConnectionState, MqttError,
    ReconnectConfig,
};
pub use lifecycle::BusLifecycle;
pub use message_handler::{EventRoute, MessageHandler};
