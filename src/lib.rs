//! PIR Motion Node - Rust Implementation
//!
//! Watches a passive-infrared motion sensor on a Raspberry Pi GPIO pin and
//! publishes every change of motion state to an MQTT broker.
//!
//! # Overview
//!
//! - Rising-edge interrupts on the sensor pin are debounced by level change
//!   and queued in FIFO order
//! - A consumer loop waits on the queue and publishes `"1"` (motion) or
//!   `"0"` (no motion), retained and at-least-once, to the location topic
//! - Every (re)connect resubscribes to the system "who" topic
//!
//! # Quick Start
//!
//! ```rust
//! use pir_motion_node::protocol::{MotionMessage, Topic};
//! use pir_motion_node::sensor::{MotionSample, PinLevel};
//!
//! let topic = Topic::from_location("diy/main/living").unwrap();
//! let message = MotionMessage::from_sample(&topic, MotionSample::new(PinLevel::High));
//!
//! assert_eq!(message.topic, "diy/main/living");
//! assert_eq!(message.payload, "1");
//! assert!(message.retain);
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod observability;
pub mod protocol;
pub mod publisher;
pub mod sensor;
pub mod testing;
pub mod transport;

pub use config::*;
pub use error::{NodeError, NodeResult};
pub use node::{run_node, MotionNode};
pub use protocol::*;
pub use publisher::MotionPublisher;
pub use sensor::{MotionSensor, SensorError};
pub use transport::mqtt::MqttClient;
