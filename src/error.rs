//! Top-level error type for the motion node
//!
//! Each layer owns its error enum; `NodeError` wraps them for `run_node`
//! and the binary.

use crate::config::ConfigError;
use crate::protocol::TopicError;
use crate::sensor::SensorError;
use crate::transport::MqttError;
use thiserror::Error;

/// Errors that stop the node
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Transport error: {0}")]
    Transport(#[from] MqttError),

    #[error("Topic error: {0}")]
    Topic(#[from] TopicError),
}

impl NodeError {
    /// True when the failure comes from missing or unusable GPIO hardware
    pub fn is_hardware_failure(&self) -> bool {
        matches!(self, Self::Sensor(SensorError::HardwareUnavailable { .. }))
    }
}

/// Result type for node operations
pub type NodeResult<T> = Result<T, NodeError>;
