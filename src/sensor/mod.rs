//! PIR sensor pipeline: GPIO input, debounced event queue and the motion driver
//!
//! Data flows one way:
//!
//! ```text
//! GPIO pin level -> rising-edge callback -> EdgeSampler -> EventQueue -> wait_for_event()
//! ```
//!
//! # Architecture
//!
//! - [`level`] - Pin levels and the samples carried through the queue
//! - [`input`] - Digital input driver traits and the unsupported-platform backend
//! - [`queue`] - Unbounded FIFO between the interrupt context and the main loop
//! - [`driver`] - Level-change debouncing and the consumer operations
//! - `rpi` - Raspberry Pi backend (cargo feature `rpi`)

pub mod driver;
pub mod input;
pub mod level;
pub mod queue;
#[cfg(feature = "rpi")]
pub mod rpi;

use thiserror::Error;

pub use driver::{EdgeSampler, MotionSensor};
pub use input::{DigitalInput, EdgeCallback, GpioBackend, PullMode, UnsupportedGpio};
pub use level::{MotionSample, PinLevel};
pub use queue::{EventQueue, QueueConsumer, QueueProducer};
#[cfg(feature = "rpi")]
pub use rpi::{RppalGpio, RppalInput};

/// Errors raised by the sensor pipeline
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("GPIO hardware unavailable: {message}")]
    HardwareUnavailable { message: String },

    #[error("No motion event pending")]
    QueueEmpty,

    #[error("Motion sensor already enabled")]
    AlreadyEnabled,

    #[error("Motion event source closed")]
    EventSourceClosed,
}

impl SensorError {
    /// Create hardware unavailable error
    pub fn hardware_unavailable<S: Into<String>>(message: S) -> Self {
        Self::HardwareUnavailable {
            message: message.into(),
        }
    }
}
