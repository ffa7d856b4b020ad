//! Digital input driver abstraction
//!
//! A backend claims a single GPIO pin as an edge-triggered input. Only
//! rising-edge delivery is required: the callback reads the level itself to
//! tell which way the signal moved.

use super::level::PinLevel;
use super::SensorError;

/// Callback invoked by the runtime on every rising edge
pub type EdgeCallback = Box<dyn FnMut() + Send + 'static>;

/// Pull resistor direction for an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullMode {
    /// Idle reads `Low`
    Down,
    /// Idle reads `High`
    Up,
}

/// A claimed GPIO input pin
pub trait DigitalInput: Send + Sync + 'static {
    /// Pin identifier this input was configured on
    fn pin(&self) -> u8;

    /// Read the instantaneous level
    fn read(&self) -> Result<PinLevel, SensorError>;

    /// Arm interrupt delivery; `callback` runs on every low-to-high transition
    fn register_rising_edge_callback(&self, callback: EdgeCallback) -> Result<(), SensorError>;

    /// Disarm interrupt delivery. Once this returns the callback is not
    /// running and will not run again.
    fn clear_rising_edge_callback(&self) -> Result<(), SensorError>;
}

/// Source of GPIO inputs (one per platform)
pub trait GpioBackend: Send + Sync {
    type Input: DigitalInput;

    /// Claim `pin` as an input with the given pull resistor
    fn configure(&self, pin: u8, pull: PullMode) -> Result<Self::Input, SensorError>;
}

/// Backend for builds without GPIO support.
///
/// Every `configure` fails so startup aborts with a clear diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedGpio;

/// Input type of [`UnsupportedGpio`]; never constructed.
#[derive(Debug)]
pub enum NoInput {}

impl DigitalInput for NoInput {
    fn pin(&self) -> u8 {
        match *self {}
    }

    fn read(&self) -> Result<PinLevel, SensorError> {
        match *self {}
    }

    fn register_rising_edge_callback(&self, _callback: EdgeCallback) -> Result<(), SensorError> {
        match *self {}
    }

    fn clear_rising_edge_callback(&self) -> Result<(), SensorError> {
        match *self {}
    }
}

impl GpioBackend for UnsupportedGpio {
    type Input = NoInput;

    fn configure(&self, pin: u8, _pull: PullMode) -> Result<Self::Input, SensorError> {
        Err(SensorError::hardware_unavailable(format!(
            "cannot claim GPIO {pin}: built without the `rpi` feature"
        )))
    }
}
