//! Raspberry Pi GPIO backend (BCM pin numbering)

use super::input::{DigitalInput, EdgeCallback, GpioBackend, PullMode};
use super::level::PinLevel;
use super::SensorError;
use rppal::gpio::{Event, Gpio, InputPin, Level, Trigger};
use std::sync::{Mutex, TryLockError};
use tracing::debug;

/// GPIO backend backed by `/dev/gpiomem`
#[derive(Debug, Default, Clone, Copy)]
pub struct RppalGpio;

impl GpioBackend for RppalGpio {
    type Input = RppalInput;

    fn configure(&self, pin: u8, pull: PullMode) -> Result<Self::Input, SensorError> {
        let gpio = Gpio::new().map_err(|e| {
            SensorError::hardware_unavailable(format!("GPIO subsystem init failed: {e}"))
        })?;
        let raw = gpio
            .get(pin)
            .map_err(|e| SensorError::hardware_unavailable(format!("cannot claim GPIO {pin}: {e}")))?;

        let input = match pull {
            PullMode::Down => raw.into_input_pulldown(),
            PullMode::Up => raw.into_input_pullup(),
        };
        debug!(pin, ?pull, "GPIO configured as input");

        Ok(RppalInput {
            pin,
            inner: Mutex::new(input),
        })
    }
}

/// Claimed input pin.
///
/// Reads only `try_lock`: disarming holds the lock while rppal joins its
/// interrupt thread, and a callback blocked on the same lock would never
/// finish.
pub struct RppalInput {
    pin: u8,
    inner: Mutex<InputPin>,
}

impl DigitalInput for RppalInput {
    fn pin(&self) -> u8 {
        self.pin
    }

    fn read(&self) -> Result<PinLevel, SensorError> {
        let input = match self.inner.try_lock() {
            Ok(input) => input,
            Err(TryLockError::WouldBlock) => {
                return Err(SensorError::hardware_unavailable("GPIO pin busy"))
            }
            Err(TryLockError::Poisoned(_)) => {
                return Err(SensorError::hardware_unavailable("GPIO pin lock poisoned"))
            }
        };
        Ok(match input.read() {
            Level::High => PinLevel::High,
            Level::Low => PinLevel::Low,
        })
    }

    fn register_rising_edge_callback(&self, callback: EdgeCallback) -> Result<(), SensorError> {
        let mut input = self
            .inner
            .lock()
            .map_err(|_| SensorError::hardware_unavailable("GPIO pin lock poisoned"))?;
        let mut callback = callback;
        input
            .set_async_interrupt(Trigger::RisingEdge, None, move |_event: Event| callback())
            .map_err(|e| {
                SensorError::hardware_unavailable(format!(
                    "cannot arm interrupt on GPIO {}: {e}",
                    self.pin
                ))
            })
    }

    fn clear_rising_edge_callback(&self) -> Result<(), SensorError> {
        let mut input = self
            .inner
            .lock()
            .map_err(|_| SensorError::hardware_unavailable("GPIO pin lock poisoned"))?;
        input.clear_async_interrupt().map_err(|e| {
            SensorError::hardware_unavailable(format!(
                "cannot disarm interrupt on GPIO {}: {e}",
                self.pin
            ))
        })
    }
}
