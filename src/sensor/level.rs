//! Pin levels and motion samples

use std::fmt;

/// Instantaneous logical state of the PIR output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PinLevel {
    /// No motion (idle state with the pull-down resistor)
    #[default]
    Low,
    /// Motion detected
    High,
}

impl PinLevel {
    pub fn is_high(self) -> bool {
        matches!(self, PinLevel::High)
    }
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

impl fmt::Display for PinLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinLevel::Low => f.write_str("low"),
            PinLevel::High => f.write_str("high"),
        }
    }
}

/// A single level captured at interrupt time.
///
/// Produced by the edge callback and consumed exactly once by the
/// publication loop; the queue owns it in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSample {
    level: PinLevel,
}

impl MotionSample {
    pub fn new(level: PinLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> PinLevel {
        self.level
    }
}
