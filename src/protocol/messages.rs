//! Wire format for motion messages
//!
//! Payload is ASCII `"1"` for motion and `"0"` for no motion. Every motion
//! message is published retained so late subscribers see the last state.

use super::topics::Topic;
use crate::sensor::{MotionSample, PinLevel};

/// Payload published for motion
pub const MOTION_PAYLOAD: &str = "1";
/// Payload published for no motion
pub const NO_MOTION_PAYLOAD: &str = "0";

/// Map a pin level to its wire payload
pub fn motion_payload(level: PinLevel) -> &'static str {
    match level {
        PinLevel::High => MOTION_PAYLOAD,
        PinLevel::Low => NO_MOTION_PAYLOAD,
    }
}

/// Parse a wire payload back into a level (used by subscribers and tests)
pub fn parse_motion_payload(payload: &[u8]) -> Option<PinLevel> {
    match payload {
        b"1" => Some(PinLevel::High),
        b"0" => Some(PinLevel::Low),
        _ => None,
    }
}

/// A publish request for one motion transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionMessage {
    pub topic: String,
    pub payload: &'static str,
    pub retain: bool,
}

impl MotionMessage {
    pub fn from_sample(topic: &Topic, sample: MotionSample) -> Self {
        Self {
            topic: topic.as_str().to_string(),
            payload: motion_payload(sample.level()),
            retain: true,
        }
    }
}
