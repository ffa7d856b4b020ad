//! Topics and wire payloads published by the motion node

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::*;
