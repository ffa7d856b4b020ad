//! Observability for the motion node
//!
//! Structured logging through `tracing`, configured from the environment and
//! the CLI verbosity flag.

pub mod logging;

pub use logging::{init_default_logging, init_logging, parse_level, LogFormat, LogSettings};

// Span macros for structured logging
pub use logging::{mqtt_span, sensor_span};
