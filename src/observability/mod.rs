//! Observability for the monitor: structured logging and span macros

pub mod logging;

pub use logging::{init_default_logging, init_logging, LogFormat, LoggingSettings};

// Span macros for structured logging
pub use logging::{lifecycle_span, mqtt_span, telemetry_span};
