//! Device telemetry protocol: topics and message types

pub mod messages;
pub mod topics;

pub use messages::*;
pub use topics::*;
