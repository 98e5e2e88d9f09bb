//! Top-level error types for the monitor

use thiserror::Error;

/// Main error type for monitor operations
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Transport error: {0}")]
    TransportError(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl MonitorError {
    /// Wrap any transport error
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::TransportError(Box::new(error))
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Result type for monitor operations
pub type MonitorResult<T> = Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn test_internal_error_constructor() {
        let error = MonitorError::internal_error("dispatch loop already running");
        assert!(matches!(error, MonitorError::InternalError { .. }));
        assert_eq!(
            error.to_string(),
            "Internal error: dispatch loop already running"
        );
    }

    #[test]
    fn test_transport_error_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = MonitorError::transport(io);
        assert!(error.to_string().contains("refused"));
    }

    #[test]
    fn test_config_error_conversion() {
        let error: MonitorError = ConfigError::InvalidDeviceId("bad id".to_string()).into();
        assert!(matches!(error, MonitorError::ConfigError(_)));
        assert!(error.to_string().starts_with("Configuration error"));
    }
}
