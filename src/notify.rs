//! Notification collaborator
//!
//! Alerts are handed over as (title, body, id). When the user has not granted
//! notification permission the alert is suppressed; this is reported as
//! [`NotificationError::PermissionDenied`] and never treated as fatal.

use crate::protocol::messages::AlertEvent;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum NotificationError {
    #[error("Notification permission not granted")]
    PermissionDenied,
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
}

pub trait AlertNotifier: Send + Sync {
    fn notify(&self, alert: &AlertEvent) -> Result<(), NotificationError>;
}

/// Notifier that surfaces alerts as warn-level log records
#[derive(Debug, Clone)]
pub struct LogNotifier {
    permission_granted: bool,
}

impl LogNotifier {
    pub fn new(permission_granted: bool) -> Self {
        Self { permission_granted }
    }
}

impl AlertNotifier for LogNotifier {
    fn notify(&self, alert: &AlertEvent) -> Result<(), NotificationError> {
        if !self.permission_granted {
            return Err(NotificationError::PermissionDenied);
        }

        warn!(
            notification_id = alert.notification_id,
            kind = ?alert.kind,
            title = %alert.title,
            "{}",
            alert.message
        );
        Ok(())
    }
}
