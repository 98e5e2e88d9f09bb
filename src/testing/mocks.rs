//! Mock implementations for testing
//!
//! Provides a mock Transport plus recording notifier and observer. Every mock
//! is cheaply cloneable and clones share their recorded history, so a test
//! can keep a handle after moving the mock into the code under test.

use crate::notify::{AlertNotifier, NotificationError};
use crate::protocol::messages::{AlertEvent, AlertKind, StatusSnapshot, TelemetrySample};
use crate::telemetry::publisher::StatusObserver;
use crate::transport::mqtt::{ConnectionState, MqttError};
use crate::transport::Transport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Mutex};

fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock transport for testing
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    pub connect_calls: Arc<AtomicUsize>,
    pub subscribe_calls: Arc<AtomicUsize>,
    pub disconnect_calls: Arc<AtomicUsize>,
    pub connected: Arc<AtomicBool>,
    pub should_fail: bool,
    pub fail_disconnect: bool,
    pub sample_sender: Arc<Mutex<Option<mpsc::Sender<TelemetrySample>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose broker is unreachable
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Transport whose DISCONNECT cannot be sent
    pub fn with_disconnect_failure() -> Self {
        Self {
            fail_disconnect: true,
            ..Default::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Deliver a sample as if it arrived from the broker
    pub async fn inject(&self, topic: &str, payload: &str) -> bool {
        let sender = self.sample_sender.lock().await.clone();
        match sender {
            Some(sender) => sender
                .send(TelemetrySample::new(topic, payload))
                .await
                .is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(MqttError::ConnectionFailed(
                "Mock connection failure".to_string(),
            ));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe_telemetry(&mut self) -> Result<(), Self::Error> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MqttError::NotConnected {
                state: ConnectionState::Disconnected("Mock not connected".to_string()),
            });
        }
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if self.fail_disconnect {
            return Err(MqttError::DisconnectFailed(
                "Mock disconnect failure".into(),
            ));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        if self.is_connected() {
            Some(ConnectionState::Connected)
        } else {
            None
        }
    }

    async fn set_sample_sender(&self, sender: mpsc::Sender<TelemetrySample>) {
        *self.sample_sender.lock().await = Some(sender);
    }
}

/// Notifier that records every alert it is asked to show
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    alerts: Arc<std::sync::Mutex<Vec<AlertEvent>>>,
    deny: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier without display permission: records nothing
    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    pub fn alerts(&self) -> Vec<AlertEvent> {
        lock(&self.alerts).clone()
    }

    pub fn kinds(&self) -> Vec<AlertKind> {
        lock(&self.alerts).iter().map(|alert| alert.kind).collect()
    }
}

impl AlertNotifier for RecordingNotifier {
    fn notify(&self, alert: &AlertEvent) -> Result<(), NotificationError> {
        if self.deny {
            return Err(NotificationError::PermissionDenied);
        }
        lock(&self.alerts).push(alert.clone());
        Ok(())
    }
}

/// Observer that records every published snapshot
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    snapshots: Arc<std::sync::Mutex<Vec<StatusSnapshot>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<StatusSnapshot> {
        lock(&self.snapshots).clone()
    }

    pub fn last(&self) -> Option<StatusSnapshot> {
        lock(&self.snapshots).last().copied()
    }
}

impl StatusObserver for RecordingObserver {
    fn on_status(&self, snapshot: &StatusSnapshot) {
        lock(&self.snapshots).push(*snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_lifecycle() {
        let mut transport = MockTransport::new();
        let handle = transport.clone();

        assert!(transport.subscribe_telemetry().await.is_err());
        transport.connect().await.unwrap();
        transport.subscribe_telemetry().await.unwrap();
        assert!(handle.is_connected());

        transport.disconnect().await.unwrap();
        assert!(!handle.is_connected());
        assert_eq!(handle.connect_count(), 1);
        assert_eq!(handle.subscribe_count(), 1);
        assert_eq!(handle.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_transport_inject() {
        let transport = MockTransport::new();
        assert!(!transport.inject("t", "1").await);

        let (tx, mut rx) = mpsc::channel(1);
        transport.set_sample_sender(tx).await;
        assert!(transport.inject("t", "1").await);
        assert_eq!(rx.recv().await.unwrap().payload, "1");
    }

    #[test]
    fn test_denying_notifier_records_nothing() {
        let notifier = RecordingNotifier::denying();
        let result = notifier.notify(&AlertKind::SmokeDetected.into());
        assert_eq!(result, Err(NotificationError::PermissionDenied));
        assert!(notifier.alerts().is_empty());
    }
}
