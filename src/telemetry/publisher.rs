//! Fan-out of status snapshots to registered observers
//!
//! Delivery is fire-and-forget: the engine never waits on an observer. The
//! channel-backed observer keeps snapshots in publish order and drops a
//! snapshot when its queue is full or its receiver is gone.

use crate::protocol::messages::StatusSnapshot;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;

/// Receiver of status snapshots. Implementations must return promptly.
pub trait StatusObserver: Send + Sync {
    fn on_status(&self, snapshot: &StatusSnapshot);
}

/// Observer that forwards snapshots into a bounded mpsc channel
pub struct ChannelObserver {
    sender: mpsc::Sender<StatusSnapshot>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<StatusSnapshot>) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end of its queue
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StatusSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl StatusObserver for ChannelObserver {
    fn on_status(&self, snapshot: &StatusSnapshot) {
        match self.sender.try_send(*snapshot) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!("Status observer queue full, snapshot dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Status observer gone, snapshot dropped");
            }
        }
    }
}

#[derive(Default)]
pub struct StatusPublisher {
    observers: Vec<Box<dyn StatusObserver>>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    pub fn publish(&self, snapshot: &StatusSnapshot) {
        let event = snapshot.to_event();
        debug!(
            alarm = event.alarm,
            proximity = event.proximity,
            signal_strength = event.signal_strength,
            observers = self.observers.len(),
            "Publishing status snapshot"
        );

        for observer in &self.observers {
            observer.on_status(snapshot);
        }
    }
}
