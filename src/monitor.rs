//! Monitor lifecycle
//!
//! Wires a [`Transport`] to the [`ReconciliationEngine`]. Samples delivered by
//! the transport are queued on a bounded channel and processed one at a time
//! by [`Monitor::run`], so engine state has a single writer.

use crate::error::{MonitorError, MonitorResult};
use crate::protocol::messages::{StatusSnapshot, TelemetrySample};
use crate::telemetry::engine::ReconciliationEngine;
use crate::telemetry::publisher::StatusObserver;
use crate::transport::Transport;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn, Instrument};

/// Samples waiting for the dispatch loop
pub const SAMPLE_QUEUE_CAPACITY: usize = 100;

/// Monitor lifecycle management with dependency injection
pub struct Monitor<T>
where
    T: Transport,
{
    transport: T,
    engine: ReconciliationEngine,
    sample_tx: mpsc::Sender<TelemetrySample>,
    sample_rx: Option<mpsc::Receiver<TelemetrySample>>,
    stopped: bool,
}

impl<T> Monitor<T>
where
    T: Transport,
{
    pub fn new(transport: T, engine: ReconciliationEngine) -> Self {
        let (sample_tx, sample_rx) = Self::create_sample_channel();
        Self {
            transport,
            engine,
            sample_tx,
            sample_rx: Some(sample_rx),
            stopped: false,
        }
    }

    fn create_sample_channel() -> (
        mpsc::Sender<TelemetrySample>,
        mpsc::Receiver<TelemetrySample>,
    ) {
        mpsc::channel(SAMPLE_QUEUE_CAPACITY)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.engine.snapshot()
    }

    pub fn register_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.engine.register_observer(observer);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Make one connection attempt and subscribe to the telemetry topics.
    ///
    /// A failed attempt is logged and the monitor keeps running with unknown
    /// device state; nothing is retried here.
    pub async fn start(&mut self) -> MonitorResult<()> {
        if self.stopped {
            return Err(MonitorError::internal_error("monitor already stopped"));
        }

        info!("Background protection enabled");

        self.transport
            .set_sample_sender(self.sample_tx.clone())
            .await;

        let connect = self
            .transport
            .connect()
            .instrument(crate::lifecycle_span!(event = "connect"));
        if let Err(e) = connect.await {
            error!(error = %e, "Could not connect to MQTT broker, device state stays unknown");
            return Ok(());
        }

        match self.transport.subscribe_telemetry().await {
            Ok(()) => info!(
                topics = ?self.engine.subscription_topics(),
                "Subscribed to telemetry"
            ),
            Err(e) => error!(error = %e, "Failed to subscribe to telemetry topics"),
        }

        Ok(())
    }

    /// Dispatch samples to the engine until `shutdown` flips to true, then
    /// shut down.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> MonitorResult<()> {
        let mut sample_rx = self
            .sample_rx
            .take()
            .ok_or_else(|| MonitorError::internal_error("dispatch loop already ran"))?;

        debug!("Dispatch loop started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, stopping dispatch loop");
                        break;
                    }
                }

                sample = sample_rx.recv() => {
                    match sample {
                        Some(sample) => {
                            if self.engine.process(&sample).is_none() {
                                debug!(topic = %sample.topic, "Ignored sample on unrouted topic");
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        self.shutdown().await
    }

    /// Close the transport. Only the first call disconnects; a failed
    /// disconnect still leaves the monitor stopped.
    pub async fn shutdown(&mut self) -> MonitorResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        let result = self.transport.disconnect().await;
        info!("Monitor stopped");

        result.map_err(|e| {
            warn!(error = %e, "Error while disconnecting from MQTT broker");
            MonitorError::transport(e)
        })
    }
}
