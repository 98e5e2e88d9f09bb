//! Impure I/O operations for MQTT client
//!
//! This module handles all impure I/O operations including network communication,
//! async coordination, and integration with the rumqttc client.

use super::connection::{
    configure_mqtt_options, generate_client_id, ConnectionState, MqttError, ReconnectConfig,
};
use super::health_monitor::{ConnectionEvent, HealthMonitor, ReconnectionDecision};
use super::message_handler::{EventRoute, MessageHandler, SampleForwarder, TELEMETRY_QOS};
use crate::config::MqttSection;
use crate::protocol::messages::TelemetrySample;
use crate::transport::Transport;
use async_trait::async_trait;
use rumqttc::v5::{AsyncClient, ConnectionError, EventLoop};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// How long `disconnect()` waits for the event loop task before aborting it
const EVENT_LOOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// MQTT session toward the broker: connect, subscribe, disconnect
pub struct MqttClient {
    client_id: String,
    client: AsyncClient,
    event_loop: Option<Mutex<EventLoop>>,
    config: MqttSection,
    topics: Vec<String>,
    reconnect_config: ReconnectConfig,
    event_loop_handle: Option<JoinHandle<()>>,
    state_rx: Option<watch::Receiver<ConnectionState>>,
    state_tx: Option<watch::Sender<ConnectionState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    subscribed: Arc<AtomicBool>,
    sample_forwarder: Arc<Mutex<SampleForwarder>>,
    disconnected: bool,
}

/// State owned by the event loop task
struct EventLoopContext {
    client: AsyncClient,
    topics: Vec<String>,
    subscribed: Arc<AtomicBool>,
    sample_forwarder: Arc<Mutex<SampleForwarder>>,
    state_tx: watch::Sender<ConnectionState>,
    reconnect_config: ReconnectConfig,
    reconnect_attempts: u32,
}

impl MqttClient {
    /// Create a client with a fresh time-derived client id
    pub fn new(config: &MqttSection, topics: Vec<String>) -> Result<Self, MqttError> {
        let client_id = generate_client_id(&config.client_id_prefix);
        Self::with_client_id(config, &client_id, topics)
    }

    pub fn with_client_id(
        config: &MqttSection,
        client_id: &str,
        topics: Vec<String>,
    ) -> Result<Self, MqttError> {
        let mqtt_options = configure_mqtt_options(client_id, config)?;
        let (client, event_loop) = AsyncClient::new(mqtt_options, 10);

        Ok(MqttClient {
            client_id: client_id.to_string(),
            client,
            event_loop: Some(Mutex::new(event_loop)),
            config: config.clone(),
            topics,
            reconnect_config: ReconnectConfig::from_section(config),
            event_loop_handle: None,
            state_rx: None,
            state_tx: None,
            shutdown_tx: None,
            subscribed: Arc::new(AtomicBool::new(false)),
            sample_forwarder: Arc::new(Mutex::new(SampleForwarder::new())),
            disconnected: false,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Set the sender that receives every incoming telemetry sample
    pub async fn set_sample_sender(&self, sender: mpsc::Sender<TelemetrySample>) {
        let mut forwarder = self.sample_forwarder.lock().await;
        forwarder.set_sample_sender(sender);
    }

    /// Create connection state and shutdown channels
    #[allow(clippy::type_complexity)]
    fn setup_connection_channels() -> (
        (
            watch::Sender<ConnectionState>,
            watch::Receiver<ConnectionState>,
        ),
        (watch::Sender<bool>, watch::Receiver<bool>),
    ) {
        let state_channels = watch::channel(ConnectionState::Connecting);
        let shutdown_channels = watch::channel(false);
        (state_channels, shutdown_channels)
    }

    /// Wait until the broker acknowledges the connection or the attempt is given up
    async fn wait_for_connection_confirmation(
        mut state_rx: watch::Receiver<ConnectionState>,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        let outcome = tokio::time::timeout(timeout, async {
            loop {
                match &*state_rx.borrow_and_update() {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::PermanentlyDisconnected(reason) => {
                        return Err(MqttError::ConnectionFailed(reason.clone()));
                    }
                    ConnectionState::Connecting
                    | ConnectionState::Disconnected(_)
                    | ConnectionState::Reconnecting(_) => {}
                }

                if state_rx.changed().await.is_err() {
                    return Err(MqttError::ConnectionFailed(
                        "State channel closed".to_string(),
                    ));
                }
            }
        })
        .await;

        match outcome {
            Ok(result) => result,
            Err(_) => Err(MqttError::ConnectionFailed(
                "ConnAck timeout - no connection confirmation received".to_string(),
            )),
        }
    }

    /// Open the session. Succeeds only once the broker's ConnAck arrives.
    ///
    /// With the default configuration a failed attempt is final: the event
    /// loop stops and the state becomes `PermanentlyDisconnected`.
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        let mut event_loop = self
            .event_loop
            .take()
            .ok_or_else(|| {
                MqttError::ConnectionFailed("Event loop already started".to_string())
            })?
            .into_inner();

        let ((state_tx, state_rx), (shutdown_tx, mut shutdown_rx)) =
            Self::setup_connection_channels();
        self.state_rx = Some(state_rx.clone());
        self.state_tx = Some(state_tx.clone());
        self.shutdown_tx = Some(shutdown_tx);

        let mut context = EventLoopContext {
            client: self.client.clone(),
            topics: self.topics.clone(),
            subscribed: self.subscribed.clone(),
            sample_forwarder: self.sample_forwarder.clone(),
            state_tx,
            reconnect_config: self.reconnect_config.clone(),
            reconnect_attempts: 0,
        };
        let client_id = self.client_id.clone();

        info!(
            client_id = %client_id,
            broker_url = %self.config.broker_url,
            "Connecting to MQTT broker"
        );

        let span = crate::mqtt_span!(client_id = %client_id);
        let handle = tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        changed = shutdown_rx.changed() => {
                            if changed.is_err() || *shutdown_rx.borrow() {
                                info!("Shutdown signal received, stopping MQTT event loop");
                                break;
                            }
                        }

                        event_result = event_loop.poll() => {
                            let keep_running = match event_result {
                                Ok(event) => {
                                    let route = MessageHandler::route_mqtt_event(&event);
                                    context.process_event_route(route, &shutdown_rx).await
                                }
                                Err(e) => context.handle_event_loop_error(e, &shutdown_rx).await,
                            };
                            if !keep_running {
                                break;
                            }
                        }
                    }
                }
                info!(client_id = %client_id, "MQTT event loop stopped");
            }
            .instrument(span),
        );

        self.event_loop_handle = Some(handle);

        let timeout = HealthMonitor::calculate_connection_timeout(
            Duration::from_secs(self.config.connect_timeout_secs),
            &self.reconnect_config,
        );
        Self::wait_for_connection_confirmation(state_rx, timeout).await
    }

    /// Subscribe to every telemetry topic at QoS 0. The subscriptions are
    /// re-issued automatically after a reconnect.
    pub async fn subscribe_telemetry(&mut self) -> Result<(), MqttError> {
        let current_state = self
            .connection_state()
            .unwrap_or(ConnectionState::Connecting);
        if !HealthMonitor::can_subscribe(&current_state) {
            return Err(MqttError::NotConnected {
                state: current_state,
            });
        }

        for topic in &self.topics {
            self.client
                .subscribe(topic.as_str(), TELEMETRY_QOS)
                .await
                .map_err(|e| {
                    MqttError::SubscriptionFailed(
                        format!("Failed to subscribe to {topic}: {e}").into(),
                    )
                })?;
            info!(topic = %topic, "Subscribed to telemetry topic");
        }

        self.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Close the session. Safe to call more than once; only the first call
    /// has any effect.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        if self.disconnected {
            debug!("MQTT client already disconnected");
            return Ok(());
        }
        self.disconnected = true;

        let mut result = Ok(());
        if self.is_connected() {
            if let Err(e) = self.client.disconnect().await {
                warn!("Failed to send MQTT disconnect: {}", e);
                result = Err(MqttError::DisconnectFailed(Box::new(e)));
            }
        }

        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        if let Some(state_tx) = &self.state_tx {
            let _ = state_tx.send(ConnectionState::Disconnected(
                "Client disconnected".to_string(),
            ));
        }

        if let Some(handle) = self.event_loop_handle.take() {
            Self::join_event_loop(handle, EVENT_LOOP_JOIN_TIMEOUT).await;
        }

        info!(client_id = %self.client_id, "MQTT client disconnected");
        result
    }

    /// Wait for the event loop task to stop, aborting it after `timeout`
    async fn join_event_loop(handle: JoinHandle<()>, timeout: Duration) {
        let abort_handle = handle.abort_handle();
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => debug!("Event loop task shut down gracefully"),
            Ok(Err(e)) if !e.is_cancelled() => {
                warn!("Event loop task ended with error: {}", e);
            }
            Err(_) => {
                warn!("Event loop task didn't shut down gracefully, forcing abort");
                abort_handle.abort();
            }
            _ => {}
        }
    }

    /// Get current connection state
    /// Returns None if connection hasn't been attempted yet
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.state_rx.as_ref().map(|rx| rx.borrow().clone())
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection_state(), Some(ConnectionState::Connected))
    }
}

impl EventLoopContext {
    fn transition(&self, event: ConnectionEvent) {
        let previous = self.state_tx.borrow().clone();
        let next = HealthMonitor::determine_next_state(event);
        HealthMonitor::log_state_transition(&previous, &next);
        let _ = self.state_tx.send(next);
    }

    /// Process routed MQTT event. Returns true to keep polling.
    async fn process_event_route(
        &mut self,
        route: EventRoute,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> bool {
        match route {
            EventRoute::ConnectionAcknowledged => {
                self.transition(ConnectionEvent::ConnAckReceived);
                self.reconnect_attempts = 0;
                if self.subscribed.load(Ordering::SeqCst) {
                    self.resubscribe().await;
                }
                true
            }
            EventRoute::MessageReceived(sample) => {
                debug!(topic = %sample.topic, payload = %sample.payload, "Received MQTT message");
                let forwarder = self.sample_forwarder.lock().await;
                if let Err(e) = forwarder.forward_sample(sample).await {
                    error!("Failed to forward sample: {}", e);
                }
                true
            }
            EventRoute::Disconnected => {
                self.transition(ConnectionEvent::DisconnectedByBroker);
                self.decide_reconnection(shutdown_rx).await
            }
            EventRoute::SubscriptionConfirmed {
                packet_id,
                return_codes,
            } => {
                match MessageHandler::validate_subscription_success(&return_codes) {
                    Ok(()) => debug!(packet_id, "Subscription confirmed: {:?}", return_codes),
                    Err(e) => warn!(packet_id, "{}", e),
                }
                true
            }
            EventRoute::InfrastructureEvent(event_str) => {
                tracing::debug!(target: "mqtt_transport", "MQTT event: {}", event_str);
                true
            }
            EventRoute::OutgoingEvent => true,
        }
    }

    /// Handle event loop error. Returns true to keep polling, which makes
    /// rumqttc open a new connection.
    async fn handle_event_loop_error(
        &mut self,
        error: ConnectionError,
        shutdown_rx: &watch::Receiver<bool>,
    ) -> bool {
        if *shutdown_rx.borrow() {
            return false;
        }

        self.transition(ConnectionEvent::NetworkError(error.to_string()));
        self.decide_reconnection(shutdown_rx).await
    }

    async fn decide_reconnection(&mut self, shutdown_rx: &watch::Receiver<bool>) -> bool {
        let decision = HealthMonitor::should_attempt_reconnection(
            self.reconnect_attempts,
            &self.reconnect_config,
            *shutdown_rx.borrow(),
        );

        match decision {
            ReconnectionDecision::Proceed { attempt, delay_ms } => {
                self.reconnect_attempts = attempt;
                self.transition(ConnectionEvent::ReconnectionStarted(attempt));
                info!(
                    "Attempting reconnection {}/{} after {}ms delay",
                    attempt, self.reconnect_config.max_attempts, delay_ms
                );
                interruptible_sleep(shutdown_rx.clone(), delay_ms).await
            }
            ReconnectionDecision::AbortShutdownRequested => false,
            ReconnectionDecision::AbortMaxAttemptsExceeded => {
                let reason = if self.reconnect_config.retries_enabled() {
                    format!(
                        "Max reconnection attempts ({}) exceeded",
                        self.reconnect_config.max_attempts
                    )
                } else {
                    "Reconnection disabled".to_string()
                };
                self.transition(ConnectionEvent::PermanentFailure(reason));
                false
            }
        }
    }

    /// Re-issue subscriptions; a clean session forgets them on every connect
    async fn resubscribe(&self) {
        for topic in &self.topics {
            if let Err(e) = self.client.subscribe(topic.as_str(), TELEMETRY_QOS).await {
                error!("Failed to re-subscribe to {}: {}", topic, e);
            } else {
                tracing::debug!(target: "mqtt_transport", "Re-subscribed to: {}", topic);
            }
        }
    }
}

/// Perform interruptible sleep with shutdown monitoring
/// Returns true if sleep completed, false if shutdown requested
async fn interruptible_sleep(mut shutdown_rx: watch::Receiver<bool>, delay_ms: u64) -> bool {
    tokio::select! {
        changed = shutdown_rx.changed() => {
            if changed.is_err() || *shutdown_rx.borrow() {
                info!("Shutdown signal received during reconnection delay, stopping");
                return false;
            }
            true
        }
        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => true,
    }
}

#[async_trait]
impl Transport for MqttClient {
    type Error = MqttError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        MqttClient::connect(self).await
    }

    async fn subscribe_telemetry(&mut self) -> Result<(), Self::Error> {
        MqttClient::subscribe_telemetry(self).await
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        MqttClient::disconnect(self).await
    }

    fn is_connected(&self) -> bool {
        MqttClient::is_connected(self)
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        MqttClient::connection_state(self)
    }

    async fn set_sample_sender(&self, sender: mpsc::Sender<TelemetrySample>) {
        MqttClient::set_sample_sender(self, sender).await
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Signal shutdown to background tasks if they're still running
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }

        if let Some(handle) = self.event_loop_handle.take() {
            handle.abort();
        }
    }
}
