//! Pure message routing and processing logic for MQTT events
//!
//! This module turns raw rumqttc events into routing decisions and forwards
//! telemetry samples to the single dispatch consumer.

use crate::protocol::messages::TelemetrySample;
use rumqttc::v5::mqttbytes::v5::{Packet, SubscribeReasonCode};
use rumqttc::v5::{mqttbytes::QoS, Event};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Telemetry is delivered at most once
pub const TELEMETRY_QOS: QoS = QoS::AtMostOnce;

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::Publish(publish) => EventRoute::MessageReceived(
                    TelemetrySample::from_bytes(&publish.topic, &publish.payload),
                ),
                Packet::Disconnect(_) => EventRoute::Disconnected,
                Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                    packet_id: suback.pkid,
                    return_codes: suback
                        .return_codes
                        .iter()
                        .map(|code| match code {
                            SubscribeReasonCode::Success(qos) => *qos as u8,
                            _ => 0x80,
                        })
                        .collect(),
                },
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Validate subscription success from SubAck (pure function)
    pub fn validate_subscription_success(return_codes: &[u8]) -> Result<(), String> {
        if return_codes.iter().any(|&code| code >= 0x80) {
            Err(format!(
                "Subscription failed with return codes: {return_codes:?}"
            ))
        } else {
            Ok(())
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone)]
pub enum EventRoute {
    /// Connection acknowledged - ready to subscribe
    ConnectionAcknowledged,
    /// Message received on a subscribed topic
    MessageReceived(TelemetrySample),
    /// MQTT broker disconnected
    Disconnected,
    /// Subscription confirmed with return codes
    SubscriptionConfirmed {
        packet_id: u16,
        return_codes: Vec<u8>,
    },
    /// Infrastructure event (PingResp, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}

/// Hands received samples to the dispatch loop (impure I/O)
#[derive(Default)]
pub struct SampleForwarder {
    sample_sender: Option<mpsc::Sender<TelemetrySample>>,
}

impl SampleForwarder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sample_sender(&mut self, sender: mpsc::Sender<TelemetrySample>) {
        self.sample_sender = Some(sender);
    }

    /// Forward a sample, waiting for queue space so delivery order is kept
    pub async fn forward_sample(&self, sample: TelemetrySample) -> Result<(), String> {
        let Some(sender) = &self.sample_sender else {
            warn!(topic = %sample.topic, "Received MQTT message but no sample sender configured - message dropped");
            return Err("No sample sender configured".to_string());
        };

        debug!(topic = %sample.topic, "Forwarding sample to dispatch loop");
        sender
            .send(sample)
            .await
            .map_err(|e| format!("Failed to forward sample to dispatch loop: {e}"))
    }
}
