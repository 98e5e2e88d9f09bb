//! Exact-match topic dispatch
//!
//! Maps each subscribed topic to the channel whose parsing pipeline handles
//! it. Topics without a route are dropped silently.

use crate::config::TopicsSection;
use crate::protocol::topics::TelemetryChannel;
use crate::telemetry::alert::ProximityMode;
use crate::telemetry::codec::PayloadCodec;
use std::collections::HashMap;
use tracing::debug;

/// A payload decoded by the pipeline of its channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutedValue {
    pub channel: TelemetryChannel,
    pub value: i32,
}

#[derive(Debug, Default, Clone)]
pub struct TopicRouter {
    routes: HashMap<String, TelemetryChannel>,
}

impl TopicRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routing table for the configured topics. The `braceletNear` topic is
    /// only routed in direct proximity mode.
    pub fn from_topics(topics: &TopicsSection, mode: ProximityMode) -> Self {
        let mut router = Self::new();
        router.register(&topics.alarm_smoke, TelemetryChannel::AlarmSmoke);
        router.register(&topics.rssi, TelemetryChannel::SignalStrength);
        if mode == ProximityMode::Direct {
            router.register(&topics.bracelet_near, TelemetryChannel::BraceletNear);
        }
        router
    }

    pub fn register(&mut self, topic: &str, channel: TelemetryChannel) {
        self.routes.insert(topic.to_string(), channel);
    }

    pub fn channel_for(&self, topic: &str) -> Option<TelemetryChannel> {
        self.routes.get(topic).copied()
    }

    /// Routed topics in a stable order, used as the subscription set
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.routes.keys().cloned().collect();
        topics.sort();
        topics
    }

    /// Decode `payload` with the pipeline registered for `topic`
    pub fn dispatch(&self, topic: &str, payload: &str) -> Option<RoutedValue> {
        let Some(channel) = self.channel_for(topic) else {
            debug!(topic = %topic, "No handler for topic, message dropped");
            return None;
        };

        let value = PayloadCodec::parse_integer(payload, channel.parse_fallback());
        Some(RoutedValue { channel, value })
    }
}
