//! Reconciliation engine
//!
//! Single owner and only writer of the device state. Each routed sample is
//! decoded, evaluated against the stored state, recorded, and followed by a
//! status publish. Samples on unrouted topics change nothing.

use crate::config::MonitorConfig;
use crate::notify::{AlertNotifier, NotificationError};
use crate::protocol::messages::{AlertEvent, StatusSnapshot, TelemetrySample};
use crate::protocol::topics::TelemetryChannel;
use crate::telemetry::alert::{AlertEvaluator, ProximityMode};
use crate::telemetry::distance::DistanceEstimator;
use crate::telemetry::publisher::{StatusObserver, StatusPublisher};
use crate::telemetry::router::{RoutedValue, TopicRouter};
use crate::telemetry::state::{DeviceState, DeviceStateStore};
use tracing::{debug, warn};

/// Result of one processed sample
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    pub channel: TelemetryChannel,
    pub alerts: Vec<AlertEvent>,
    pub snapshot: StatusSnapshot,
}

pub struct ReconciliationEngine {
    router: TopicRouter,
    evaluator: AlertEvaluator,
    estimator: DistanceEstimator,
    proximity_mode: ProximityMode,
    store: DeviceStateStore,
    publisher: StatusPublisher,
    notifier: Box<dyn AlertNotifier>,
}

impl ReconciliationEngine {
    pub fn new(config: &MonitorConfig, notifier: Box<dyn AlertNotifier>) -> Self {
        Self {
            router: TopicRouter::from_topics(&config.topics, config.proximity.mode),
            evaluator: AlertEvaluator::new(config.proximity.rssi_threshold),
            estimator: config.distance.estimator(),
            proximity_mode: config.proximity.mode,
            store: DeviceStateStore::new(),
            publisher: StatusPublisher::new(),
            notifier,
        }
    }

    pub fn register_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.publisher.register(observer);
    }

    pub fn state(&self) -> &DeviceState {
        self.store.state()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.store.snapshot()
    }

    /// Topics that have a handler; this is the subscription set
    pub fn subscription_topics(&self) -> Vec<String> {
        self.router.topics()
    }

    /// Process one sample. Returns `None` when the topic has no handler.
    pub fn process(&mut self, sample: &TelemetrySample) -> Option<ProcessOutcome> {
        let _span = crate::telemetry_span!(topic = %sample.topic).entered();
        debug!(payload = %sample.payload, received_at = %sample.received_at, "Message received");

        let routed = self.router.dispatch(&sample.topic, &sample.payload)?;
        let alerts = self.apply(routed);

        for alert in &alerts {
            self.deliver_alert(alert);
        }

        let snapshot = self.store.snapshot();
        self.publisher.publish(&snapshot);

        Some(ProcessOutcome {
            channel: routed.channel,
            alerts,
            snapshot,
        })
    }

    fn apply(&mut self, routed: RoutedValue) -> Vec<AlertEvent> {
        let mut alerts = Vec::new();

        match routed.channel {
            TelemetryChannel::AlarmSmoke => {
                let decision = self
                    .evaluator
                    .evaluate_alarm(self.store.state().alarm_active, routed.value);
                self.store.record_alarm(decision.next);
                alerts.extend(decision.alert);
            }
            TelemetryChannel::SignalStrength => {
                if !DistanceEstimator::is_measurable(routed.value) {
                    debug!(
                        signal_strength = routed.value,
                        "No usable signal strength, state unchanged"
                    );
                    return alerts;
                }

                let distance_m = self.estimator.estimate(routed.value);
                self.store.record_signal(routed.value, distance_m);
                debug!(signal_strength = routed.value, distance_m, "Distance updated");

                if self.proximity_mode == ProximityMode::Derived {
                    let near = self.evaluator.classify_proximity(routed.value);
                    alerts.extend(self.update_proximity(near));
                }
            }
            TelemetryChannel::BraceletNear => {
                alerts.extend(self.update_proximity(routed.value == 1));
            }
        }

        alerts
    }

    fn update_proximity(&mut self, near: bool) -> Option<AlertEvent> {
        let decision = self
            .evaluator
            .evaluate_proximity(self.store.state().proximity_near, near);
        self.store.record_proximity(decision.next);
        decision.alert
    }

    fn deliver_alert(&self, alert: &AlertEvent) {
        warn!(kind = ?alert.kind, "Alert raised: {}", alert.title);

        match self.notifier.notify(alert) {
            Ok(()) => {}
            Err(NotificationError::PermissionDenied) => {
                debug!(kind = ?alert.kind, "Notification permission not granted, alert not shown");
            }
            Err(e) => {
                warn!(kind = ?alert.kind, error = %e, "Failed to deliver alert notification");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::AlertKind;
    use crate::protocol::topics::{ALARM_SMOKE_TOPIC, BRACELET_NEAR_TOPIC, RSSI_TOPIC};
    use crate::telemetry::state::Observed;
    use crate::testing::mocks::{RecordingNotifier, RecordingObserver};

    fn engine_with(config: &MonitorConfig) -> (ReconciliationEngine, RecordingNotifier) {
        let notifier = RecordingNotifier::new();
        let engine = ReconciliationEngine::new(config, Box::new(notifier.clone()));
        (engine, notifier)
    }

    fn kinds(outcome: &ProcessOutcome) -> Vec<AlertKind> {
        outcome.alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_repeated_alarm_alerts_once() {
        let (mut engine, notifier) = engine_with(&MonitorConfig::default());

        engine.process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "1"));
        engine.process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "1"));

        assert_eq!(notifier.kinds(), vec![AlertKind::SmokeDetected]);
    }

    #[test]
    fn test_alarm_rearms_after_clear() {
        let (mut engine, notifier) = engine_with(&MonitorConfig::default());

        for payload in ["1", "0", "1"] {
            engine.process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, payload));
        }

        assert_eq!(
            notifier.kinds(),
            vec![AlertKind::SmokeDetected, AlertKind::SmokeDetected]
        );
    }

    #[test]
    fn test_malformed_alarm_is_normal() {
        let (mut engine, notifier) = engine_with(&MonitorConfig::default());

        let outcome = engine
            .process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "ALARM"))
            .unwrap();

        assert!(outcome.alerts.is_empty());
        assert_eq!(engine.state().alarm_active, Observed::Known(false));
        assert!(notifier.kinds().is_empty());
    }

    #[test]
    fn test_malformed_rssi_keeps_last_known_values() {
        let (mut engine, _notifier) = engine_with(&MonitorConfig::default());

        engine.process(&TelemetrySample::new(RSSI_TOPIC, "-45"));
        let outcome = engine
            .process(&TelemetrySample::new(RSSI_TOPIC, "weak"))
            .unwrap();

        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.snapshot.signal_strength, Observed::Known(-45));
        assert_eq!(outcome.snapshot.proximity_near, Observed::Known(true));
    }

    #[test]
    fn test_malformed_rssi_before_any_reading_stays_unknown() {
        let (mut engine, _notifier) = engine_with(&MonitorConfig::default());

        let outcome = engine
            .process(&TelemetrySample::new(RSSI_TOPIC, ""))
            .unwrap();

        assert_eq!(outcome.snapshot.signal_strength, Observed::Unknown);
        assert_eq!(outcome.snapshot.distance_m, Observed::Unknown);
        assert_eq!(outcome.snapshot.to_event().signal_strength, -1);
    }

    #[test]
    fn test_unknown_topic_changes_nothing() {
        let (mut engine, notifier) = engine_with(&MonitorConfig::default());
        let observer = RecordingObserver::new();
        engine.register_observer(Box::new(observer.clone()));

        assert!(engine
            .process(&TelemetrySample::new("tics/grupo1/esp32/tele/temp", "1"))
            .is_none());

        assert_eq!(*engine.state(), DeviceState::default());
        assert!(observer.snapshots().is_empty());
        assert!(notifier.kinds().is_empty());
    }

    #[test]
    fn test_every_routed_sample_publishes() {
        let (mut engine, _notifier) = engine_with(&MonitorConfig::default());
        let observer = RecordingObserver::new();
        engine.register_observer(Box::new(observer.clone()));

        engine.process(&TelemetrySample::new(RSSI_TOPIC, "-45"));
        engine.process(&TelemetrySample::new(RSSI_TOPIC, "-45"));
        engine.process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "0"));

        assert_eq!(observer.snapshots().len(), 3);
    }

    #[test]
    fn test_first_far_reading_alerts() {
        let (mut engine, _notifier) = engine_with(&MonitorConfig::default());

        let outcome = engine
            .process(&TelemetrySample::new(RSSI_TOPIC, "-80"))
            .unwrap();
        assert_eq!(kinds(&outcome), vec![AlertKind::ProximityLost]);

        let outcome = engine
            .process(&TelemetrySample::new(RSSI_TOPIC, "-85"))
            .unwrap();
        assert!(outcome.alerts.is_empty());
    }

    #[test]
    fn test_derived_mode_ignores_bracelet_topic() {
        let (mut engine, _notifier) = engine_with(&MonitorConfig::default());
        assert!(engine
            .process(&TelemetrySample::new(BRACELET_NEAR_TOPIC, "0"))
            .is_none());
        assert_eq!(engine.state().proximity_near, Observed::Unknown);
    }

    #[test]
    fn test_direct_mode_uses_bracelet_flag_only() {
        let mut config = MonitorConfig::default();
        config.proximity.mode = ProximityMode::Direct;
        let (mut engine, notifier) = engine_with(&config);

        engine.process(&TelemetrySample::new(BRACELET_NEAR_TOPIC, "1"));
        let outcome = engine
            .process(&TelemetrySample::new(RSSI_TOPIC, "-90"))
            .unwrap();
        // A weak signal does not drive proximity in direct mode
        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.snapshot.proximity_near, Observed::Known(true));
        assert_eq!(outcome.snapshot.signal_strength, Observed::Known(-90));

        let outcome = engine
            .process(&TelemetrySample::new(BRACELET_NEAR_TOPIC, "0"))
            .unwrap();
        assert_eq!(kinds(&outcome), vec![AlertKind::ProximityLost]);
        assert_eq!(notifier.kinds(), vec![AlertKind::ProximityLost]);
    }

    #[test]
    fn test_permission_denied_still_updates_state() {
        let mut config = MonitorConfig::default();
        config.notifications.permission_granted = false;
        let notifier = RecordingNotifier::denying();
        let mut engine = ReconciliationEngine::new(&config, Box::new(notifier.clone()));

        let outcome = engine
            .process(&TelemetrySample::new(ALARM_SMOKE_TOPIC, "1"))
            .unwrap();

        assert_eq!(kinds(&outcome), vec![AlertKind::SmokeDetected]);
        assert_eq!(engine.state().alarm_active, Observed::Known(true));
        assert!(notifier.kinds().is_empty());
    }

    #[test]
    fn test_subscription_topics_follow_mode() {
        let (engine, _) = engine_with(&MonitorConfig::default());
        assert_eq!(
            engine.subscription_topics(),
            vec![ALARM_SMOKE_TOPIC.to_string(), RSSI_TOPIC.to_string()]
        );
    }
}
