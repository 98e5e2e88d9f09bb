//! Edge-triggered alert decisions
//!
//! Each monitored condition moves `Unknown -> Normal <-> Alerting`. An alert
//! is emitted only when a condition enters `Alerting` from any other state;
//! staying in `Alerting` never re-raises it.

use crate::protocol::messages::{AlertEvent, AlertKind};
use crate::telemetry::state::Observed;
use serde::{Deserialize, Serialize};

/// Signal strength above this (dBm) counts as "near"
pub const DEFAULT_RSSI_THRESHOLD: i32 = -60;

/// Where the proximity condition comes from. The two sources are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProximityMode {
    /// Classify each signal strength reading against the threshold
    #[default]
    Derived,
    /// Use the device's own `braceletNear` flag
    Direct,
}

/// Outcome of evaluating one reading against the previous state
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// New state to store
    pub next: bool,
    pub alert: Option<AlertEvent>,
}

#[derive(Debug, Clone, Copy)]
pub struct AlertEvaluator {
    rssi_threshold: i32,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(DEFAULT_RSSI_THRESHOLD)
    }
}

impl AlertEvaluator {
    pub fn new(rssi_threshold: i32) -> Self {
        Self { rssi_threshold }
    }

    pub fn rssi_threshold(&self) -> i32 {
        self.rssi_threshold
    }

    /// Smoke alarm: `1` is active, anything else is normal
    pub fn evaluate_alarm(&self, previous: Observed<bool>, value: i32) -> Decision {
        let active = value == 1;
        let alert = (active && !previous.is(&true)).then(|| AlertKind::SmokeDetected.into());
        Decision {
            next: active,
            alert,
        }
    }

    /// Strictly greater than the threshold is near; at or below is far
    pub fn classify_proximity(&self, signal_strength: i32) -> bool {
        signal_strength > self.rssi_threshold
    }

    /// Proximity: becoming far from any other state raises "proximity lost"
    pub fn evaluate_proximity(&self, previous: Observed<bool>, near: bool) -> Decision {
        let alert = (!near && !previous.is(&false)).then(|| AlertKind::ProximityLost.into());
        Decision { next: near, alert }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(decision: &Decision) -> Option<AlertKind> {
        decision.alert.as_ref().map(|a| a.kind)
    }

    #[test]
    fn test_alarm_rising_edge_alerts() {
        let evaluator = AlertEvaluator::default();

        let decision = evaluator.evaluate_alarm(Observed::Unknown, 1);
        assert!(decision.next);
        assert_eq!(kind(&decision), Some(AlertKind::SmokeDetected));

        let decision = evaluator.evaluate_alarm(Observed::Known(false), 1);
        assert_eq!(kind(&decision), Some(AlertKind::SmokeDetected));
    }

    #[test]
    fn test_alarm_repeat_is_silent() {
        let evaluator = AlertEvaluator::default();
        let decision = evaluator.evaluate_alarm(Observed::Known(true), 1);
        assert!(decision.next);
        assert!(decision.alert.is_none());
    }

    #[test]
    fn test_alarm_clear_is_silent() {
        let evaluator = AlertEvaluator::default();
        let decision = evaluator.evaluate_alarm(Observed::Known(true), 0);
        assert!(!decision.next);
        assert!(decision.alert.is_none());

        let decision = evaluator.evaluate_alarm(Observed::Unknown, 0);
        assert!(!decision.next);
        assert!(decision.alert.is_none());
    }

    #[test]
    fn test_alarm_other_values_are_normal() {
        let evaluator = AlertEvaluator::default();
        let decision = evaluator.evaluate_alarm(Observed::Unknown, 2);
        assert!(!decision.next);
        assert!(decision.alert.is_none());
    }

    #[test]
    fn test_threshold_boundary() {
        let evaluator = AlertEvaluator::default();
        assert!(!evaluator.classify_proximity(-60));
        assert!(evaluator.classify_proximity(-59));
        assert!(evaluator.classify_proximity(-45));
        assert!(!evaluator.classify_proximity(-75));
    }

    #[test]
    fn test_custom_threshold() {
        let evaluator = AlertEvaluator::new(-70);
        assert_eq!(evaluator.rssi_threshold(), -70);
        assert!(evaluator.classify_proximity(-65));
        assert!(!evaluator.classify_proximity(-70));
    }

    #[test]
    fn test_proximity_lost_edges() {
        let evaluator = AlertEvaluator::default();

        let decision = evaluator.evaluate_proximity(Observed::Known(true), false);
        assert_eq!(kind(&decision), Some(AlertKind::ProximityLost));

        let decision = evaluator.evaluate_proximity(Observed::Unknown, false);
        assert_eq!(kind(&decision), Some(AlertKind::ProximityLost));

        let decision = evaluator.evaluate_proximity(Observed::Known(false), false);
        assert!(decision.alert.is_none());
    }

    #[test]
    fn test_proximity_regained_is_silent() {
        let evaluator = AlertEvaluator::default();
        let decision = evaluator.evaluate_proximity(Observed::Known(false), true);
        assert!(decision.next);
        assert!(decision.alert.is_none());

        let decision = evaluator.evaluate_proximity(Observed::Unknown, true);
        assert!(decision.alert.is_none());
    }
}
