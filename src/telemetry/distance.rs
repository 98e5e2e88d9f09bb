//! Distance estimation from received signal strength
//!
//! The canonical policy is the log-distance path-loss model
//! `d = 10 ^ ((tx_power - rssi) / (10 * n))`. A coarse band lookup is kept as
//! an alternative policy; an estimator always applies exactly one of them.

use serde::{Deserialize, Serialize};

/// Assumed signal strength at one meter, in dBm
pub const DEFAULT_TX_POWER: i32 = -52;
/// Environment factor of the path-loss model
pub const DEFAULT_PATH_LOSS_EXPONENT: f64 = 5.65;

/// Lower band edge (dBm) and distance (m), strongest band first
const DISTANCE_BANDS: [(i32, f64); 4] = [(-50, 0.5), (-60, 1.0), (-70, 2.0), (-80, 4.0)];
const FARTHEST_BAND_M: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceModel {
    #[default]
    LogDistance,
    Bucketed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimator {
    model: DistanceModel,
    tx_power: i32,
    path_loss_exponent: f64,
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::log_distance(DEFAULT_TX_POWER, DEFAULT_PATH_LOSS_EXPONENT)
    }
}

impl DistanceEstimator {
    pub fn log_distance(tx_power: i32, path_loss_exponent: f64) -> Self {
        Self {
            model: DistanceModel::LogDistance,
            tx_power,
            path_loss_exponent,
        }
    }

    pub fn bucketed() -> Self {
        Self {
            model: DistanceModel::Bucketed,
            tx_power: DEFAULT_TX_POWER,
            path_loss_exponent: DEFAULT_PATH_LOSS_EXPONENT,
        }
    }

    pub fn model(&self) -> DistanceModel {
        self.model
    }

    /// Whether a reading carries usable information. `-1` is the no-data
    /// sentinel; zero and positive values are not physical for this radio.
    pub fn is_measurable(signal_strength: i32) -> bool {
        signal_strength < -1
    }

    /// Estimated distance in meters, `0.0` for a sentinel reading
    pub fn estimate(&self, signal_strength: i32) -> f64 {
        if !Self::is_measurable(signal_strength) {
            return 0.0;
        }

        match self.model {
            DistanceModel::LogDistance => {
                let exponent = (f64::from(self.tx_power) - f64::from(signal_strength))
                    / (10.0 * self.path_loss_exponent);
                10f64.powf(exponent)
            }
            DistanceModel::Bucketed => DISTANCE_BANDS
                .iter()
                .find(|(edge, _)| signal_strength >= *edge)
                .map(|(_, meters)| *meters)
                .unwrap_or(FARTHEST_BAND_M),
        }
    }
}
