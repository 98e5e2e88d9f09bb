//! Last-known device state
//!
//! Every field starts as [`Observed::Unknown`] and can only move to
//! [`Observed::Known`]. The store exposes no operation that forgets a value;
//! only a new process starts from scratch again.

use crate::protocol::messages::StatusSnapshot;

/// A value that may not have been observed yet
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Observed<T> {
    #[default]
    Unknown,
    Known(T),
}

impl<T> Observed<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Observed::Known(_))
    }

    pub fn known(self) -> Option<T> {
        match self {
            Observed::Known(value) => Some(value),
            Observed::Unknown => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Observed<U> {
        match self {
            Observed::Known(value) => Observed::Known(f(value)),
            Observed::Unknown => Observed::Unknown,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.known().unwrap_or(default)
    }
}

impl<T: PartialEq> Observed<T> {
    /// True only when a value has been observed and equals `other`
    pub fn is(&self, other: &T) -> bool {
        matches!(self, Observed::Known(value) if value == other)
    }
}

/// Last-known values for the single monitored device
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceState {
    pub alarm_active: Observed<bool>,
    pub proximity_near: Observed<bool>,
    pub last_signal_strength: Observed<i32>,
    pub last_distance_m: Observed<f64>,
}

/// Owner of [`DeviceState`]. Each `record_*` call returns the value it replaced.
#[derive(Debug, Default)]
pub struct DeviceStateStore {
    state: DeviceState,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn record_alarm(&mut self, active: bool) -> Observed<bool> {
        std::mem::replace(&mut self.state.alarm_active, Observed::Known(active))
    }

    pub fn record_proximity(&mut self, near: bool) -> Observed<bool> {
        std::mem::replace(&mut self.state.proximity_near, Observed::Known(near))
    }

    /// Store a signal strength reading together with the distance derived from it
    pub fn record_signal(&mut self, signal_strength: i32, distance_m: f64) -> Observed<i32> {
        self.state.last_distance_m = Observed::Known(distance_m);
        std::mem::replace(
            &mut self.state.last_signal_strength,
            Observed::Known(signal_strength),
        )
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            alarm_active: self.state.alarm_active,
            proximity_near: self.state.proximity_near,
            signal_strength: self.state.last_signal_strength,
            distance_m: self.state.last_distance_m,
        }
    }
}
