use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Tuning shared by the detector, sampler and controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Gravity-compensated magnitude (in g) a sample must exceed to count as a shot.
    pub acceleration_threshold: f64,
    pub detection_cooldown_ms: u64,
    pub sample_interval_ms: u64,
    /// How long `shot_detected` stays raised after a shot.
    pub shot_clear_delay_ms: u64,
    /// Payloads buffered by the link while the peer is unreachable.
    pub outbound_queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            acceleration_threshold: 2.5,
            detection_cooldown_ms: 1500,
            sample_interval_ms: 50,
            shot_clear_delay_ms: 1500,
            outbound_queue_capacity: 64,
        }
    }
}

impl MonitorConfig {
    pub fn detection_cooldown(&self) -> Duration {
        Duration::from_millis(self.detection_cooldown_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }

    pub fn shot_clear_delay(&self) -> Duration {
        Duration::from_millis(self.shot_clear_delay_ms)
    }
}

/// One 3-axis accelerometer reading in g-units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: Instant,
}

impl AccelSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: Instant) -> Self {
        Self { x, y, z, timestamp }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A detected (or simulated) shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotEvent {
    pub detected: bool,
    pub timestamp: Instant,
}

impl ShotEvent {
    pub fn at(timestamp: Instant) -> Self {
        Self {
            detected: true,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ConnectionStatus {
    Connected,
    #[default]
    Disconnected,
}

impl ConnectionStatus {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }
}

/// Observable monitoring state, owned by the controller actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MonitoringState {
    pub is_monitoring: bool,
    /// Raised on every shot and cleared after `shot_clear_delay_ms`.
    pub shot_detected: bool,
    /// Seconds since the Unix epoch of the most recent shot.
    pub last_shot_time: Option<f64>,
    pub connection_status: ConnectionStatus,
}

/// Failures absorbed by the monitoring core. None of them is fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("accelerometer unavailable")]
    SensorUnavailable,
    #[error("monitoring already active")]
    AlreadyMonitoring,
    #[error("monitoring not active")]
    NotMonitoring,
    #[error("transport send failed: {0}")]
    TransportSendFailure(String),
    #[error("malformed inbound command: {0}")]
    MalformedInboundCommand(String),
    #[error("monitoring controller has shut down")]
    ControllerStopped,
}

pub type MonitorResult<T> = Result<T, MonitorError>;

/// Read failure reported by an accelerometer source.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
    #[error("non-finite reading")]
    NonFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_tracker_constants() {
        let config = MonitorConfig::default();
        assert_eq!(config.acceleration_threshold, 2.5);
        assert_eq!(config.detection_cooldown(), Duration::from_millis(1500));
        assert_eq!(config.sample_interval(), Duration::from_millis(50));
        assert_eq!(config.shot_clear_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"acceleration_threshold": 3.0}"#).unwrap();
        assert_eq!(config.acceleration_threshold, 3.0);
        assert_eq!(config.sample_interval_ms, 50);
    }

    #[test]
    fn connection_status_follows_reachability() {
        assert_eq!(
            ConnectionStatus::from_reachable(true),
            ConnectionStatus::Connected
        );
        assert_eq!(
            ConnectionStatus::from_reachable(false),
            ConnectionStatus::Disconnected
        );
    }
}
