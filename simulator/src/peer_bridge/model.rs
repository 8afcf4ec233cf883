use serde::Serialize;
use shotcore::telemetry::MetricsSnapshot;
use shotcore::{ConnectionStatus, MonitoringState};

/// Fields a presentation layer shows for the wearable.
#[derive(Debug, Clone, Serialize)]
pub struct StatusModel {
    pub connection_status: ConnectionStatus,
    pub is_monitoring: bool,
    pub shot_detected: bool,
    pub last_shot_time: Option<f64>,
    pub metrics: MetricsSnapshot,
}

impl StatusModel {
    pub fn new(state: MonitoringState, metrics: MetricsSnapshot) -> Self {
        Self {
            connection_status: state.connection_status,
            is_monitoring: state.is_monitoring,
            shot_detected: state.shot_detected,
            last_shot_time: state.last_shot_time,
            metrics,
        }
    }
}

/// Result of a presentation-triggered action. Refusals are not errors.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReply {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ActionReply {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            reason: None,
        }
    }

    pub fn ignored(reason: impl ToString) -> Self {
        Self {
            status: "ignored",
            reason: Some(reason.to_string()),
        }
    }
}
