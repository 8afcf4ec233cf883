use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use shotcore::link::{payload, LinkValue, Payload};
use shotcore::MonitorConfig;
use std::fs;
use std::path::Path;

/// One scripted action against the running wearable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Peer finishes activating the link.
    Activate,
    Reachable { reachable: bool },
    /// Inbound command from the peer.
    Command { payload: Payload },
    Wait { ms: u64 },
    Simulate,
    Start,
    Stop,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Pins outbound timestamps to this epoch instead of the wall clock.
    #[serde(default)]
    pub epoch: Option<f64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl SessionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading session config {}", path_ref.display()))?;
        let config: SessionConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing session config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Default script: the peer connects, asks for an active session, lets the
    /// generator run for `duration_ms`, pings, simulates a shot and stops.
    pub fn from_args(seed: u64, duration_ms: u64, spike_at_ms: Vec<u64>) -> Self {
        let monitor = MonitorConfig::default();
        let mut generator = GeneratorConfig {
            seed,
            sample_interval_ms: monitor.sample_interval_ms,
            ..Default::default()
        };
        if !spike_at_ms.is_empty() {
            generator.spike_at_ms = spike_at_ms;
        }

        let mut session_status = payload([("action", "sessionStatus")]);
        session_status.insert("isActive".into(), LinkValue::Bool(true));

        let steps = vec![
            Step::Reachable { reachable: true },
            Step::Activate,
            Step::Command {
                payload: session_status,
            },
            Step::Wait { ms: duration_ms },
            Step::Command {
                payload: payload([("action", "ping")]),
            },
            Step::Simulate,
            Step::Wait {
                ms: monitor.shot_clear_delay_ms + 100,
            },
            Step::Command {
                payload: payload([("action", "stopMonitoring")]),
            },
        ];

        Self {
            monitor,
            generator,
            epoch: None,
            steps,
        }
    }
}
