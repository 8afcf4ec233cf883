use crate::generator::profile::SyntheticSource;
use crate::workflow::config::{SessionConfig, Step};
use anyhow::Context;
use log::info;
use serde::Serialize;
use shotcore::link::{channel_link, Payload, PeerControl, PeerInbox};
use shotcore::sensor::IntervalSampler;
use shotcore::telemetry::MetricsSnapshot;
use shotcore::{
    Clock, FixedEpochClock, MonitorHandle, MonitoringController, MonitoringState, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

/// Everything observed on the peer side during one scripted session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub outbound: Vec<Payload>,
    pub shot_notifications: usize,
    pub final_state: MonitoringState,
    pub metrics: MetricsSnapshot,
}

/// A running wearable wired to an in-process peer.
pub struct Session {
    pub handle: MonitorHandle,
    pub control: PeerControl,
    pub inbox: PeerInbox,
}

#[derive(Clone)]
pub struct Runner {
    config: SessionConfig,
}

impl Runner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Spawns the controller. Must be called from inside a tokio runtime.
    pub fn launch(&self) -> Session {
        let clock: Arc<dyn Clock> = match self.config.epoch {
            Some(epoch) => Arc::new(FixedEpochClock::new(epoch)),
            None => Arc::new(SystemClock),
        };

        let mut generator = self.config.generator.clone();
        generator.sample_interval_ms = self.config.monitor.sample_interval_ms;
        let sampler = IntervalSampler::new(SyntheticSource::new(generator), clock.clone());

        let (endpoint, control, inbox) = channel_link(self.config.monitor.outbound_queue_capacity);
        let handle =
            MonitoringController::new(self.config.monitor.clone(), sampler, endpoint, clock)
                .spawn();

        Session {
            handle,
            control,
            inbox,
        }
    }

    /// Plays the scripted steps and collects what the peer received.
    pub async fn play(&self, session: &mut Session) -> anyhow::Result<SessionResult> {
        for (index, step) in self.config.steps.iter().enumerate() {
            info!("step {}: {:?}", index, step);
            self.apply(session, step)
                .await
                .with_context(|| format!("executing step {} ({:?})", index, step))?;
        }

        let final_state = session
            .handle
            .state()
            .await
            .context("reading final monitoring state")?;
        let outbound = session.inbox.drain();
        let shot_notifications = outbound
            .iter()
            .filter(|message| message.contains_key("shotDetected"))
            .count();

        Ok(SessionResult {
            outbound,
            shot_notifications,
            final_state,
            metrics: session.handle.metrics(),
        })
    }

    #[cfg(test)]
    pub async fn execute(&self) -> anyhow::Result<SessionResult> {
        let mut session = self.launch();
        self.play(&mut session).await
    }

    async fn apply(&self, session: &Session, step: &Step) -> anyhow::Result<()> {
        match step {
            Step::Activate => session.control.activate(),
            Step::Reachable { reachable } => session.control.set_reachable(*reachable),
            Step::Command { payload } => {
                if !session.control.send_command(payload.clone()) {
                    anyhow::bail!("controller no longer accepts link events");
                }
            }
            Step::Wait { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
            Step::Simulate => {
                session.handle.simulate_shot().await?;
            }
            // Refusals are part of the script's expected behaviour.
            Step::Start => {
                if let Err(err) = session.handle.start().await {
                    info!("start refused: {}", err);
                }
            }
            Step::Stop => {
                if let Err(err) = session.handle.stop().await {
                    info!("stop refused: {}", err);
                }
            }
        }
        // Round trip so the step is fully applied before the next one.
        session.handle.state().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::GeneratorConfig;
    use shotcore::link::{payload, LinkValue, Notification};
    use shotcore::ConnectionStatus;

    fn scripted(steps: Vec<Step>, spike_at_ms: Vec<u64>) -> SessionConfig {
        SessionConfig {
            monitor: Default::default(),
            generator: GeneratorConfig {
                noise: 0.0,
                spike_at_ms,
                ..Default::default()
            },
            epoch: Some(1_700_000_000.0),
            steps,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runner_executes_default_session() {
        let mut cfg = SessionConfig::from_args(3, 4000, vec![1000, 1800, 3200]);
        cfg.epoch = Some(1_700_000_000.0);
        let result = Runner::new(cfg).execute().await.unwrap();

        // 1800 falls inside the cooldown of 1000; the simulated shot adds one.
        assert_eq!(result.shot_notifications, 3);
        // Activation resyncs the idle state before the session starts.
        assert_eq!(result.outbound[0], Notification::Monitoring(false).into_payload());
        assert_eq!(result.outbound[1], Notification::Monitoring(true).into_payload());
        assert!(result.outbound.contains(&Notification::Pong.into_payload()));
        assert_eq!(
            result.outbound.last(),
            Some(&Notification::Monitoring(false).into_payload())
        );
        assert!(!result.final_state.is_monitoring);
        assert!(!result.final_state.shot_detected);
        assert_eq!(result.final_state.connection_status, ConnectionStatus::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn activation_while_monitoring_resyncs_peer() {
        let cfg = scripted(
            vec![
                Step::Start,
                Step::Reachable { reachable: true },
                Step::Activate,
            ],
            Vec::new(),
        );
        let result = Runner::new(cfg).execute().await.unwrap();
        assert_eq!(
            result.outbound,
            vec![
                Notification::Monitoring(true).into_payload(),
                Notification::Monitoring(true).into_payload(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_before_reachable_is_flushed_later() {
        let cfg = scripted(
            vec![
                Step::Command {
                    payload: payload([("action", "test")]),
                },
                Step::Reachable { reachable: true },
            ],
            Vec::new(),
        );
        let result = Runner::new(cfg).execute().await.unwrap();
        assert_eq!(result.outbound, vec![Notification::TestResponse.into_payload()]);
    }

    #[tokio::test(start_paused = true)]
    async fn generated_spike_timestamps_follow_epoch() {
        let cfg = scripted(
            vec![
                Step::Reachable { reachable: true },
                Step::Start,
                Step::Wait { ms: 1000 },
                Step::Stop,
            ],
            vec![500],
        );
        let result = Runner::new(cfg).execute().await.unwrap();
        let shot = result
            .outbound
            .iter()
            .find(|m| m.contains_key("shotDetected"))
            .unwrap();
        match shot["timestamp"] {
            LinkValue::Number(ts) => assert!((ts - 1_700_000_000.5).abs() < 1e-6),
            ref other => panic!("unexpected timestamp {:?}", other),
        }
        assert_eq!(result.metrics.shots, 1);
    }
}
