use crate::clock::Clock;
use crate::control::feedback::{LogFeedback, ShotFeedback};
use crate::control::router::{CommandRouter, MonitorOps};
use crate::detection::ShotDetector;
use crate::link::message::Notification;
use crate::link::transport::{LinkEndpoint, LinkEvent, LinkEventReceiver, LinkTransport};
use crate::prelude::{
    ConnectionStatus, MonitorConfig, MonitorError, MonitorResult, MonitoringState, ShotEvent,
};
use crate::sensor::sampler::{SampleReading, SampleSink, SignalSampler};
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

enum Request {
    Start(oneshot::Sender<MonitorResult<()>>),
    Stop(oneshot::Sender<MonitorResult<()>>),
    SimulateShot(oneshot::Sender<ShotEvent>),
    State(oneshot::Sender<MonitoringState>),
}

/// Owner of [`MonitoringState`].
///
/// Runs as a single tokio task: requests from [`MonitorHandle`], sensor
/// readings and link events are all handled one at a time on that task,
/// and the `shot_detected` auto-clear deadline lives there too.
pub struct MonitoringController {
    config: MonitorConfig,
    state: MonitoringState,
    detector: ShotDetector,
    sampler: Box<dyn SignalSampler>,
    transport: Box<dyn LinkTransport>,
    link_events: Option<LinkEventReceiver>,
    feedback: Box<dyn ShotFeedback>,
    clock: Arc<dyn Clock>,
    router: CommandRouter,
    clear_at: Option<Instant>,
    samples: SampleSink,
    observers: watch::Sender<MonitoringState>,
    metrics: Arc<MetricsRecorder>,
    logger: LogManager,
}

impl MonitoringController {
    pub fn new(
        config: MonitorConfig,
        sampler: impl SignalSampler + 'static,
        link: LinkEndpoint,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = MonitoringState {
            connection_status: ConnectionStatus::from_reachable(link.transport.is_reachable()),
            ..MonitoringState::default()
        };
        let (observers, _) = watch::channel(state.clone());
        // Replaced with the actor's own channel in `spawn`.
        let (samples, _) = mpsc::unbounded_channel();

        Self {
            detector: ShotDetector::from_config(&config),
            config,
            state,
            sampler: Box::new(sampler),
            transport: link.transport,
            link_events: Some(link.events),
            feedback: Box::new(LogFeedback::new()),
            clock,
            router: CommandRouter::new(),
            clear_at: None,
            samples,
            observers,
            metrics: Arc::new(MetricsRecorder::new()),
            logger: LogManager::new("controller"),
        }
    }

    pub fn with_feedback(mut self, feedback: impl ShotFeedback + 'static) -> Self {
        self.feedback = Box::new(feedback);
        self
    }

    /// Starts the actor task. It runs until every handle is dropped.
    pub fn spawn(mut self) -> MonitorHandle {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (samples_tx, samples_rx) = mpsc::unbounded_channel();
        self.samples = samples_tx;

        let handle = MonitorHandle {
            requests: requests_tx,
            observed: self.observers.subscribe(),
            metrics: self.metrics.clone(),
        };
        tokio::spawn(self.run(requests_rx, samples_rx));
        handle
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut samples: mpsc::UnboundedReceiver<SampleReading>,
    ) {
        let mut link_events = self.link_events.take();
        self.logger.record("monitoring controller running");

        loop {
            let clear_at = self.clear_at;
            tokio::select! {
                biased;

                event = next_link_event(&mut link_events) => match event {
                    Some(event) => self.on_link_event(event),
                    None => {
                        self.logger.warn("link event stream closed");
                        link_events = None;
                    }
                },
                Some(reading) = samples.recv() => self.on_reading(reading),
                _ = wait_until(clear_at) => self.clear_shot(),
                request = requests.recv() => match request {
                    Some(request) => self.on_request(request),
                    None => break,
                },
            }
        }

        self.sampler.stop();
        self.logger.record("monitoring controller stopped");
    }

    fn on_request(&mut self, request: Request) {
        match request {
            Request::Start(reply) => {
                let _ = reply.send(self.start_monitoring());
            }
            Request::Stop(reply) => {
                let _ = reply.send(self.stop_monitoring());
            }
            Request::SimulateShot(reply) => {
                let _ = reply.send(self.simulate_shot());
            }
            Request::State(reply) => {
                let _ = reply.send(self.state.clone());
            }
        }
    }

    fn start_monitoring(&mut self) -> MonitorResult<()> {
        if self.state.is_monitoring {
            self.logger.record("start ignored: already monitoring");
            return Err(MonitorError::AlreadyMonitoring);
        }
        if !self.sampler.is_available() {
            self.logger.warn("start refused: accelerometer unavailable");
            return Err(MonitorError::SensorUnavailable);
        }

        self.sampler
            .start(self.config.sample_interval(), self.samples.clone())?;
        self.state.is_monitoring = true;
        self.publish();
        self.logger.record("monitoring started");
        self.send_notification(Notification::Monitoring(true));
        Ok(())
    }

    fn stop_monitoring(&mut self) -> MonitorResult<()> {
        if !self.state.is_monitoring {
            self.logger.record("stop ignored: not monitoring");
            return Err(MonitorError::NotMonitoring);
        }

        self.sampler.stop();
        self.state.is_monitoring = false;
        self.publish();
        self.logger.record("monitoring stopped");
        self.send_notification(Notification::Monitoring(false));
        Ok(())
    }

    fn simulate_shot(&mut self) -> ShotEvent {
        self.logger.record("simulating shot");
        let event = ShotEvent::at(self.clock.now());
        self.detector.note_shot(event.timestamp);
        self.on_shot_event(event);
        event
    }

    fn on_reading(&mut self, reading: SampleReading) {
        if !self.state.is_monitoring {
            return;
        }
        match reading {
            Ok(sample) if sample.is_finite() => {
                self.metrics.record_sample();
                if let Some(event) = self.detector.on_sample(&sample) {
                    self.on_shot_event(event);
                }
            }
            Ok(_) => {
                self.metrics.record_dropped_sample();
                self.logger.trace("dropping non-finite sample");
            }
            Err(err) => {
                self.metrics.record_dropped_sample();
                self.logger.trace(&format!("dropping sample: {}", err));
            }
        }
    }

    fn on_shot_event(&mut self, event: ShotEvent) {
        let timestamp = self.clock.epoch_seconds_at(event.timestamp);
        self.state.shot_detected = true;
        self.state.last_shot_time = Some(timestamp);
        self.clear_at = Some(self.clock.now() + self.config.shot_clear_delay());
        self.metrics.record_shot();
        self.publish();

        self.send_notification(Notification::Shot { timestamp });
        self.feedback.shot_detected(&event);
    }

    fn clear_shot(&mut self) {
        self.clear_at = None;
        self.state.shot_detected = false;
        self.publish();
    }

    fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::ActivationComplete(Ok(())) => {
                self.logger.record("link activated");
                self.refresh_connection(self.transport.is_reachable());
                self.send_notification(Notification::Monitoring(self.state.is_monitoring));
            }
            LinkEvent::ActivationComplete(Err(reason)) => {
                self.logger.warn(&format!("link activation failed: {}", reason));
                self.refresh_connection(self.transport.is_reachable());
            }
            LinkEvent::ReachabilityChanged(reachable) => self.refresh_connection(reachable),
            LinkEvent::Message { payload, reply } => {
                self.metrics.record_command();
                let router = self.router;
                // Errors were already logged by the router.
                let _ = router.route(&payload, self);
                if let Some(reply) = reply {
                    let _ = reply.send(Notification::Received.into_payload());
                }
            }
        }
    }

    fn refresh_connection(&mut self, reachable: bool) {
        let status = ConnectionStatus::from_reachable(reachable);
        if status != self.state.connection_status {
            self.logger.record(&format!("connection {:?}", status));
        }
        self.state.connection_status = status;
        self.publish();
    }

    fn send_notification(&mut self, notification: Notification) {
        match self.transport.send(notification.into_payload()) {
            Ok(()) => self.metrics.record_sent(),
            Err(err) => {
                self.metrics.record_send_failure();
                self.logger.warn(&err.to_string());
            }
        }
    }

    fn publish(&self) {
        self.observers.send_replace(self.state.clone());
    }
}

impl MonitorOps for MonitoringController {
    fn start(&mut self) -> MonitorResult<()> {
        self.start_monitoring()
    }

    fn stop(&mut self) -> MonitorResult<()> {
        self.stop_monitoring()
    }

    fn notify(&mut self, notification: Notification) {
        self.send_notification(notification);
    }
}

async fn next_link_event(events: &mut Option<LinkEventReceiver>) -> Option<LinkEvent> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Cloneable front-end to a running [`MonitoringController`].
#[derive(Clone)]
pub struct MonitorHandle {
    requests: mpsc::UnboundedSender<Request>,
    observed: watch::Receiver<MonitoringState>,
    metrics: Arc<MetricsRecorder>,
}

impl MonitorHandle {
    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> MonitorResult<T> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(build(reply))
            .map_err(|_| MonitorError::ControllerStopped)?;
        rx.await.map_err(|_| MonitorError::ControllerStopped)
    }

    pub async fn start(&self) -> MonitorResult<()> {
        self.call(Request::Start).await?
    }

    pub async fn stop(&self) -> MonitorResult<()> {
        self.call(Request::Stop).await?
    }

    pub async fn simulate_shot(&self) -> MonitorResult<ShotEvent> {
        self.call(Request::SimulateShot).await
    }

    /// State after every request sent before this one has been handled.
    pub async fn state(&self) -> MonitorResult<MonitoringState> {
        self.call(Request::State).await
    }

    /// Last published state, without a round trip to the actor.
    pub fn snapshot(&self) -> MonitoringState {
        self.observed.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitoringState> {
        self.observed.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
