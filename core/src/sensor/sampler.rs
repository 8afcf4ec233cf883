use crate::clock::Clock;
use crate::prelude::{AccelSample, MonitorError, MonitorResult, SensorError};
use crate::sensor::source::AccelSource;
use crate::telemetry::LogManager;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A timestamped reading, or the error the sensor reported for that tick.
pub type SampleReading = Result<AccelSample, SensorError>;

/// Where a running sampler posts its readings.
pub type SampleSink = mpsc::UnboundedSender<SampleReading>;

/// Start/stop lifecycle of a periodic accelerometer stream.
pub trait SignalSampler: Send {
    fn is_available(&self) -> bool;
    fn start(&mut self, interval: Duration, sink: SampleSink) -> MonitorResult<()>;
    fn stop(&mut self);
    fn is_running(&self) -> bool;
}

/// Polls an [`AccelSource`] on a tokio interval.
pub struct IntervalSampler<S> {
    source: Arc<Mutex<S>>,
    clock: Arc<dyn Clock>,
    task: Option<JoinHandle<()>>,
    logger: LogManager,
}

impl<S: AccelSource + 'static> IntervalSampler<S> {
    pub fn new(source: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            clock,
            task: None,
            logger: LogManager::new("sampler"),
        }
    }

    fn read_once(source: &Mutex<S>, clock: &dyn Clock) -> SampleReading {
        let mut source = source
            .lock()
            .map_err(|_| SensorError::ReadFailed("source lock poisoned".into()))?;
        let [x, y, z] = source.read()?;
        let sample = AccelSample::new(x, y, z, clock.now());
        if !sample.is_finite() {
            return Err(SensorError::NonFinite);
        }
        Ok(sample)
    }
}

impl<S: AccelSource + 'static> SignalSampler for IntervalSampler<S> {
    fn is_available(&self) -> bool {
        self.source
            .lock()
            .map(|source| source.is_available())
            .unwrap_or(false)
    }

    fn start(&mut self, interval: Duration, sink: SampleSink) -> MonitorResult<()> {
        if !self.is_available() {
            return Err(MonitorError::SensorUnavailable);
        }
        if self.is_running() {
            return Err(MonitorError::AlreadyMonitoring);
        }

        let source = self.source.clone();
        let clock = self.clock.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let reading = Self::read_once(&source, clock.as_ref());
                if sink.send(reading).is_err() {
                    break;
                }
            }
        }));
        self.logger
            .record(&format!("sampling every {} ms", interval.as_millis()));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.logger.record("sampling stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl<S> Drop for IntervalSampler<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
