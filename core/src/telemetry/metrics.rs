use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters accumulated by the monitoring actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub samples_processed: usize,
    pub samples_dropped: usize,
    pub shots: usize,
    pub messages_sent: usize,
    pub send_failures: usize,
    pub commands_routed: usize,
}

pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut MetricsSnapshot)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_sample(&self) {
        self.update(|m| m.samples_processed += 1);
    }

    pub fn record_dropped_sample(&self) {
        self.update(|m| m.samples_dropped += 1);
    }

    pub fn record_shot(&self) {
        self.update(|m| m.shots += 1);
    }

    pub fn record_sent(&self) {
        self.update(|m| m.messages_sent += 1);
    }

    pub fn record_send_failure(&self) {
        self.update(|m| m.send_failures += 1);
    }

    pub fn record_command(&self) {
        self.update(|m| m.commands_routed += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner.lock().map(|m| *m).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_accumulates_counters() {
        let metrics = MetricsRecorder::new();
        metrics.record_sample();
        metrics.record_sample();
        metrics.record_dropped_sample();
        metrics.record_shot();
        metrics.record_send_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.samples_processed, 2);
        assert_eq!(snapshot.samples_dropped, 1);
        assert_eq!(snapshot.shots, 1);
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.messages_sent, 0);
    }
}
