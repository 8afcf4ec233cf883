use crate::math::StatsHelper;
use crate::prelude::{AccelSample, MonitorConfig, ShotEvent};
use crate::telemetry::LogManager;
use std::time::Duration;
use tokio::time::Instant;

/// Derived detector state. There is no timer behind it: the state is
/// recomputed from the time since the last accepted shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    Refractory,
}

/// Single-sample threshold detector with a refractory period.
///
/// A sample counts as a shot when its gravity-compensated magnitude exceeds
/// the threshold and at least one cooldown has elapsed since the previous
/// shot. The signal is not smoothed, so any sharp enough motion triggers.
pub struct ShotDetector {
    threshold: f64,
    cooldown: Duration,
    last_shot: Option<Instant>,
    logger: LogManager,
}

impl ShotDetector {
    pub fn new(threshold: f64, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            last_shot: None,
            logger: LogManager::new("detector"),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.acceleration_threshold, config.detection_cooldown())
    }

    pub fn state(&self, now: Instant) -> DetectorState {
        if self.cooling_down(now) {
            DetectorState::Refractory
        } else {
            DetectorState::Idle
        }
    }

    /// A spike exactly one cooldown after the last shot is accepted.
    fn cooling_down(&self, now: Instant) -> bool {
        match self.last_shot {
            Some(last) => now.saturating_duration_since(last) < self.cooldown,
            None => false,
        }
    }

    /// Records a shot that did not come from the sample stream, so the
    /// cooldown also applies to it.
    pub fn note_shot(&mut self, at: Instant) {
        self.last_shot = Some(at);
    }

    pub fn on_sample(&mut self, sample: &AccelSample) -> Option<ShotEvent> {
        if !sample.is_finite() {
            self.logger.trace("dropping non-finite sample");
            return None;
        }

        let magnitude = StatsHelper::dynamic_magnitude(sample.x, sample.y, sample.z);
        if magnitude <= self.threshold || self.cooling_down(sample.timestamp) {
            return None;
        }

        self.last_shot = Some(sample.timestamp);
        self.logger
            .record(&format!("shot detected, magnitude {:.3} g", magnitude));
        Some(ShotEvent::at(sample.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ShotDetector {
        ShotDetector::from_config(&MonitorConfig::default())
    }

    fn sample(base: Instant, offset_ms: u64, z: f64) -> AccelSample {
        AccelSample::new(0.0, 0.0, z, base + Duration::from_millis(offset_ms))
    }

    #[test]
    fn sub_threshold_stream_never_fires() {
        let mut det = detector();
        let base = Instant::now();
        for i in 0..200u64 {
            let z = 1.0 + (i % 7) as f64 * 0.35;
            assert!(det.on_sample(&sample(base, i * 50, z)).is_none());
        }
        assert_eq!(det.state(base + Duration::from_millis(9950)), DetectorState::Idle);
    }

    #[test]
    fn magnitude_exactly_at_threshold_does_not_fire() {
        let mut det = detector();
        let base = Instant::now();
        assert!(det.on_sample(&sample(base, 0, 3.5)).is_none());
        assert!(det.on_sample(&sample(base, 50, 3.6)).is_some());
    }

    #[test]
    fn spikes_inside_cooldown_fire_once() {
        let mut det = detector();
        let base = Instant::now();
        let first = det.on_sample(&sample(base, 0, 5.0));
        assert_eq!(first, Some(ShotEvent::at(base)));
        assert!(det.on_sample(&sample(base, 1499, 5.0)).is_none());
        assert_eq!(
            det.state(base + Duration::from_millis(1499)),
            DetectorState::Refractory
        );
    }

    #[test]
    fn spikes_a_full_cooldown_apart_fire_twice() {
        let mut det = detector();
        let base = Instant::now();
        assert!(det.on_sample(&sample(base, 0, 5.0)).is_some());
        assert!(det.on_sample(&sample(base, 1500, 5.0)).is_some());
        assert!(det.on_sample(&sample(base, 2000, 5.0)).is_none());
        assert!(det.on_sample(&sample(base, 3100, 5.0)).is_some());
    }

    #[test]
    fn state_follows_elapsed_time() {
        let mut det = detector();
        let base = Instant::now();
        assert_eq!(det.state(base), DetectorState::Idle);
        det.on_sample(&sample(base, 0, 5.0));
        assert_eq!(
            det.state(base + Duration::from_millis(700)),
            DetectorState::Refractory
        );
        assert_eq!(
            det.state(base + Duration::from_millis(1500)),
            DetectorState::Idle
        );
    }

    #[test]
    fn noted_shot_arms_cooldown() {
        let mut det = detector();
        let base = Instant::now();
        det.note_shot(base);
        assert!(det.on_sample(&sample(base, 200, 5.0)).is_none());
        assert!(det.on_sample(&sample(base, 1600, 5.0)).is_some());
    }

    #[test]
    fn non_finite_samples_are_dropped() {
        let mut det = detector();
        let base = Instant::now();
        let bad = AccelSample::new(f64::NAN, 0.0, 9.0, base);
        assert!(det.on_sample(&bad).is_none());
        let inf = AccelSample::new(0.0, f64::INFINITY, 0.0, base);
        assert!(det.on_sample(&inf).is_none());
        assert_eq!(det.state(base), DetectorState::Idle);
    }

    #[test]
    fn spike_on_any_axis_counts() {
        let mut det = detector();
        let base = Instant::now();
        let lateral = AccelSample::new(-3.0, 2.5, 0.5, base);
        assert!(det.on_sample(&lateral).is_some());
    }
}
