use std::time::{SystemTime, UNIX_EPOCH};
use tokio::time::Instant;

/// Time source for detection and outbound timestamps.
///
/// The monotonic side uses tokio's `Instant`, so a paused test runtime
/// controls it as well.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch corresponding to `at`.
    fn epoch_seconds_at(&self, at: Instant) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_seconds_at(&self, at: Instant) -> f64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let now = Instant::now();
        if at <= now {
            wall - now.duration_since(at).as_secs_f64()
        } else {
            wall + at.duration_since(now).as_secs_f64()
        }
    }
}

/// Clock pinned to a known epoch at construction time.
#[derive(Debug, Clone, Copy)]
pub struct FixedEpochClock {
    origin: Instant,
    epoch_at_origin: f64,
}

impl FixedEpochClock {
    pub fn new(epoch_at_origin: f64) -> Self {
        Self {
            origin: Instant::now(),
            epoch_at_origin,
        }
    }
}

impl Clock for FixedEpochClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_seconds_at(&self, at: Instant) -> f64 {
        if at >= self.origin {
            self.epoch_at_origin + at.duration_since(self.origin).as_secs_f64()
        } else {
            self.epoch_at_origin - self.origin.duration_since(at).as_secs_f64()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn fixed_epoch_clock_tracks_elapsed_time() {
        let clock = FixedEpochClock::new(1_000.0);
        tokio::time::advance(Duration::from_millis(2500)).await;
        let seconds = clock.epoch_seconds_at(clock.now());
        assert!((seconds - 1_002.5).abs() < 1e-9);
    }

    #[test]
    fn system_clock_reports_recent_epoch() {
        let clock = SystemClock;
        // 2020-01-01
        assert!(clock.epoch_seconds_at(clock.now()) > 1_577_836_800.0);
    }
}
