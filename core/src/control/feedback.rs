use crate::prelude::ShotEvent;
use crate::telemetry::LogManager;

/// Local reaction to a shot (haptics on the wearable).
pub trait ShotFeedback: Send {
    fn shot_detected(&mut self, event: &ShotEvent);
}

/// Feedback that only writes a log line.
#[derive(Debug, Clone, Copy)]
pub struct LogFeedback {
    logger: LogManager,
}

impl LogFeedback {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("feedback"),
        }
    }
}

impl Default for LogFeedback {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotFeedback for LogFeedback {
    fn shot_detected(&mut self, _event: &ShotEvent) {
        self.logger.record("shot feedback");
    }
}
