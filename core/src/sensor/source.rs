use crate::prelude::SensorError;
use std::collections::VecDeque;

/// Hardware-facing accelerometer. Readings are in g-units.
pub trait AccelSource: Send {
    fn is_available(&self) -> bool;
    fn read(&mut self) -> Result<[f64; 3], SensorError>;
}

/// Replays a fixed list of readings, then rests at 1 g on the z axis.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    readings: VecDeque<Result<[f64; 3], SensorError>>,
    unavailable: bool,
}

impl ScriptedSource {
    pub const REST: [f64; 3] = [0.0, 0.0, 1.0];

    pub fn new(readings: impl IntoIterator<Item = Result<[f64; 3], SensorError>>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            unavailable: false,
        }
    }

    pub fn resting() -> Self {
        Self::default()
    }

    /// A source with `spike` placed at each listed read index.
    pub fn with_spikes(indices: &[usize], spike: [f64; 3]) -> Self {
        let len = indices.iter().max().map(|max| max + 1).unwrap_or(0);
        let readings = (0..len).map(|i| {
            if indices.contains(&i) {
                Ok(spike)
            } else {
                Ok(Self::REST)
            }
        });
        Self::new(readings)
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

impl AccelSource for ScriptedSource {
    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn read(&mut self) -> Result<[f64; 3], SensorError> {
        self.readings.pop_front().unwrap_or(Ok(Self::REST))
    }
}
