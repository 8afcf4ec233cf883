use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use shotcore::prelude::SensorError;
use shotcore::sensor::AccelSource;
use std::f64::consts::PI;

/// Configuration for a synthetic wrist-worn accelerometer stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    /// Uniform jitter added to every axis, in g.
    pub noise: f64,
    /// Arm-swing wobble on the x axis.
    pub wobble_hz: f64,
    pub wobble_amplitude: f64,
    /// Offsets from the first reading at which a shot spike starts.
    pub spike_at_ms: Vec<u64>,
    /// Gravity-compensated peak of each spike, in g.
    pub spike_magnitude: f64,
    pub spike_width_ms: u64,
    pub sample_interval_ms: u64,
    pub available: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            noise: 0.05,
            wobble_hz: 0.8,
            wobble_amplitude: 0.3,
            spike_at_ms: vec![1000, 1800, 3200],
            spike_magnitude: 3.5,
            spike_width_ms: 100,
            sample_interval_ms: 50,
            available: true,
        }
    }
}

impl GeneratorConfig {
    fn in_spike(&self, t_ms: u64) -> bool {
        self.spike_at_ms
            .iter()
            .any(|&start| t_ms >= start && t_ms < start + self.spike_width_ms.max(1))
    }
}

/// Accelerometer source producing a resting 1 g signal with noise, a slow
/// wobble and shot spikes at the configured offsets.
pub struct SyntheticSource {
    config: GeneratorConfig,
    rng: StdRng,
    reads: u64,
}

impl SyntheticSource {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            reads: 0,
        }
    }

    fn jitter(&mut self) -> f64 {
        if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..self.config.noise)
        } else {
            0.0
        }
    }

    fn reading_at(&mut self, t_ms: u64) -> [f64; 3] {
        let t = t_ms as f64 / 1000.0;
        let wobble = (2.0 * PI * self.config.wobble_hz * t).sin() * self.config.wobble_amplitude;
        let spike = if self.config.in_spike(t_ms) {
            self.config.spike_magnitude
        } else {
            0.0
        };
        [
            wobble + self.jitter(),
            self.jitter(),
            1.0 + spike + self.jitter(),
        ]
    }
}

impl AccelSource for SyntheticSource {
    fn is_available(&self) -> bool {
        self.config.available
    }

    fn read(&mut self) -> Result<[f64; 3], SensorError> {
        let t_ms = self.reads * self.config.sample_interval_ms;
        self.reads += 1;
        Ok(self.reading_at(t_ms))
    }
}

/// Generates `count` consecutive readings without running a sampler.
#[cfg(test)]
pub fn build_trace(config: &GeneratorConfig, count: usize) -> Vec<[f64; 3]> {
    let mut source = SyntheticSource::new(config.clone());
    (0..count)
        .filter_map(|_| source.read().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shotcore::math::StatsHelper;

    fn dynamic(reading: &[f64; 3]) -> f64 {
        StatsHelper::dynamic_magnitude(reading[0], reading[1], reading[2])
    }

    #[test]
    fn quiet_trace_stays_below_threshold() {
        let config = GeneratorConfig {
            spike_at_ms: Vec::new(),
            ..Default::default()
        };
        let trace = build_trace(&config, 200);
        assert_eq!(trace.len(), 200);
        assert!(trace.iter().all(|r| dynamic(r) < 1.0));
    }

    #[test]
    fn spikes_land_on_configured_offsets() {
        let config = GeneratorConfig {
            noise: 0.0,
            wobble_amplitude: 0.0,
            spike_at_ms: vec![500],
            ..Default::default()
        };
        let trace = build_trace(&config, 20);
        let spiking: Vec<usize> = trace
            .iter()
            .enumerate()
            .filter(|(_, r)| dynamic(r) > 2.5)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(spiking, vec![10, 11]);
    }

    #[test]
    fn same_seed_reproduces_trace() {
        let config = GeneratorConfig {
            seed: 42,
            ..Default::default()
        };
        assert_eq!(build_trace(&config, 64), build_trace(&config, 64));
    }

    #[test]
    fn unavailable_generator_reports_it() {
        let source = SyntheticSource::new(GeneratorConfig {
            available: false,
            ..Default::default()
        });
        assert!(!source.is_available());
    }
}
