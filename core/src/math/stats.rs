/// Resting magnitude of a g-unit accelerometer, subtracted to remove gravity.
pub const GRAVITY_G: f64 = 1.0;

pub struct StatsHelper;

impl StatsHelper {
    pub fn magnitude(x: f64, y: f64, z: f64) -> f64 {
        (x * x + y * y + z * z).sqrt()
    }

    /// Magnitude with the resting 1 g bias removed.
    pub fn dynamic_magnitude(x: f64, y: f64, z: f64) -> f64 {
        Self::magnitude(x, y, z) - GRAVITY_G
    }
}
