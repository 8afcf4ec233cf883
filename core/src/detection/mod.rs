pub mod shot;

pub use shot::{DetectorState, ShotDetector};
