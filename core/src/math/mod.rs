pub mod stats;

pub use stats::{StatsHelper, GRAVITY_G};
