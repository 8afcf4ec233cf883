//! Core shot-detection and companion-link logic for the wearable shot tracker.
//!
//! The sampler feeds the detector, the detector feeds the monitoring
//! controller, and the controller is the single owner of monitoring state.
//! Everything that can arrive asynchronously (sensor readings, link events,
//! user requests) is posted into the controller's actor task.

pub mod clock;
pub mod control;
pub mod detection;
pub mod link;
pub mod math;
pub mod prelude;
pub mod sensor;
pub mod telemetry;

pub use clock::{Clock, FixedEpochClock, SystemClock};
pub use control::{MonitorHandle, MonitoringController};
pub use prelude::{
    AccelSample, ConnectionStatus, MonitorConfig, MonitorError, MonitorResult, MonitoringState,
    SensorError, ShotEvent,
};
