pub mod controller;
pub mod feedback;
pub mod router;

pub use controller::{MonitorHandle, MonitoringController};
pub use feedback::{LogFeedback, ShotFeedback};
pub use router::{CommandRouter, MonitorOps};
