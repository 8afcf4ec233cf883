use crate::link::message::{Command, Notification, Payload};
use crate::prelude::MonitorResult;
use crate::telemetry::LogManager;

/// Operations a routed command may trigger.
pub trait MonitorOps {
    fn start(&mut self) -> MonitorResult<()>;
    fn stop(&mut self) -> MonitorResult<()>;
    fn notify(&mut self, notification: Notification);
}

/// Dispatches inbound peer commands onto [`MonitorOps`].
///
/// Nothing here is reported back to the peer: failed starts and stops,
/// unknown actions and malformed payloads are logged and dropped.
#[derive(Debug, Clone, Copy)]
pub struct CommandRouter {
    logger: LogManager,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self {
            logger: LogManager::new("router"),
        }
    }

    /// Routes one payload and returns the command it decoded to.
    pub fn route<O: MonitorOps>(&self, message: &Payload, ops: &mut O) -> MonitorResult<Command> {
        let command = Command::parse(message).map_err(|err| {
            self.logger.warn(&format!("dropping inbound message: {}", err));
            err
        })?;

        match &command {
            Command::StartMonitoring => self.absorb("startMonitoring", ops.start()),
            Command::StopMonitoring => self.absorb("stopMonitoring", ops.stop()),
            Command::SessionStatus { is_active } => {
                self.logger
                    .record(&format!("sessionStatus isActive={}", is_active));
                if *is_active {
                    self.absorb("sessionStatus", ops.start());
                } else {
                    self.absorb("sessionStatus", ops.stop());
                }
            }
            Command::Test => ops.notify(Notification::TestResponse),
            Command::Ping => ops.notify(Notification::Pong),
            Command::Unknown(action) => {
                self.logger.warn(&format!("unknown action {:?}", action));
            }
        }
        Ok(command)
    }

    fn absorb(&self, action: &str, result: MonitorResult<()>) {
        match result {
            Ok(()) => self.logger.record(&format!("{} applied", action)),
            Err(err) => self.logger.record(&format!("{} ignored: {}", action, err)),
        }
    }
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}
