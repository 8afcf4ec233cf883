use crate::link::message::Payload;
use crate::prelude::MonitorResult;
use tokio::sync::{mpsc, oneshot};

/// Something that happened on the link, delivered to the controller.
#[derive(Debug)]
pub enum LinkEvent {
    /// The transport finished setting itself up.
    ActivationComplete(Result<(), String>),
    ReachabilityChanged(bool),
    /// Inbound payload. `reply` is present when the peer expects an answer.
    Message {
        payload: Payload,
        reply: Option<oneshot::Sender<Payload>>,
    },
}

pub type LinkEventSender = mpsc::UnboundedSender<LinkEvent>;
pub type LinkEventReceiver = mpsc::UnboundedReceiver<LinkEvent>;

/// Outbound half of the channel to the paired device.
///
/// `send` must not block. Delivery while the peer is unreachable is the
/// transport's problem; an error only reports that the payload was lost.
pub trait LinkTransport: Send {
    fn send(&self, payload: Payload) -> MonitorResult<()>;
    fn is_reachable(&self) -> bool;
}

/// A transport together with the stream of events it produces.
pub struct LinkEndpoint {
    pub transport: Box<dyn LinkTransport>,
    pub events: LinkEventReceiver,
}

impl LinkEndpoint {
    pub fn new(transport: impl LinkTransport + 'static, events: LinkEventReceiver) -> Self {
        Self {
            transport: Box::new(transport),
            events,
        }
    }
}
