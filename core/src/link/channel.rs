use crate::link::message::Payload;
use crate::link::transport::{LinkEndpoint, LinkEvent, LinkEventSender, LinkTransport};
use crate::prelude::{MonitorError, MonitorResult};
use crate::telemetry::LogManager;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

struct LinkState {
    reachable: bool,
    pending: VecDeque<Payload>,
    capacity: usize,
}

/// In-process link. Payloads sent while the peer is unreachable are held in
/// a bounded queue and flushed, in order, once it becomes reachable again.
pub struct ChannelLink {
    state: Arc<Mutex<LinkState>>,
    outbound: mpsc::UnboundedSender<Payload>,
    logger: LogManager,
}

/// Peer-side controls: reachability, activation and inbound commands.
#[derive(Clone)]
pub struct PeerControl {
    state: Arc<Mutex<LinkState>>,
    outbound: mpsc::UnboundedSender<Payload>,
    events: LinkEventSender,
    logger: LogManager,
}

/// Peer-side receiver of everything the wearable delivered.
pub struct PeerInbox {
    inbox: mpsc::UnboundedReceiver<Payload>,
}

/// Builds a connected link. The peer starts out unreachable and inactive.
pub fn channel_link(capacity: usize) -> (LinkEndpoint, PeerControl, PeerInbox) {
    let state = Arc::new(Mutex::new(LinkState {
        reachable: false,
        pending: VecDeque::new(),
        capacity: capacity.max(1),
    }));
    let (outbound, inbox) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    let link = ChannelLink {
        state: state.clone(),
        outbound: outbound.clone(),
        logger: LogManager::new("link"),
    };
    let control = PeerControl {
        state,
        outbound,
        events: events_tx,
        logger: LogManager::new("link"),
    };

    (
        LinkEndpoint::new(link, events_rx),
        control,
        PeerInbox { inbox },
    )
}

impl LinkTransport for ChannelLink {
    fn send(&self, payload: Payload) -> MonitorResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| MonitorError::TransportSendFailure("link state poisoned".into()))?;

        if state.reachable {
            return self
                .outbound
                .send(payload)
                .map_err(|_| MonitorError::TransportSendFailure("peer closed".into()));
        }

        state.pending.push_back(payload);
        if state.pending.len() > state.capacity {
            state.pending.pop_front();
            self.logger
                .warn("peer unreachable and outbound queue full, dropped oldest payload");
            return Err(MonitorError::TransportSendFailure(
                "outbound queue overflow".into(),
            ));
        }
        self.logger.trace(&format!(
            "peer unreachable, queued payload ({} pending)",
            state.pending.len()
        ));
        Ok(())
    }

    fn is_reachable(&self) -> bool {
        self.state.lock().map(|s| s.reachable).unwrap_or(false)
    }
}

impl PeerControl {
    /// Changes reachability, flushing anything queued when it comes back.
    pub fn set_reachable(&self, reachable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reachable = reachable;
            if reachable {
                while let Some(payload) = state.pending.pop_front() {
                    if let Err(mpsc::error::SendError(payload)) = self.outbound.send(payload) {
                        // Inbox gone; keep the undelivered tail queued.
                        state.pending.push_front(payload);
                        self.logger.warn(&format!(
                            "peer closed during flush, {} payloads left undelivered",
                            state.pending.len()
                        ));
                        break;
                    }
                }
            }
        }
        let _ = self.events.send(LinkEvent::ReachabilityChanged(reachable));
    }

    pub fn activate(&self) {
        let _ = self.events.send(LinkEvent::ActivationComplete(Ok(())));
    }

    pub fn fail_activation(&self, reason: impl Into<String>) {
        let _ = self
            .events
            .send(LinkEvent::ActivationComplete(Err(reason.into())));
    }

    /// Delivers a command without asking for a reply.
    pub fn send_command(&self, payload: Payload) -> bool {
        self.events
            .send(LinkEvent::Message {
                payload,
                reply: None,
            })
            .is_ok()
    }

    /// Delivers a command and returns the receiver for its acknowledgement.
    pub fn request(&self, payload: Payload) -> oneshot::Receiver<Payload> {
        let (reply, rx) = oneshot::channel();
        let _ = self.events.send(LinkEvent::Message {
            payload,
            reply: Some(reply),
        });
        rx
    }

    pub fn pending(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or(0)
    }
}

impl PeerInbox {
    pub async fn recv(&mut self) -> Option<Payload> {
        self.inbox.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Payload> {
        self.inbox.try_recv().ok()
    }

    pub fn drain(&mut self) -> Vec<Payload> {
        let mut drained = Vec::new();
        while let Ok(payload) = self.inbox.try_recv() {
            drained.push(payload);
        }
        drained
    }
}
