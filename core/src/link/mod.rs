pub mod channel;
pub mod message;
pub mod transport;

pub use channel::{channel_link, ChannelLink, PeerControl, PeerInbox};
pub use message::{payload, Command, LinkValue, Notification, Payload};
pub use transport::{LinkEndpoint, LinkEvent, LinkEventReceiver, LinkEventSender, LinkTransport};
