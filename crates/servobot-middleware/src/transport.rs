//! The chat transport seam.
//!
//! servobot never speaks a chat protocol directly.  The dispatcher pulls
//! [`ChatEvent`]s from a [`ChatTransport`] and pushes replies back through
//! it; adapters translate those into whatever the outside world speaks.
//!
//! # Overview
//!
//! - [`ChatTransport`] – the trait every transport must implement.
//! - [`ChannelTransport`] – in-memory transport backed by Tokio channels.
//!   The other ends live in a [`ChannelPeer`]; used by the console frontend
//!   and by tests.
//! - [`RtmTransport`][crate::rtm::RtmTransport] – WebSocket chat gateway.

use async_trait::async_trait;
use servobot_types::{ChatEvent, OutboundMessage, ServoError};
use tokio::sync::mpsc;

/// Every chat transport must implement this trait.
///
/// # Contract
///
/// * `recv` – yields the next inbound [`ChatEvent`], or `None` once the
///   transport is closed for good.  Must be cancel-safe: the dispatcher
///   polls it inside `tokio::select!`.
///
/// * `send` – queues a reply without blocking.  Delivery is best-effort.
#[async_trait]
pub trait ChatTransport: Send {
    async fn recv(&mut self) -> Option<ChatEvent>;

    /// # Errors
    ///
    /// Returns [`ServoError::Transport`] if the outbound side has shut down.
    fn send(&self, message: OutboundMessage) -> Result<(), ServoError>;
}

/// In-memory [`ChatTransport`].
pub struct ChannelTransport {
    inbound: mpsc::Receiver<ChatEvent>,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
}

/// The far ends of a [`ChannelTransport`]: inject events, collect replies.
pub struct ChannelPeer {
    pub events: mpsc::Sender<ChatEvent>,
    pub replies: mpsc::UnboundedReceiver<OutboundMessage>,
}

impl ChannelTransport {
    /// Create a transport whose inbound queue holds up to `capacity` events.
    pub fn new(capacity: usize) -> (Self, ChannelPeer) {
        let (events, inbound) = mpsc::channel(capacity);
        let (outbound, replies) = mpsc::unbounded_channel();
        (
            Self { inbound, outbound },
            ChannelPeer { events, replies },
        )
    }
}

#[async_trait]
impl ChatTransport for ChannelTransport {
    async fn recv(&mut self) -> Option<ChatEvent> {
        self.inbound.recv().await
    }

    fn send(&self, message: OutboundMessage) -> Result<(), ServoError> {
        self.outbound
            .send(message)
            .map_err(|_| ServoError::Transport("reply channel closed".to_string()))
    }
}
