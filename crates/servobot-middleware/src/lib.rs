//! `servobot-middleware` – The Nervous System
//!
//! Moves messages between the chat world, the servo controller and any
//! observers without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`transport`] – the [`ChatTransport`] trait and the in-memory
//!   [`ChannelTransport`].
//! - [`rtm`] – [`RtmTransport`], a WebSocket client for Slack-RTM-style chat
//!   gateways.

pub mod bus;
pub mod rtm;
pub mod transport;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use rtm::RtmTransport;
pub use transport::{ChannelPeer, ChannelTransport, ChatTransport};
