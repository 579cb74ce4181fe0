//! [`EventDispatcher`] – the bot's main loop.
//!
//! One task waits on three sources at once: inbound chat events, the
//! interpolation clock, and the shutdown signal.  Whichever fires first is
//! handled to completion before the next wait, so the controller is never
//! entered from two places at once.
//!
//! ```text
//!   ChatTransport ──recv──┐
//!   InterpolationLoop ────┼──► select! ──► ServoController ──► replies
//!   shutdown (watch) ─────┘
//! ```
//!
//! The loop ends on bad credentials, when the transport closes, or when the
//! shutdown flag is raised (or its sender dropped).

use servobot_middleware::ChatTransport;
use servobot_types::{ChatEvent, OutboundMessage, ReplyTarget};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::controller::ServoController;
use crate::interpolation::InterpolationLoop;

/// Why [`EventDispatcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The chat service rejected the token.
    InvalidAuth,
    /// The transport will deliver no more events.
    TransportClosed,
    Shutdown,
}

pub struct EventDispatcher<T: ChatTransport> {
    controller: ServoController,
    transport: T,
    clock: InterpolationLoop,
    shutdown: watch::Receiver<bool>,
}

impl<T: ChatTransport> EventDispatcher<T> {
    pub fn new(
        controller: ServoController,
        transport: T,
        clock: InterpolationLoop,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            controller,
            transport,
            clock,
            shutdown,
        }
    }

    pub fn controller(&self) -> &ServoController {
        &self.controller
    }

    /// Run until bad credentials, transport close, or shutdown.
    pub async fn run(&mut self) -> ExitReason {
        info!(
            tick_ms = self.clock.period().as_millis() as u64,
            angle_deg = self.controller.servo().angle(),
            "dispatcher started"
        );
        if *self.shutdown.borrow_and_update() {
            return ExitReason::Shutdown;
        }

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow_and_update() {
                        info!("shutdown requested");
                        return ExitReason::Shutdown;
                    }
                }
                event = self.transport.recv() => {
                    let Some(event) = event else {
                        info!("chat transport closed");
                        return ExitReason::TransportClosed;
                    };
                    if let Some(reason) = self.handle_event(event) {
                        return reason;
                    }
                }
                _ = self.clock.tick() => {
                    if let Err(e) = self.controller.tick() {
                        debug!(error = %e, "interpolation step failed, retrying next tick");
                    }
                }
            }
        }
    }

    fn handle_event(&mut self, event: ChatEvent) -> Option<ExitReason> {
        match event {
            ChatEvent::Message { text, reply_to } => {
                debug!(channel = %reply_to, text = %text, "message received");
                for reply in self.controller.handle_message(&text) {
                    self.send(&reply_to, reply);
                }
                None
            }
            ChatEvent::TransportError { detail } => {
                warn!(detail = %detail, "chat transport error");
                None
            }
            ChatEvent::InvalidAuth => {
                error!("Bad credentials");
                Some(ExitReason::InvalidAuth)
            }
        }
    }

    fn send(&self, reply_to: &ReplyTarget, text: String) {
        if let Err(e) = self
            .transport
            .send(OutboundMessage::new(reply_to.clone(), text))
        {
            warn!(channel = %reply_to, error = %e, "reply dropped");
        }
    }
}
