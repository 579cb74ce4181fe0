//! Real-time-messaging (RTM) WebSocket chat gateway.
//!
//! [`RtmTransport`] keeps a WebSocket connection to a Slack-RTM-style
//! gateway alive on a background task and bridges it to the dispatcher
//! through channels:
//!
//! * **Handshake** – the token travels as `Authorization: Bearer <token>`.
//!   An HTTP 401/403 answer is reported as [`ChatEvent::InvalidAuth`] and the
//!   task stops for good.
//! * **Inbound** – `message` frames become [`ChatEvent::Message`], `error`
//!   frames become [`ChatEvent::TransportError`], an `invalid_auth` frame is
//!   terminal.  Everything else is ignored.
//! * **Outbound** – replies are serialised as
//!   `{"id":N,"type":"message","channel":C,"text":T}` with a strictly
//!   increasing `id`.
//! * **Reconnect** – any other failure is reported as a
//!   [`ChatEvent::TransportError`] and the task reconnects after
//!   [`RECONNECT_DELAY`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use servobot_types::{ChatEvent, OutboundMessage, ReplyTarget, ServoError};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderValue, header::AUTHORIZATION};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::transport::ChatTransport;

/// Pause between a lost connection and the next attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Inbound events buffered between the socket task and the dispatcher.
const INBOUND_CAPACITY: usize = 64;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket-backed [`ChatTransport`].
///
/// Dropping the transport aborts the background connection task.
pub struct RtmTransport {
    inbound: mpsc::Receiver<ChatEvent>,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    task: JoinHandle<()>,
}

impl RtmTransport {
    /// Start connecting to `url`.  Must be called from within a Tokio
    /// runtime; connection progress is reported through [`ChatTransport::recv`].
    pub fn connect(url: impl Into<String>, token: Zeroizing<String>) -> Self {
        Self::connect_with_delay(url, token, RECONNECT_DELAY)
    }

    /// Like [`connect`][Self::connect] with a custom reconnect delay.
    pub fn connect_with_delay(
        url: impl Into<String>,
        token: Zeroizing<String>,
        reconnect_delay: Duration,
    ) -> Self {
        let (events, inbound) = mpsc::channel(INBOUND_CAPACITY);
        let (outbound, replies) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(
            url.into(),
            token,
            reconnect_delay,
            events,
            replies,
        ));
        Self {
            inbound,
            outbound,
            task,
        }
    }
}

impl Drop for RtmTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[async_trait]
impl ChatTransport for RtmTransport {
    async fn recv(&mut self) -> Option<ChatEvent> {
        self.inbound.recv().await
    }

    fn send(&self, message: OutboundMessage) -> Result<(), ServoError> {
        self.outbound
            .send(message)
            .map_err(|_| ServoError::Transport("gateway task has stopped".to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire format
// ─────────────────────────────────────────────────────────────────────────────

/// Translate one inbound gateway frame.  Returns `None` for frames servobot
/// does not care about (presence, typing, acks, bot echoes, …).
pub fn parse_frame(text: &str) -> Option<ChatEvent> {
    let json: Value = serde_json::from_str(text).ok()?;
    match json.get("type").and_then(Value::as_str)? {
        "message" => {
            // Edits, joins and other bots' chatter carry a subtype or bot_id.
            if json.get("subtype").is_some() || json.get("bot_id").is_some() {
                return None;
            }
            let text = json.get("text").and_then(Value::as_str)?;
            let channel = json.get("channel").and_then(Value::as_str)?;
            Some(ChatEvent::Message {
                text: text.to_string(),
                reply_to: ReplyTarget::new(channel),
            })
        }
        "error" => {
            let detail = json
                .pointer("/error/msg")
                .and_then(Value::as_str)
                .unwrap_or("unspecified gateway error");
            Some(ChatEvent::TransportError {
                detail: detail.to_string(),
            })
        }
        "invalid_auth" => Some(ChatEvent::InvalidAuth),
        _ => None,
    }
}

/// Serialise an outbound reply.
pub fn encode_message(id: u64, message: &OutboundMessage) -> String {
    json!({
        "id": id,
        "type": "message",
        "channel": message.reply_to.as_str(),
        "text": message.text,
    })
    .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection task
// ─────────────────────────────────────────────────────────────────────────────

enum SessionEnd {
    /// Connection lost; worth reconnecting.
    Lost(String),
    /// The gateway rejected our credentials.
    InvalidAuth,
    /// The transport was dropped; nobody is listening any more.
    Abandoned,
}

async fn run_connection(
    url: String,
    token: Zeroizing<String>,
    reconnect_delay: Duration,
    events: mpsc::Sender<ChatEvent>,
    mut replies: mpsc::UnboundedReceiver<OutboundMessage>,
) {
    let mut next_id: u64 = 1;
    loop {
        let end = match open(&url, &token).await {
            Ok(ws) => {
                info!(url = %url, "chat gateway connected");
                session(ws, &events, &mut replies, &mut next_id).await
            }
            Err(ServoError::InvalidCredentials(detail)) => {
                warn!(url = %url, %detail, "chat gateway rejected credentials");
                SessionEnd::InvalidAuth
            }
            Err(e) => SessionEnd::Lost(e.to_string()),
        };

        match end {
            SessionEnd::Lost(detail) => {
                if events.send(ChatEvent::TransportError { detail }).await.is_err() {
                    return;
                }
            }
            SessionEnd::InvalidAuth => {
                let _ = events.send(ChatEvent::InvalidAuth).await;
                return;
            }
            SessionEnd::Abandoned => return,
        }

        debug!(delay_ms = reconnect_delay.as_millis() as u64, "reconnecting to chat gateway");
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn open(url: &str, token: &str) -> Result<WsStream, ServoError> {
    let mut request = url
        .into_client_request()
        .map_err(|e| ServoError::Transport(format!("invalid gateway url {url}: {e}")))?;

    let bearer = Zeroizing::new(format!("Bearer {token}"));
    let mut header = HeaderValue::from_str(&bearer).map_err(|_| {
        ServoError::InvalidCredentials("token contains characters not allowed in a header".to_string())
    })?;
    header.set_sensitive(true);
    request.headers_mut().insert(AUTHORIZATION, header);

    match connect_async(request).await {
        Ok((ws, _response)) => Ok(ws),
        Err(tungstenite::Error::Http(response))
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Err(ServoError::InvalidCredentials(format!(
                "gateway answered {}",
                response.status()
            )))
        }
        Err(e) => Err(ServoError::Transport(format!("connect {url}: {e}"))),
    }
}

async fn session(
    ws: WsStream,
    events: &mpsc::Sender<ChatEvent>,
    replies: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    next_id: &mut u64,
) -> SessionEnd {
    let (mut ws_tx, mut ws_rx) = ws.split();

    loop {
        tokio::select! {
            frame = ws_rx.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => match parse_frame(text.as_str()) {
                        Some(ChatEvent::InvalidAuth) => return SessionEnd::InvalidAuth,
                        Some(event) => {
                            if events.send(event).await.is_err() {
                                return SessionEnd::Abandoned;
                            }
                        }
                        None => {}
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Lost("gateway closed the connection".to_string());
                    }
                    Some(Err(e)) => return SessionEnd::Lost(format!("gateway read error: {e}")),
                    Some(Ok(_)) => {}
                }
            }
            reply = replies.recv() => {
                let Some(message) = reply else {
                    return SessionEnd::Abandoned;
                };
                let frame = encode_message(*next_id, &message);
                *next_id += 1;
                if let Err(e) = ws_tx.send(Message::Text(frame.into())).await {
                    return SessionEnd::Lost(format!("gateway write error: {e}"));
                }
            }
        }
    }
}
