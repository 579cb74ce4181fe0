//! Console transport: stdin lines in, replies on stdout.
//!
//! Built on [`ChannelTransport`]; two background tasks shuttle lines from
//! stdin into the event queue and replies from the reply queue to stdout.
//! End of input closes the transport.
//!
//! The printer task finishes once every reply has been written and the
//! transport has been dropped; await its handle before exiting so queued
//! replies are not lost.

use colored::Colorize;
use servobot_middleware::{ChannelPeer, ChannelTransport};
use servobot_types::{ChatEvent, OutboundMessage, ReplyTarget};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Reply target used for every console message.
pub const CONSOLE_TARGET: &str = "console";

/// Start the stdin/stdout pumps.  Returns the transport for the dispatcher
/// and the handle of the reply printer.  Must be called from within a Tokio
/// runtime.
pub fn spawn() -> (ChannelTransport, JoinHandle<()>) {
    start(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

fn start<R, W>(reader: R, writer: W) -> (ChannelTransport, JoinHandle<()>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (transport, ChannelPeer { events, replies }) = ChannelTransport::new(32);

    tokio::spawn(pump_lines(reader, events));
    let printer = tokio::spawn(async move {
        if let Err(e) = print_replies(replies, writer).await {
            warn!(error = %e, "console output failed");
        }
    });

    (transport, printer)
}

/// Write each reply on its own line until the reply queue closes.
async fn print_replies<W>(
    mut replies: mpsc::UnboundedReceiver<OutboundMessage>,
    mut out: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = replies.recv().await {
        out.write_all(format_reply(&message).as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

/// Forward non-blank lines from `reader` as chat messages until EOF.
async fn pump_lines<R>(reader: R, events: mpsc::Sender<ChatEvent>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let event = ChatEvent::Message {
                    text: line,
                    reply_to: ReplyTarget::new(CONSOLE_TARGET),
                };
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("console input closed");
                break;
            }
            Err(e) => {
                let _ = events
                    .send(ChatEvent::TransportError {
                        detail: format!("stdin: {e}"),
                    })
                    .await;
                break;
            }
        }
    }
}

fn format_reply(message: &OutboundMessage) -> String {
    format!("{} {}", "servobot ›".bold().cyan(), message.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use servobot_hal::{ServoState, SimServo, step_from_range};
    use servobot_middleware::EventBus;
    use servobot_runtime::{
        CommandRouter, CommandTable, DEFAULT_TICK_INTERVAL, EventDispatcher, ExitReason,
        InterpolationLoop, MatchPolicy, ReplyGenerator, ServoController,
    };
    use tokio::io::AsyncReadExt;
    use tokio::sync::watch;

    fn controller() -> ServoController {
        let servo =
            ServoState::new(Box::new(SimServo::new("sim0")), step_from_range(180.0, 10)).unwrap();
        ServoController::new(
            servo,
            CommandRouter::new(CommandTable::standard(MatchPolicy::Containment).unwrap()),
            ReplyGenerator::seeded(5),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn replies_to_piped_input_are_written_before_exit() {
        let (out_tx, mut out_rx) = tokio::io::duplex(4096);
        let (transport, printer) = start(&b"angle\nturn left\nangle\n"[..], out_tx);
        let (_shutdown, shutdown_rx) = watch::channel(false);

        let mut dispatcher = EventDispatcher::new(
            controller(),
            transport,
            InterpolationLoop::new(DEFAULT_TICK_INTERVAL).unwrap(),
            shutdown_rx,
        );
        assert_eq!(dispatcher.run().await, ExitReason::TransportClosed);
        drop(dispatcher);
        printer.await.unwrap();

        let mut output = String::new();
        out_rx.read_to_string(&mut output).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3, "{output}");
        assert!(lines[0].ends_with("Current angle:  90.00°"));
        assert!(lines[2].ends_with("Current angle:  72.00°"));
    }

    #[tokio::test]
    async fn printer_stops_when_reply_queue_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(OutboundMessage::new(ReplyTarget::new(CONSOLE_TARGET), "hi"))
            .unwrap();
        drop(tx);
        let mut out = Vec::new();
        print_replies(rx, &mut out).await.unwrap();
        assert!(String::from_utf8(out).unwrap().ends_with("hi\n"));
    }

    #[tokio::test]
    async fn lines_become_console_messages() {
        let (tx, mut rx) = mpsc::channel(8);
        pump_lines(&b"turn left\n\n   \nANGLE\n"[..], tx).await;

        let mut texts = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ChatEvent::Message { text, reply_to } => {
                    assert_eq!(reply_to.as_str(), CONSOLE_TARGET);
                    texts.push(text);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(texts, ["turn left", "ANGLE"]);
    }

    #[tokio::test]
    async fn eof_closes_the_event_queue() {
        let (tx, mut rx) = mpsc::channel(1);
        pump_lines(&b""[..], tx).await;
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn reply_contains_message_text() {
        let line = format_reply(&OutboundMessage::new(
            ReplyTarget::new(CONSOLE_TARGET),
            "Current angle:  90.00°",
        ));
        assert!(line.ends_with("Current angle:  90.00°"));
    }
}
