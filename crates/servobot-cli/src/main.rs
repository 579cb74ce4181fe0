//! `servobot` – chat-controlled servo bot
//!
//! This binary wires the stack together:
//!
//! 1. Loads `~/.servobot/config.toml` (defaults when absent) and the
//!    `SERVOBOT_TOKEN` credential.
//! 2. Opens the configured sink and centers the servo.
//! 3. Connects the chat transport (WebSocket gateway or console).
//! 4. Runs the dispatcher until credentials are rejected, the transport
//!    closes, or **Ctrl-C** is pressed.

mod config;
mod console;

use colored::Colorize;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use config::{Config, SinkKind, TransportKind};
use servobot_hal::{AngleSink, PwmServo, PwmTiming, ServoState, SimServo, SysfsPwmChannel};
use servobot_middleware::{ChatTransport, EventBus, RtmTransport, Topic};
use servobot_runtime::telemetry;
use servobot_runtime::{
    CommandRouter, CommandTable, EventDispatcher, ExitReason, InterpolationLoop, ReplyGenerator,
    ServoController,
};
use servobot_types::{EventPayload, ServoError};

fn main() -> ExitCode {
    let telemetry = telemetry::init_tracing("servobot");
    info!(otlp = telemetry.is_exporting(), "tracing initialised");

    print_banner();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red().bold());
            return ExitCode::FAILURE;
        }
    };
    info!(path = %config::config_path().display(), ?cfg, "configuration loaded");

    let token = match config::load_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("{}: {e}", "Startup error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start async runtime: {e}", "Startup error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(run(cfg, token));
    // The console reader may be parked on a blocking stdin read.
    runtime.shutdown_timeout(Duration::from_millis(200));

    let code = match outcome {
        Ok(reason) => {
            match reason {
                ExitReason::InvalidAuth => {
                    println!("{}", "  ✗ The chat service rejected the token.".red())
                }
                ExitReason::TransportClosed => {
                    println!("{}", "  ✓ Chat connection closed.".green())
                }
                ExitReason::Shutdown => println!("{}", "  ✓ Exiting servobot.".green()),
            }
            info!(?reason, "servobot stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("{}: {e}", "Startup error".red().bold());
            ExitCode::FAILURE
        }
    };
    drop(telemetry);
    code
}

async fn run(cfg: Config, token: Zeroizing<String>) -> Result<ExitReason, ServoError> {
    let bus = EventBus::default();
    tokio::spawn(print_alerts(bus.clone()));

    let servo = ServoState::new(build_sink(&cfg)?, cfg.step_deg())?;
    info!(
        sink = %servo.sink_id(),
        step_deg = servo.step_size(),
        angle_deg = servo.angle(),
        "servo ready"
    );

    let router = CommandRouter::new(CommandTable::standard(cfg.match_policy)?);
    let replies = match cfg.reply_seed {
        Some(seed) => ReplyGenerator::seeded(seed),
        None => ReplyGenerator::from_os_rng(),
    };
    let controller = ServoController::new(servo, router, replies, bus);
    let clock = InterpolationLoop::new(cfg.tick_interval())?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let handler_tx = Arc::clone(&shutdown_tx);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        let _ = handler_tx.send(true);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; graceful shutdown on Ctrl-C will not be available");
    }

    let reason = match cfg.transport {
        TransportKind::Rtm => {
            println!("  Connecting to {} …", cfg.rtm_url.dimmed());
            let transport = RtmTransport::connect(cfg.rtm_url.clone(), token);
            dispatch(controller, transport, clock, shutdown_rx).await
        }
        TransportKind::Console => {
            println!(
                "  Console mode. Try {} or {}.\n",
                "turn left".bold().cyan(),
                "help".bold().cyan()
            );
            let (transport, printer) = console::spawn();
            let reason = dispatch(controller, transport, clock, shutdown_rx).await;
            // The dispatcher is gone, so the reply queue is closed and the
            // printer exits after writing what is left.
            if let Err(e) = printer.await {
                warn!(error = %e, "console printer failed");
            }
            reason
        }
    };
    drop(shutdown_tx);
    Ok(reason)
}

async fn dispatch<T: ChatTransport>(
    controller: ServoController,
    transport: T,
    clock: InterpolationLoop,
    shutdown: watch::Receiver<bool>,
) -> ExitReason {
    EventDispatcher::new(controller, transport, clock, shutdown)
        .run()
        .await
}

fn build_sink(cfg: &Config) -> Result<Box<dyn AngleSink>, ServoError> {
    match cfg.sink {
        SinkKind::Sim => Ok(Box::new(SimServo::new("sim0"))),
        SinkKind::Sysfs => {
            let timing = PwmTiming::default();
            let channel = SysfsPwmChannel::open(cfg.pwm_chip, cfg.pwm_channel, timing)?;
            Ok(Box::new(PwmServo::new(channel, timing)))
        }
    }
}

/// Print sink faults from the bus as they happen.
async fn print_alerts(bus: EventBus) {
    let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
    loop {
        match alerts.recv().await {
            Ok(event) => {
                if let EventPayload::SinkFault { component, details } = event.payload {
                    eprintln!(
                        "{} {}: {}",
                        "⚠  servo fault".yellow().bold(),
                        component.bold(),
                        details
                    );
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "alert printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   ____                 __        __ "#.bold().cyan());
    println!("{}", r#"  / __/__ _____  _____ / /  ___  / /_"#.bold().cyan());
    println!("{}", r#" _\ \/ -_) __/ |/ / _ \/ _ \/ _ \/ __/"#.bold().cyan());
    println!("{}", r#"/___/\__/_/  |___/\___/_.__/\___/\__/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "servobot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Chat-controlled servo");
    println!();
}
