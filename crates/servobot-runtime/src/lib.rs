//! `servobot-runtime` – command handling and the main loop
//!
//! Turns chat text into servo motion and paces the motion over time.
//!
//! # Modules
//!
//! - [`command_table`] – [`CommandTable`][command_table::CommandTable]: the
//!   fixed phrase → [`ServoAction`][servobot_types::ServoAction] vocabulary
//!   and its [`MatchPolicy`][command_table::MatchPolicy].
//! - [`router`] – [`CommandRouter`][router::CommandRouter]: normalizes text
//!   and looks it up.
//! - [`reply`] – [`ReplyGenerator`][reply::ReplyGenerator]: randomized
//!   acknowledgements plus the fixed help and angle replies.
//! - [`controller`] – [`ServoController`][controller::ServoController]: the
//!   single owner of the servo; applies actions, steps interpolation and
//!   publishes to the event bus.
//! - [`interpolation`] – [`InterpolationLoop`][interpolation::InterpolationLoop]:
//!   the fixed-period stepping clock.
//! - [`dispatcher`] – [`EventDispatcher`][dispatcher::EventDispatcher]: the
//!   `select!` loop over chat events, ticks and shutdown.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod command_table;
pub mod controller;
pub mod dispatcher;
pub mod interpolation;
pub mod reply;
pub mod router;
pub mod telemetry;

pub use command_table::{CommandTable, MatchPolicy};
pub use controller::ServoController;
pub use dispatcher::{EventDispatcher, ExitReason};
pub use interpolation::{DEFAULT_TICK_INTERVAL, InterpolationLoop};
pub use reply::ReplyGenerator;
pub use router::{CommandRouter, Route};
