//! `servobot-hal` – Hardware Abstraction Layer
//!
//! Everything between a desired angle and the servo horn.
//!
//! # Modules
//!
//! - [`sink`] – [`AngleSink`][sink::AngleSink]: the one-method trait every
//!   servo driver implements.
//! - [`servo`] – [`ServoState`][servo::ServoState]: the clamped
//!   current/target model with bounded per-tick stepping.
//! - [`pwm`] – angle → duty-cycle conversion
//!   ([`PwmServo`][pwm::PwmServo]) and a Linux sysfs PWM backend.
//! - [`sim`] – [`SimServo`][sim::SimServo]: an in-process sink for headless
//!   runs and tests.

pub mod pwm;
pub mod servo;
pub mod sim;
pub mod sink;

pub use pwm::{PwmChannel, PwmServo, PwmTiming, SysfsPwmChannel};
pub use servo::{ServoState, step_from_range};
pub use sim::{SimHistory, SimServo};
pub use sink::AngleSink;
