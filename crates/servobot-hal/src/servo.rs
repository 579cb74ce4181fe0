//! [`ServoState`] – the clamped position/target model for one servo.
//!
//! The state owns its [`AngleSink`] so that the in-memory `current` angle and
//! the physical horn can never disagree: `current` is only committed after
//! the sink accepted the write.  A failed write leaves both `current` and
//! `target` at their last-known-good values.
//!
//! Movement happens two ways:
//!
//! * [`ServoState::set_angle_direct`] jumps immediately and pins the target to
//!   the new angle, so a pending interpolation cannot drag it away.
//! * [`ServoState::set_target`] only records where to go; each call to
//!   [`ServoState::step`] then moves at most one step toward it.
//!
//! # Example
//!
//! ```rust
//! use servobot_hal::servo::{ServoState, step_from_range};
//! use servobot_hal::sim::SimServo;
//!
//! let mut servo = ServoState::new(Box::new(SimServo::new("sim0")), step_from_range(180.0, 10))
//!     .expect("sim init must succeed");
//!
//! servo.set_target(0.0);
//! while servo.step().expect("sim write must succeed") {}
//! assert_eq!(servo.angle(), 0.0);
//! ```

use servobot_types::{CENTER_ANGLE_DEG, ServoError, clamp_angle};
use tracing::debug;

use crate::sink::AngleSink;

/// Divide an angular range into `increments` equal steps.
///
/// The default servobot configuration (180° in 10 increments) yields 18°,
/// which is exactly one duty-cycle count of the default PWM timing.
pub fn step_from_range(range_deg: f32, increments: u32) -> f32 {
    range_deg / increments as f32
}

/// Position and target of a single servo, backed by its sink.
pub struct ServoState {
    current: f32,
    target: f32,
    step_deg: f32,
    sink: Box<dyn AngleSink>,
}

impl std::fmt::Debug for ServoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServoState")
            .field("current", &self.current)
            .field("target", &self.target)
            .field("step_deg", &self.step_deg)
            .field("sink", &self.sink.id())
            .finish()
    }
}

impl ServoState {
    /// Create the state and drive the servo to [`CENTER_ANGLE_DEG`].
    ///
    /// # Errors
    ///
    /// * [`ServoError::Config`] if `step_deg` is not a positive finite number.
    /// * [`ServoError::SinkFault`] if the initial centering write fails.  The
    ///   caller should treat this as fatal.
    pub fn new(sink: Box<dyn AngleSink>, step_deg: f32) -> Result<Self, ServoError> {
        if !step_deg.is_finite() || step_deg <= 0.0 {
            return Err(ServoError::Config(format!(
                "step must be a positive number of degrees, got {step_deg}"
            )));
        }
        let mut state = Self {
            current: CENTER_ANGLE_DEG,
            target: CENTER_ANGLE_DEG,
            step_deg,
            sink,
        };
        state.set_angle_direct(CENTER_ANGLE_DEG)?;
        Ok(state)
    }

    /// Record a new target.  The servo does not move until [`step`][Self::step].
    pub fn set_target(&mut self, angle: f32) {
        self.target = clamp_angle(angle);
        debug!(target_deg = self.target, "servo target set");
    }

    /// Jump straight to `angle`, writing the sink, `current` and `target`.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`ServoError::SinkFault`]; the state is unchanged.
    pub fn set_angle_direct(&mut self, angle: f32) -> Result<(), ServoError> {
        let angle = clamp_angle(angle);
        self.sink.write(angle)?;
        self.current = angle;
        self.target = angle;
        debug!(angle_deg = angle, "servo set directly");
        Ok(())
    }

    /// Move at most one step toward the target.
    ///
    /// Returns `Ok(true)` if the servo moved and `Ok(false)` if it was already
    /// on target, in which case the sink is not touched.
    ///
    /// # Errors
    ///
    /// Returns the sink's [`ServoError::SinkFault`]; `current` keeps its
    /// last-known-good value and the next step retries.
    pub fn step(&mut self) -> Result<bool, ServoError> {
        let next = if self.target > self.current {
            self.current + self.step_deg.min(self.target - self.current)
        } else if self.target < self.current {
            self.current - self.step_deg.min(self.current - self.target)
        } else {
            return Ok(false);
        };
        let next = clamp_angle(next);
        self.sink.write(next)?;
        self.current = next;
        Ok(true)
    }

    /// Current physical angle in degrees.
    pub fn angle(&self) -> f32 {
        self.current
    }

    /// Angle the interpolation loop is steering toward.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Maximum change applied by one [`step`][Self::step].
    pub fn step_size(&self) -> f32 {
        self.step_deg
    }

    pub fn is_converged(&self) -> bool {
        self.current == self.target
    }

    /// Identifier of the underlying sink.
    pub fn sink_id(&self) -> &str {
        self.sink.id()
    }
}
