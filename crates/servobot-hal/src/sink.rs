//! [`AngleSink`] – the boundary between servobot and the signal-generation
//! hardware.
//!
//! A sink accepts an angle in degrees and does whatever translation the
//! hardware needs (PWM duty cycle, serial packet, …).  The rest of servobot
//! only ever talks to the trait, so drivers can be swapped without touching
//! command interpretation or interpolation.

use servobot_types::ServoError;

/// Anything that can physically position a servo horn.
pub trait AngleSink: Send {
    /// Stable identifier used in logs and fault reports, e.g. `"pwm0/1"`.
    fn id(&self) -> &str;

    /// Drive the servo to `angle_deg`.
    ///
    /// Callers always pass a value already clamped to `[0, 180]`.
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::SinkFault`] if the hardware rejects the write.
    fn write(&mut self, angle_deg: f32) -> Result<(), ServoError>;
}
