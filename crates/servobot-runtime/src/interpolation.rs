//! Fixed-period clock that paces servo interpolation.
//!
//! The loop itself never touches the servo; the dispatcher awaits
//! [`InterpolationLoop::tick`] alongside inbound chat and calls
//! [`ServoController::tick`][crate::controller::ServoController::tick] on
//! every firing.  Keeping the clock separate means chat handling and
//! stepping never run concurrently.

use std::time::Duration;

use servobot_types::ServoError;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Default tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug)]
pub struct InterpolationLoop {
    interval: Interval,
    period: Duration,
}

impl InterpolationLoop {
    /// Start a clock that first fires one `period` from now.  Must be called
    /// from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::Config`] for a zero period.
    pub fn new(period: Duration) -> Result<Self, ServoError> {
        if period.is_zero() {
            return Err(ServoError::Config(
                "tick interval must be greater than zero".to_string(),
            ));
        }
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        // A slow command handler delays the next tick instead of causing a
        // burst of catch-up steps.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ok(Self { interval, period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next tick.  Cancel-safe.
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}
