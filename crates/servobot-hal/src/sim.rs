//! In-process simulated servo for CI/CD testing without physical hardware.
//!
//! [`SimServo`] records every angle written to it into a shared
//! [`SimHistory`] handle.  The handle stays with the caller after the servo
//! itself has been moved into a [`ServoState`][crate::servo::ServoState], so
//! tests (and the `sim` sink of the CLI) can inspect what the hardware would
//! have seen.
//!
//! # Example
//!
//! ```rust
//! use servobot_hal::sim::SimServo;
//! use servobot_hal::servo::ServoState;
//!
//! let sim = SimServo::new("sim0");
//! let history = sim.history();
//! let servo = ServoState::new(Box::new(sim), 18.0).expect("sim init must succeed");
//!
//! assert_eq!(servo.angle(), 90.0);
//! assert_eq!(history.last(), Some(90.0));
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use servobot_types::ServoError;
use tracing::trace;

use crate::sink::AngleSink;

/// Writes retained by a [`SimHistory`]; older entries are discarded.
pub const HISTORY_LIMIT: usize = 1024;

#[derive(Default)]
struct SimInner {
    writes: VecDeque<f32>,
    fail_writes: bool,
}

/// Shared view of the writes a [`SimServo`] has received.
///
/// Clone it cheaply – all clones observe the same servo.
#[derive(Clone, Default)]
pub struct SimHistory {
    inner: Arc<Mutex<SimInner>>,
}

impl SimHistory {
    fn lock(&self) -> MutexGuard<'_, SimInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The last [`HISTORY_LIMIT`] successfully written angles, oldest first.
    pub fn writes(&self) -> Vec<f32> {
        self.lock().writes.iter().copied().collect()
    }

    /// The most recent successfully written angle.
    pub fn last(&self) -> Option<f32> {
        self.lock().writes.back().copied()
    }

    /// Number of retained writes.
    pub fn len(&self) -> usize {
        self.lock().writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every subsequent write fail with [`ServoError::SinkFault`] until
    /// called again with `false`.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }
}

/// A simulated servo that accepts every angle unless armed to fail.
pub struct SimServo {
    id: String,
    history: SimHistory,
}

impl SimServo {
    /// Create a new simulated servo with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: SimHistory::default(),
        }
    }

    /// A handle onto this servo's write history.
    pub fn history(&self) -> SimHistory {
        self.history.clone()
    }
}

impl AngleSink for SimServo {
    fn id(&self) -> &str {
        &self.id
    }

    fn write(&mut self, angle_deg: f32) -> Result<(), ServoError> {
        let mut inner = self.history.lock();
        if inner.fail_writes {
            return Err(ServoError::SinkFault {
                component: self.id.clone(),
                details: "simulated write failure".to_string(),
            });
        }
        trace!(sink = %self.id, angle_deg, "sim servo write");
        if inner.writes.len() == HISTORY_LIMIT {
            inner.writes.pop_front();
        }
        inner.writes.push_back(angle_deg);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
