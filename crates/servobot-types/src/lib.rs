use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lower mechanical limit of the servo, in degrees.
pub const MIN_ANGLE_DEG: f32 = 0.0;
/// Upper mechanical limit of the servo, in degrees.
pub const MAX_ANGLE_DEG: f32 = 180.0;
/// Resting position the servo is driven to at startup.
pub const CENTER_ANGLE_DEG: f32 = 90.0;

/// Clamp `angle` into `[MIN_ANGLE_DEG, MAX_ANGLE_DEG]`.
///
/// Out-of-range values are never an error anywhere in servobot; they are
/// silently pulled back to the nearest limit.  `NaN` maps to the lower limit
/// so the result is always a valid servo position.
pub fn clamp_angle(angle: f32) -> f32 {
    if angle.is_nan() {
        return MIN_ANGLE_DEG;
    }
    angle.clamp(MIN_ANGLE_DEG, MAX_ANGLE_DEG)
}

/// Every action a chat command can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServoAction {
    /// Jump one step counter-clockwise immediately.
    NudgeLeft,
    /// Jump one step clockwise immediately.
    NudgeRight,
    /// Steer toward 0°.
    JumpToZero,
    /// Steer toward the center position.
    JumpToCenter,
    /// Steer toward 180°.
    JumpToMax,
    /// Report the current angle.
    QueryAngle,
    /// Reply with the command vocabulary.
    ShowHelp,
}

impl ServoAction {
    /// `true` for actions that change the servo position or target.
    pub fn moves_servo(self) -> bool {
        !matches!(self, ServoAction::QueryAngle | ServoAction::ShowHelp)
    }
}

/// Opaque destination a reply is sent back to (a chat channel id, or
/// `"console"` for the local console transport).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplyTarget(pub String);

impl ReplyTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReplyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inbound traffic from a chat transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A user message; `text` is raw and not yet normalized.
    Message { text: String, reply_to: ReplyTarget },
    /// A recoverable transport problem (dropped socket, server error frame).
    TransportError { detail: String },
    /// The server rejected our credentials.  Terminal.
    InvalidAuth,
}

/// A reply queued for delivery on a chat transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub reply_to: ReplyTarget,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(reply_to: ReplyTarget, text: impl Into<String>) -> Self {
        Self {
            reply_to,
            text: text.into(),
        }
    }
}

/// Unified event wrapper for the internal event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "servobot-runtime::controller"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the internal event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// The sink was written; `angle_deg` is the new physical position.
    AngleChanged { angle_deg: f32, target_deg: f32 },
    /// A chat command was recognized and applied.
    CommandHandled { action: ServoAction },
    /// A chat message matched no command.
    Unrecognized { text: String },
    /// The sink rejected a write; the last-known-good angle was kept.
    SinkFault { component: String, details: String },
}

/// Error type shared by every servobot crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServoError {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Sink Fault on {component}: {details}")]
    SinkFault { component: String, details: String },

    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid command pattern: {0}")]
    InvalidPattern(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_values_in_range() {
        for a in [-1e9, -180.0, -0.5, 0.0, 45.5, 90.0, 180.0, 180.01, 1e9] {
            let c = clamp_angle(a);
            assert!((MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&c), "{a} clamped to {c}");
        }
        assert_eq!(clamp_angle(f32::INFINITY), MAX_ANGLE_DEG);
        assert_eq!(clamp_angle(f32::NEG_INFINITY), MIN_ANGLE_DEG);
        assert_eq!(clamp_angle(f32::NAN), MIN_ANGLE_DEG);
    }

    #[test]
    fn clamp_is_idempotent() {
        for a in [-720.0, -18.0, 0.0, 17.9, 90.0, 179.99, 198.0, f32::NAN] {
            let once = clamp_angle(a);
            assert_eq!(clamp_angle(once), once);
        }
    }

    #[test]
    fn in_range_values_pass_through_untouched() {
        assert_eq!(clamp_angle(72.25), 72.25);
        assert_eq!(clamp_angle(CENTER_ANGLE_DEG), CENTER_ANGLE_DEG);
    }

    #[test]
    fn only_motion_actions_move_the_servo() {
        assert!(ServoAction::NudgeLeft.moves_servo());
        assert!(ServoAction::JumpToMax.moves_servo());
        assert!(!ServoAction::QueryAngle.moves_servo());
        assert!(!ServoAction::ShowHelp.moves_servo());
    }

    #[test]
    fn chat_event_uses_tagged_representation() {
        let ev = ChatEvent::Message {
            text: "turn left".to_string(),
            reply_to: ReplyTarget::new("C042"),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""kind":"message""#));
        let back: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn servo_error_display() {
        let err = ServoError::MissingCredential("SERVOBOT_TOKEN".to_string());
        assert!(err.to_string().contains("SERVOBOT_TOKEN"));

        let err2 = ServoError::SinkFault {
            component: "pwm0/1".to_string(),
            details: "EBUSY".to_string(),
        };
        assert!(err2.to_string().contains("pwm0/1"));
    }

    #[test]
    fn event_new_stamps_source() {
        let event = Event::new(
            "servobot-runtime::controller",
            EventPayload::AngleChanged {
                angle_deg: 72.0,
                target_deg: 0.0,
            },
        );
        assert_eq!(event.source, "servobot-runtime::controller");
        let other = Event::new("x", EventPayload::Unrecognized { text: "banana".into() });
        assert_ne!(event.id, other.id);
    }
}
