//! [`ServoController`] – the single owner of the servo.
//!
//! Chat commands and interpolation ticks both funnel through the controller,
//! so the servo state is only ever touched from one place.  Every sink write
//! is published on [`Topic::Telemetry`], every handled message on
//! [`Topic::Commands`], and every hardware failure on [`Topic::SystemAlerts`].
//!
//! A rejected write never stops the bot: the servo keeps its last-known-good
//! position, the user gets [`FAULT_MESSAGE`][crate::reply::FAULT_MESSAGE],
//! and the next command or tick tries again.

use servobot_hal::ServoState;
use servobot_middleware::{EventBus, Topic};
use servobot_types::{
    CENTER_ANGLE_DEG, Event, EventPayload, MAX_ANGLE_DEG, MIN_ANGLE_DEG, ServoAction, ServoError,
};
use tracing::{debug, info, warn};

use crate::reply::{Outcome, ReplyGenerator};
use crate::router::{CommandRouter, Route};

const SOURCE: &str = "servobot-runtime::controller";

pub struct ServoController {
    servo: ServoState,
    router: CommandRouter,
    replies: ReplyGenerator,
    bus: EventBus,
}

impl ServoController {
    pub fn new(
        servo: ServoState,
        router: CommandRouter,
        replies: ReplyGenerator,
        bus: EventBus,
    ) -> Self {
        Self {
            servo,
            router,
            replies,
            bus,
        }
    }

    pub fn servo(&self) -> &ServoState {
        &self.servo
    }

    /// A handle on the bus this controller publishes to.
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    /// Route `text` and apply every action it names, in order.
    ///
    /// Returns one reply per action, or a single "not understood" reply when
    /// nothing matched.
    pub fn handle_message(&mut self, text: &str) -> Vec<String> {
        match self.router.route(text) {
            Route::Matched(actions) => actions.into_iter().map(|a| self.apply(a)).collect(),
            Route::Unrecognized => {
                debug!(text, "no command matched");
                self.publish(
                    Topic::Commands,
                    EventPayload::Unrecognized {
                        text: text.to_string(),
                    },
                );
                vec![self.replies.reply(Outcome::Unrecognized)]
            }
        }
    }

    /// Apply one action and return the reply for it.
    pub fn apply(&mut self, action: ServoAction) -> String {
        let outcome = match self.execute(action) {
            Ok(outcome) => {
                info!(
                    ?action,
                    angle_deg = self.servo.angle(),
                    target_deg = self.servo.target(),
                    "command applied"
                );
                self.publish(Topic::Commands, EventPayload::CommandHandled { action });
                outcome
            }
            Err(e) => {
                self.report_fault(&e);
                Outcome::Fault
            }
        };
        self.replies.reply(outcome)
    }

    /// Advance the interpolation by one step.
    ///
    /// Returns `Ok(true)` if the servo moved.
    ///
    /// # Errors
    ///
    /// Returns the sink's error after reporting it on the bus.
    pub fn tick(&mut self) -> Result<bool, ServoError> {
        match self.servo.step() {
            Ok(moved) => {
                if moved {
                    self.publish_angle();
                }
                Ok(moved)
            }
            Err(e) => {
                self.report_fault(&e);
                Err(e)
            }
        }
    }

    fn execute(&mut self, action: ServoAction) -> Result<Outcome, ServoError> {
        match action {
            ServoAction::NudgeLeft => self.nudge(-self.servo.step_size()),
            ServoAction::NudgeRight => self.nudge(self.servo.step_size()),
            ServoAction::JumpToZero => Ok(self.retarget(MIN_ANGLE_DEG)),
            ServoAction::JumpToCenter => Ok(self.retarget(CENTER_ANGLE_DEG)),
            ServoAction::JumpToMax => Ok(self.retarget(MAX_ANGLE_DEG)),
            ServoAction::QueryAngle => Ok(Outcome::Angle(self.servo.angle())),
            ServoAction::ShowHelp => Ok(Outcome::Help),
        }
    }

    fn nudge(&mut self, delta_deg: f32) -> Result<Outcome, ServoError> {
        self.servo.set_angle_direct(self.servo.angle() + delta_deg)?;
        self.publish_angle();
        Ok(Outcome::Acknowledged)
    }

    fn retarget(&mut self, angle_deg: f32) -> Outcome {
        self.servo.set_target(angle_deg);
        Outcome::Acknowledged
    }

    fn publish_angle(&self) {
        self.publish(
            Topic::Telemetry,
            EventPayload::AngleChanged {
                angle_deg: self.servo.angle(),
                target_deg: self.servo.target(),
            },
        );
    }

    fn report_fault(&self, error: &ServoError) {
        warn!(
            sink = %self.servo.sink_id(),
            angle_deg = self.servo.angle(),
            error = %error,
            "servo write failed, holding last known position"
        );
        let (component, details) = match error {
            ServoError::SinkFault { component, details } => (component.clone(), details.clone()),
            other => (self.servo.sink_id().to_string(), other.to_string()),
        };
        self.publish(
            Topic::SystemAlerts,
            EventPayload::SinkFault { component, details },
        );
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        self.bus.publish_to(topic, Event::new(SOURCE, payload));
    }
}

impl std::fmt::Debug for ServoController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServoController")
            .field("servo", &self.servo)
            .field("policy", &self.router.table().policy())
            .finish_non_exhaustive()
    }
}
