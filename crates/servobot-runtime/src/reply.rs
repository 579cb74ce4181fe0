//! Chat replies.
//!
//! Acknowledgements and "not understood" responses are drawn at random from
//! fixed pools so the bot sounds less mechanical.  The generator owns its
//! RNG; seed it with [`ReplyGenerator::seeded`] for reproducible output.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Sent after a movement command has been accepted.
pub const ACKNOWLEDGEMENTS: [&str; 4] = [
    "Umm ok, I can do that for you!",
    "You must be management, snooping around.",
    "Looking for waldo? Let me see what I can do.",
    "Getting right on that boss!",
];

/// Sent when no command matched.
pub const NOT_UNDERSTOOD: [&str; 3] = [
    "Not sure I know what you mean. Type `help` and such.",
    "You must be looking for the `help`?",
    "Are you sure that is a valid command?",
];

pub const HELP_MESSAGE: &str = "I am a servo control bot! You can tell me to `turn left`,`turn right`, `center`, or ask me for my current `angle`. You can even say things like `full left` or `full right`.";

/// Sent when the servo hardware rejected a command.
pub const FAULT_MESSAGE: &str =
    "My servo isn't responding, so I'm staying where I was. Try again in a bit.";

/// Format the current angle with two decimals.
pub fn format_angle(angle_deg: f32) -> String {
    format!("Current angle:  {angle_deg:.2}°")
}

/// What happened to a command, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// A movement command was accepted.
    Acknowledged,
    /// The current angle was requested.
    Angle(f32),
    Help,
    Unrecognized,
    /// The servo rejected the command.
    Fault,
}

pub struct ReplyGenerator {
    rng: SmallRng,
}

impl ReplyGenerator {
    /// Deterministic generator; the same seed yields the same reply sequence.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Generator seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: SmallRng::from_os_rng(),
        }
    }

    /// The reply text for `outcome`.
    pub fn reply(&mut self, outcome: Outcome) -> String {
        match outcome {
            Outcome::Acknowledged => self.pick(&ACKNOWLEDGEMENTS).to_string(),
            Outcome::Angle(angle) => format_angle(angle),
            Outcome::Help => HELP_MESSAGE.to_string(),
            Outcome::Unrecognized => self.pick(&NOT_UNDERSTOOD).to_string(),
            Outcome::Fault => FAULT_MESSAGE.to_string(),
        }
    }

    fn pick(&mut self, pool: &[&'static str]) -> &'static str {
        pool[self.rng.random_range(0..pool.len())]
    }
}

impl std::fmt::Debug for ReplyGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_uses_two_decimals_and_degree_sign() {
        assert_eq!(format_angle(90.0), "Current angle:  90.00°");
        assert_eq!(format_angle(0.0), "Current angle:  0.00°");
        assert_eq!(format_angle(17.999), "Current angle:  18.00°");
    }

    #[test]
    fn acknowledgement_comes_from_pool() {
        let mut replies = ReplyGenerator::seeded(7);
        for _ in 0..20 {
            let text = replies.reply(Outcome::Acknowledged);
            assert!(ACKNOWLEDGEMENTS.contains(&text.as_str()), "{text}");
        }
    }

    #[test]
    fn not_understood_comes_from_pool() {
        let mut replies = ReplyGenerator::from_os_rng();
        for _ in 0..20 {
            let text = replies.reply(Outcome::Unrecognized);
            assert!(NOT_UNDERSTOOD.contains(&text.as_str()), "{text}");
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = ReplyGenerator::seeded(42);
        let mut b = ReplyGenerator::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.reply(Outcome::Acknowledged), b.reply(Outcome::Acknowledged));
            assert_eq!(a.reply(Outcome::Unrecognized), b.reply(Outcome::Unrecognized));
        }
    }

    #[test]
    fn every_acknowledgement_is_reachable() {
        let mut replies = ReplyGenerator::seeded(1);
        let seen: std::collections::HashSet<String> =
            (0..200).map(|_| replies.reply(Outcome::Acknowledged)).collect();
        assert_eq!(seen.len(), ACKNOWLEDGEMENTS.len());
    }

    #[test]
    fn fixed_replies() {
        let mut replies = ReplyGenerator::seeded(0);
        assert_eq!(replies.reply(Outcome::Help), HELP_MESSAGE);
        assert_eq!(replies.reply(Outcome::Fault), FAULT_MESSAGE);
        assert_eq!(replies.reply(Outcome::Angle(72.0)), "Current angle:  72.00°");
    }
}
