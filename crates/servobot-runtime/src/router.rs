//! Turns free-form chat text into servo actions.

use servobot_types::ServoAction;
use tracing::debug;

use crate::command_table::CommandTable;

/// Trim surrounding whitespace and lower-case.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Result of routing one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// One or more actions, in table order.
    Matched(Vec<ServoAction>),
    Unrecognized,
}

/// Normalizes inbound text and looks it up in a [`CommandTable`].
#[derive(Debug, Clone)]
pub struct CommandRouter {
    table: CommandTable,
}

impl CommandRouter {
    pub fn new(table: CommandTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    pub fn route(&self, text: &str) -> Route {
        let normalized = normalize(text);
        let actions = self.table.lookup(&normalized);
        debug!(text = %normalized, ?actions, "routed message");
        if actions.is_empty() {
            Route::Unrecognized
        } else {
            Route::Matched(actions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_table::MatchPolicy;
    use ServoAction::*;

    fn router(policy: MatchPolicy) -> CommandRouter {
        CommandRouter::new(CommandTable::standard(policy).unwrap())
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Turn LEFT\n"), "turn left");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn mixed_case_input_routes() {
        let r = router(MatchPolicy::Containment);
        assert_eq!(r.route("FULL Left"), Route::Matched(vec![JumpToZero]));
        assert_eq!(r.route("  Angle?  "), Route::Matched(vec![QueryAngle]));
    }

    #[test]
    fn unknown_and_empty_text_is_unrecognized() {
        let r = router(MatchPolicy::Containment);
        assert_eq!(r.route("banana"), Route::Unrecognized);
        assert_eq!(r.route(""), Route::Unrecognized);
    }

    #[test]
    fn compound_message_yields_all_actions_in_table_order() {
        let r = router(MatchPolicy::Containment);
        assert_eq!(
            r.route("What's the angle? Then turn right"),
            Route::Matched(vec![NudgeRight, QueryAngle])
        );
    }

    #[test]
    fn whole_phrase_router_yields_single_action() {
        let r = router(MatchPolicy::WholePhrase);
        assert_eq!(
            r.route("What's the angle? Then turn right"),
            Route::Matched(vec![NudgeRight])
        );
        assert_eq!(r.table().policy(), MatchPolicy::WholePhrase);
    }
}
