//! [`CommandTable`] – the fixed vocabulary mapping phrases to servo actions.
//!
//! Each entry pairs a regular-expression pattern with a [`ServoAction`].  The
//! table is built once at startup and never mutated.  How input text is
//! matched against it is governed by a [`MatchPolicy`]:
//!
//! * [`MatchPolicy::Containment`] – an entry matches when its pattern occurs
//!   anywhere in the text, and **every** matching entry fires, in table
//!   order.  `"turn left then turn right"` therefore fires both nudges, and
//!   `"recenter"` counts as `center`.
//! * [`MatchPolicy::WholePhrase`] – patterns must sit on word boundaries and
//!   only the first matching entry fires.
//!
//! # Example
//!
//! ```rust
//! use servobot_runtime::command_table::{CommandTable, MatchPolicy};
//! use servobot_types::ServoAction;
//!
//! let table = CommandTable::standard(MatchPolicy::Containment).unwrap();
//! assert_eq!(
//!     table.lookup("turn left and tell me the angle"),
//!     vec![ServoAction::NudgeLeft, ServoAction::QueryAngle],
//! );
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use servobot_types::{ServoAction, ServoError};

/// How normalized input is matched against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Substring containment; all matching entries fire.
    #[default]
    Containment,
    /// Word-bounded match; the first matching entry wins.
    WholePhrase,
}

impl std::str::FromStr for MatchPolicy {
    type Err = ServoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "containment" => Ok(MatchPolicy::Containment),
            "whole_phrase" | "whole-phrase" => Ok(MatchPolicy::WholePhrase),
            other => Err(ServoError::Config(format!("unknown match policy '{other}'"))),
        }
    }
}

/// The servobot vocabulary, in dispatch order.
pub const STANDARD_VOCABULARY: &[(&str, ServoAction)] = &[
    ("turn left", ServoAction::NudgeLeft),
    ("turn right", ServoAction::NudgeRight),
    ("full left", ServoAction::JumpToZero),
    ("center", ServoAction::JumpToCenter),
    ("full right", ServoAction::JumpToMax),
    ("angle", ServoAction::QueryAngle),
    ("help", ServoAction::ShowHelp),
];

/// One immutable (pattern, action) pair.
#[derive(Debug, Clone)]
pub struct CommandEntry {
    phrase: String,
    pattern: Regex,
    action: ServoAction,
}

impl CommandEntry {
    fn compile(phrase: &str, action: ServoAction, policy: MatchPolicy) -> Result<Self, ServoError> {
        let source = match policy {
            MatchPolicy::Containment => phrase.to_string(),
            MatchPolicy::WholePhrase => format!(r"\b(?:{phrase})\b"),
        };
        let pattern = Regex::new(&source)
            .map_err(|e| ServoError::InvalidPattern(format!("'{phrase}': {e}")))?;
        Ok(Self {
            phrase: phrase.to_string(),
            pattern,
            action,
        })
    }

    /// The pattern as written in the vocabulary.
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn action(&self) -> ServoAction {
        self.action
    }

    /// `true` if this entry matches already-normalized text.
    pub fn matches(&self, normalized: &str) -> bool {
        self.pattern.is_match(normalized)
    }
}

/// Ordered, immutable command vocabulary.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
    policy: MatchPolicy,
}

impl CommandTable {
    /// Build a table from `(pattern, action)` pairs.  Patterns are regular
    /// expressions matched against lower-cased text.
    ///
    /// # Errors
    ///
    /// Returns [`ServoError::InvalidPattern`] if a pattern does not compile.
    pub fn new(
        vocabulary: &[(&str, ServoAction)],
        policy: MatchPolicy,
    ) -> Result<Self, ServoError> {
        let entries = vocabulary
            .iter()
            .map(|(phrase, action)| CommandEntry::compile(phrase, *action, policy))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries, policy })
    }

    /// The [`STANDARD_VOCABULARY`] under `policy`.
    pub fn standard(policy: MatchPolicy) -> Result<Self, ServoError> {
        Self::new(STANDARD_VOCABULARY, policy)
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Actions fired by `normalized`, in table order.  Empty when nothing
    /// matches.
    pub fn lookup(&self, normalized: &str) -> Vec<ServoAction> {
        let mut hits = self
            .entries
            .iter()
            .filter(|entry| entry.matches(normalized))
            .map(CommandEntry::action);
        match self.policy {
            MatchPolicy::Containment => hits.collect(),
            MatchPolicy::WholePhrase => hits.next().into_iter().collect(),
        }
    }
}
