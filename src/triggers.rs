//! Phrase-based detection of "remember this" moments in chat messages.
//!
//! [`detect_triggers`] lower-cases the message and checks it against three fixed
//! phrase lists. Substring containment only: a message may match several kinds,
//! each reported once with a fixed confidence.

use serde::Serialize;

use crate::formation::FormationIntent;
use crate::memory::types::Category;

const EXPLICIT_PHRASES: &[&str] = &[
    "remember that",
    "remember this",
    "please remember",
    "don't forget",
    "do not forget",
    "keep in mind",
    "make a note",
    "note that",
    "for future reference",
    "going forward",
    "from now on",
];

const CORRECTION_PHRASES: &[&str] = &[
    "actually,",
    "actually it",
    "that's wrong",
    "that is wrong",
    "that's not right",
    "that is not right",
    "that's incorrect",
    "not quite",
    "i meant",
    "correction:",
    "no, it",
    "no, the",
    "you're wrong",
    "it should be",
];

const PREFERENCE_PHRASES: &[&str] = &[
    "i prefer",
    "i'd prefer",
    "i would prefer",
    "i like",
    "i don't like",
    "i dislike",
    "i hate",
    "i love",
    "i always",
    "i never",
    "i usually",
    "i want you to",
    "please always",
    "please never",
    "my preference",
    "rather than",
];

/// Which phrase list matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    ExplicitRemember,
    Correction,
    Preference,
}

impl TriggerKind {
    pub fn confidence(&self) -> f64 {
        match self {
            Self::ExplicitRemember => 0.9,
            Self::Correction => 0.8,
            Self::Preference => 0.7,
        }
    }

    fn phrases(&self) -> &'static [&'static str] {
        match self {
            Self::ExplicitRemember => EXPLICIT_PHRASES,
            Self::Correction => CORRECTION_PHRASES,
            Self::Preference => PREFERENCE_PHRASES,
        }
    }
}

/// A detected trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub confidence: f64,
    /// The first phrase from the kind's list found in the message.
    pub phrase: &'static str,
}

impl Trigger {
    /// Memory category a trigger of this kind proposes.
    pub fn category(&self) -> Category {
        match self.kind {
            TriggerKind::ExplicitRemember => Category::Fact,
            TriggerKind::Correction => Category::Correction,
            TriggerKind::Preference => Category::Preference,
        }
    }

    /// Formation intent for `message`, carrying this trigger's category and confidence.
    pub fn intent(&self, message: &str) -> FormationIntent {
        FormationIntent::new(message.trim(), self.category()).with_confidence(self.confidence)
    }
}

/// Scan `message` for trigger phrases. Returns triggers in the order
/// explicit-remember, correction, preference.
pub fn detect_triggers(message: &str) -> Vec<Trigger> {
    let lowered = message.to_lowercase();
    [
        TriggerKind::ExplicitRemember,
        TriggerKind::Correction,
        TriggerKind::Preference,
    ]
    .into_iter()
    .filter_map(|kind| {
        kind.phrases()
            .iter()
            .find(|phrase| lowered.contains(*phrase))
            .map(|phrase| Trigger {
                kind,
                confidence: kind.confidence(),
                phrase: *phrase,
            })
    })
    .collect()
}
