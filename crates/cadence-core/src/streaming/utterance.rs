//! Accumulated text of the current turn

use uuid::Uuid;

use crate::iu::{TextUnit, UpdateMessage, UpdateType};

/// Text fragments of the utterance being spoken, and what was last
/// synthesized from them.
#[derive(Debug, Default)]
pub struct Utterance {
    units: Vec<TextUnit>,
    last_synthesized: String,
}

impl Utterance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of updates. Returns whether the batch committed the
    /// utterance, and the last unit it referenced.
    pub fn apply(&mut self, message: &UpdateMessage<TextUnit>) -> (bool, Option<Uuid>) {
        let mut committed = false;
        let mut last = None;
        for (unit, update_type) in message.iter() {
            match update_type {
                UpdateType::Add => self.units.push(unit.clone()),
                UpdateType::Revoke => self.units.retain(|u| u.id != unit.id),
                UpdateType::Commit => committed = true,
            }
            last = Some(unit.id);
        }
        (committed, last)
    }

    pub fn text(&self) -> String {
        self.units.iter().map(|u| u.text.as_str()).collect()
    }

    /// Whether `text` warrants a new synthesis: always on commit, otherwise
    /// only once it has grown by more than `threshold` characters.
    pub fn needs_synthesis(&self, text: &str, committed: bool, threshold: usize) -> bool {
        if committed {
            return true;
        }
        let grown = text
            .chars()
            .count()
            .saturating_sub(self.last_synthesized.chars().count());
        grown > threshold
    }

    pub fn mark_synthesized(&mut self, text: String) {
        self.last_synthesized = text;
    }

    /// Forget everything; the next ADD starts a fresh utterance.
    pub fn clear(&mut self) {
        self.units.clear();
        self.last_synthesized.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
