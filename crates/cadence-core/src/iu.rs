//! Incremental units exchanged with the host dialogue pipeline

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of change an update applies to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    Add,
    Revoke,
    Commit,
}

/// A fragment of generated text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: Uuid,
    pub text: String,
}

impl TextUnit {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), text)
    }

    pub fn with_id(id: Uuid, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// One frame of synthesized speech.
#[derive(Debug, Clone)]
pub struct AudioUnit {
    pub id: Uuid,
    /// Input unit this audio was produced for
    pub grounded_in: Option<Uuid>,
    pub raw_audio: Bytes,
    /// Number of samples in `raw_audio`
    pub nframes: usize,
    pub rate: u32,
    pub sample_width: u16,
    pub channels: u16,
}

impl AudioUnit {
    pub fn new(
        grounded_in: Option<Uuid>,
        raw_audio: Bytes,
        rate: u32,
        sample_width: u16,
        channels: u16,
    ) -> Self {
        let nframes = raw_audio.len() / (sample_width as usize * channels as usize).max(1);
        Self {
            id: Uuid::new_v4(),
            grounded_in,
            raw_audio,
            nframes,
            rate,
            sample_width,
            channels,
        }
    }
}

/// An ordered batch of unit updates.
#[derive(Debug, Clone)]
pub struct UpdateMessage<T> {
    updates: Vec<(T, UpdateType)>,
}

impl<T> UpdateMessage<T> {
    pub fn new() -> Self {
        Self {
            updates: Vec::new(),
        }
    }

    pub fn from_unit(unit: T, update_type: UpdateType) -> Self {
        Self {
            updates: vec![(unit, update_type)],
        }
    }

    pub fn push(&mut self, unit: T, update_type: UpdateType) {
        self.updates.push((unit, update_type));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, UpdateType)> {
        self.updates.iter().map(|(unit, ut)| (unit, *ut))
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }
}

impl<T> Default for UpdateMessage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(T, UpdateType)> for UpdateMessage<T> {
    fn from_iter<I: IntoIterator<Item = (T, UpdateType)>>(iter: I) -> Self {
        Self {
            updates: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for UpdateMessage<T> {
    type Item = (T, UpdateType);
    type IntoIter = std::vec::IntoIter<(T, UpdateType)>;

    fn into_iter(self) -> Self::IntoIter {
        self.updates.into_iter()
    }
}
