//! Frame buffer and playback cursor

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::audio::{silence_frame, Frame};

/// Buffered frames plus the position of the next one to emit.
#[derive(Debug)]
pub struct PlaybackState {
    frames: Vec<Frame>,
    cursor: usize,
    /// A committed utterance is still playing out
    drain_pending: bool,
    /// Most recent input unit, for grounding emitted audio
    last_input: Option<Uuid>,
    silence: Frame,
}

/// Point-in-time view of the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub cursor: usize,
    pub buffered_frames: usize,
    pub drain_pending: bool,
}

impl PlaybackState {
    pub fn new(frame_bytes: usize) -> Self {
        Self {
            frames: Vec::new(),
            cursor: 0,
            drain_pending: false,
            last_input: None,
            silence: silence_frame(frame_bytes),
        }
    }

    /// Return to the initial empty state.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.cursor = 0;
        self.drain_pending = false;
        self.last_input = None;
    }

    /// Install newly synthesized frames.
    ///
    /// While a committed utterance is draining the frames are appended after
    /// it; otherwise they replace the buffer. The cursor is left untouched.
    pub fn load(&mut self, frames: Vec<Frame>) {
        if self.drain_pending {
            debug!(
                "Appending {} frames behind {} draining frames",
                frames.len(),
                self.frames.len()
            );
            self.frames.extend(frames);
        } else {
            debug!(
                "Replacing {} buffered frames with {} (cursor at {})",
                self.frames.len(),
                frames.len(),
                self.cursor
            );
            self.frames = frames;
        }
    }

    pub fn mark_committed(&mut self) {
        self.drain_pending = true;
    }

    pub fn set_last_input(&mut self, id: Uuid) {
        self.last_input = Some(id);
    }

    pub fn last_input(&self) -> Option<Uuid> {
        self.last_input
    }

    /// Produce the frame for one pacing tick.
    ///
    /// Once the buffer is exhausted silence is returned, and a pending drain
    /// completes by clearing the buffer.
    pub fn tick(&mut self) -> Frame {
        if let Some(frame) = self.frames.get(self.cursor) {
            let frame = frame.clone();
            self.cursor += 1;
            return frame;
        }

        if self.drain_pending {
            debug!("Committed audio drained after {} frames", self.frames.len());
            self.cursor = 0;
            self.frames.clear();
            self.drain_pending = false;
        }
        self.silence.clone()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            cursor: self.cursor,
            buffered_frames: self.frames.len(),
            drain_pending: self.drain_pending,
        }
    }
}
