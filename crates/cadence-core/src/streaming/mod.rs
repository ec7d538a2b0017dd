//! Paced streaming of synthesized speech
//!
//! Ingestion and emission share one mutex-guarded [`PlaybackState`]. The
//! ingestion side only replaces or extends the frame buffer; the pacing
//! loop only reads at the cursor and advances it.

mod module;
mod pacer;
mod playback;
mod utterance;

pub use module::StreamingTts;
pub use pacer::pacing_delay;
pub use playback::{PlaybackSnapshot, PlaybackState};
pub use utterance::Utterance;
