//! Speech synthesis providers
//!
//! A provider turns text into headerless PCM. Calls block and may take
//! hundreds of milliseconds; callers in async contexts should run them on a
//! blocking thread.

mod cache;
mod google;

pub use cache::{cache_key, CacheKey, CachedProvider};
pub use google::GoogleTts;

use crate::audio::PCM_CODEC;
use crate::config::VoiceConfig;
use crate::error::Result;

/// Text-to-speech backend producing raw PCM.
pub trait SynthesisProvider: Send + Sync {
    /// Synthesize `text` with the given voice, returning raw PCM bytes.
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>>;

    /// One-time warmup before steady-state use.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Sample rate of the returned PCM.
    fn sample_rate(&self) -> u32;

    /// Bytes per sample of the returned PCM.
    fn sample_width(&self) -> u16 {
        2
    }

    /// Codec of the returned PCM.
    fn codec(&self) -> &str {
        PCM_CODEC
    }
}
