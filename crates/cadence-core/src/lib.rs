//! Cadence Core - Paced Speech Streaming for Incremental Dialogue
//!
//! This crate turns variable-latency text-to-speech results into a steady
//! stream of fixed-duration PCM frames for a dialogue pipeline.
//!
//! # Architecture
//!
//! - A [`SynthesisProvider`] turns text into raw PCM (Google Cloud TTS,
//!   optionally behind a content-hash cache)
//! - Ingestion accumulates incremental text updates and re-synthesizes on
//!   commit or after enough growth
//! - A pacing loop emits exactly one frame per tick, falling back to silence
//!
//! # Example
//!
//! ```ignore
//! use cadence_core::{GoogleTts, StreamingTts, TextUnit, TtsConfig, UpdateMessage, UpdateType};
//!
//! let config = TtsConfig::default();
//! let provider = GoogleTts::new(config.streaming.sample_rate, config.temp_dir.clone())?;
//! let tts = StreamingTts::new(config, provider)?;
//! tts.setup()?;
//! tts.prepare_run()?;
//!
//! let mut audio = tts.subscribe();
//! let hello = TextUnit::new("Hello");
//! tts.ingest_update(&UpdateMessage::from_unit(hello, UpdateType::Commit))?;
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod iu;
pub mod provider;
pub mod streaming;

pub use config::{CacheConfig, StreamingConfig, TtsConfig, VoiceConfig};
pub use error::{Error, Result};
pub use iu::{AudioUnit, TextUnit, UpdateMessage, UpdateType};
pub use provider::{cache_key, CacheKey, CachedProvider, GoogleTts, SynthesisProvider};
pub use streaming::{PlaybackSnapshot, StreamingTts};
