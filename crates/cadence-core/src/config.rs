//! Configuration types for the speech pacer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Top-level configuration for a streaming TTS instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Directory for scratch files created during audio conversion
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

/// Voice selection passed to the synthesis provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// BCP-47 language code (e.g. en-US, de-DE)
    #[serde(default = "default_language_code")]
    pub language_code: String,

    /// Provider voice identity
    #[serde(default = "default_voice_name")]
    pub voice_name: String,

    #[serde(default = "default_ssml_gender")]
    pub ssml_gender: String,

    #[serde(default = "default_speaking_rate")]
    pub speaking_rate: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language_code: default_language_code(),
            voice_name: default_voice_name(),
            ssml_gender: default_ssml_gender(),
            speaking_rate: default_speaking_rate(),
        }
    }
}

/// Output stream shape and re-synthesis policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Bytes per sample
    #[serde(default = "default_sample_width")]
    pub sample_width: u16,

    /// Duration of one emitted frame in milliseconds
    #[serde(default = "default_frame_duration_ms")]
    pub frame_duration_ms: u64,

    /// Character growth that triggers re-synthesis of an uncommitted utterance
    #[serde(default = "default_resynthesis_threshold")]
    pub resynthesis_threshold: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            sample_width: default_sample_width(),
            frame_duration_ms: default_frame_duration_ms(),
            resynthesis_threshold: default_resynthesis_threshold(),
        }
    }
}

impl StreamingConfig {
    pub const CHANNELS: u16 = 1;

    /// Samples in one frame
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.frame_duration_ms / 1000) as usize
    }

    /// Bytes in one frame
    pub fn frame_bytes(&self) -> usize {
        self.samples_per_frame() * self.sample_width as usize
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_duration_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::ConfigError("sample_rate must be positive".to_string()));
        }
        if !(1..=4).contains(&self.sample_width) {
            return Err(Error::ConfigError(format!(
                "sample_width must be between 1 and 4 bytes, got {}",
                self.sample_width
            )));
        }
        if self.frame_bytes() == 0 {
            return Err(Error::ConfigError(format!(
                "frame_duration_ms {} yields empty frames at {} Hz",
                self.frame_duration_ms, self.sample_rate
            )));
        }
        Ok(())
    }
}

/// On-disk synthesis cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
        }
    }
}

fn default_language_code() -> String {
    "en-US".to_string()
}

fn default_voice_name() -> String {
    "en-US-Wavenet-A".to_string()
}

fn default_ssml_gender() -> String {
    "FEMALE".to_string()
}

fn default_speaking_rate() -> f32 {
    1.4
}

fn default_sample_rate() -> u32 {
    44100
}

fn default_sample_width() -> u16 {
    2
}

fn default_frame_duration_ms() -> u64 {
    50
}

fn default_resynthesis_threshold() -> usize {
    40
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("data"))
        .join("cadence")
        .join("tts_cache")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_is_fifty_ms_of_16bit_audio() {
        let config = StreamingConfig::default();
        assert_eq!(config.samples_per_frame(), 2205);
        assert_eq!(config.frame_bytes(), 4410);
        assert_eq!(config.frame_duration(), Duration::from_millis(50));
    }

    #[test]
    fn frame_bytes_for_8khz() {
        let config = StreamingConfig {
            sample_rate: 8000,
            ..Default::default()
        };
        assert_eq!(config.frame_bytes(), 800);
    }

    #[test]
    fn validate_rejects_degenerate_shapes() {
        let zero_rate = StreamingConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(matches!(zero_rate.validate(), Err(Error::ConfigError(_))));

        let wide = StreamingConfig {
            sample_width: 8,
            ..Default::default()
        };
        assert!(wide.validate().is_err());

        let tiny = StreamingConfig {
            sample_rate: 10,
            frame_duration_ms: 50,
            ..Default::default()
        };
        assert!(tiny.validate().is_err());

        assert!(StreamingConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: TtsConfig =
            serde_json::from_str(r#"{"voice": {"voice_name": "de-DE-Wavenet-B"}}"#).unwrap();
        assert_eq!(config.voice.voice_name, "de-DE-Wavenet-B");
        assert_eq!(config.voice.language_code, "en-US");
        assert_eq!(config.streaming.resynthesis_threshold, 40);
        assert!(config.cache.enabled);
    }
}
