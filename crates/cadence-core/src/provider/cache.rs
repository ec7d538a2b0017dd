//! Content-addressed synthesis cache

use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::SynthesisProvider;
use crate::config::{CacheConfig, VoiceConfig};
use crate::error::{Error, Result};

/// Opaque 16-byte key identifying one synthesis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 16]);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Derive the cache key for synthesizing `text` with `voice` into the given
/// output format.
pub fn cache_key(text: &str, voice: &VoiceConfig, codec: &str, sample_rate: u32) -> CacheKey {
    let mut hasher = Sha256::new();
    let sample_rate = sample_rate.to_string();
    let speaking_rate = voice.speaking_rate.to_string();
    for field in [
        text,
        voice.voice_name.as_str(),
        voice.language_code.as_str(),
        codec,
        sample_rate.as_str(),
        speaking_rate.as_str(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();

    let mut key = [0u8; 16];
    key.copy_from_slice(&digest[..16]);
    CacheKey(key)
}

/// Provider decorator that serves repeated requests from disk.
pub struct CachedProvider<P> {
    inner: P,
    config: CacheConfig,
}

impl<P: SynthesisProvider> CachedProvider<P> {
    /// Wrap `inner`, creating the cache directory if caching is enabled.
    pub fn new(inner: P, config: CacheConfig) -> Result<Self> {
        if config.enabled {
            std::fs::create_dir_all(&config.dir).map_err(|e| {
                Error::CacheError(format!("Failed to create {:?}: {}", config.dir, e))
            })?;
        }
        Ok(Self { inner, config })
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Where the result for `text` is (or would be) stored.
    pub fn cache_path(&self, text: &str, voice: &VoiceConfig) -> PathBuf {
        let key = cache_key(text, voice, self.inner.codec(), self.inner.sample_rate());
        self.config.dir.join(key.to_string())
    }

    fn store(&self, path: &Path, audio: &[u8]) -> Result<()> {
        let mut file = NamedTempFile::new_in(&self.config.dir)?;
        file.write_all(audio)?;
        file.persist(path)
            .map_err(|e| Error::CacheError(format!("Failed to persist {:?}: {}", path, e)))?;
        Ok(())
    }
}

impl<P: SynthesisProvider> SynthesisProvider for CachedProvider<P> {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        if !self.config.enabled {
            return self.inner.synthesize(text, voice);
        }

        let path = self.cache_path(text, voice);
        match std::fs::read(&path) {
            Ok(audio) => {
                debug!("Cache hit {:?} ({} bytes)", path, audio.len());
                return Ok(audio);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to read cache entry {:?}: {}", path, e),
        }

        let audio = self.inner.synthesize(text, voice)?;
        if let Err(e) = self.store(&path, &audio) {
            warn!("Failed to write cache entry {:?}: {}", path, e);
        }
        Ok(audio)
    }

    fn prepare(&self) -> Result<()> {
        self.inner.prepare()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn sample_width(&self) -> u16 {
        self.inner.sample_width()
    }

    fn codec(&self) -> &str {
        self.inner.codec()
    }
}
