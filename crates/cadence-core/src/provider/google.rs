//! Google Cloud Text-to-Speech provider
//!
//! Audio is requested as MP3, which is fast to download, and converted to
//! PCM locally with ffmpeg. Requires the `gcloud` and `ffmpeg` executables
//! on the path.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::SynthesisProvider;
use crate::audio::{pcm_from_wav, PCM_CODEC};
use crate::config::VoiceConfig;
use crate::error::{Error, Result};

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1beta1/text:synthesize";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisBody<'a> {
    input: TextInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    speaking_rate: f32,
    audio_encoding: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    audio_content: Option<String>,
}

/// Google Cloud TTS client returning 16-bit PCM at a fixed sample rate.
pub struct GoogleTts {
    client: reqwest::blocking::Client,
    sample_rate: u32,
    temp_dir: PathBuf,
    token: Mutex<Option<String>>,
}

impl GoogleTts {
    pub fn new(sample_rate: u32, temp_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            client,
            sample_rate,
            temp_dir: temp_dir.into(),
            token: Mutex::new(None),
        })
    }

    /// Fetch a fresh access token and keep it for later calls.
    pub fn prime_token(&self) -> Result<()> {
        let token = fetch_gcloud_token()?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    fn token(&self) -> Result<String> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            return Ok(token.clone());
        }
        let token = fetch_gcloud_token()?;
        *cached = Some(token.clone());
        Ok(token)
    }

    /// Request MP3 audio for `text`.
    fn request_mp3(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        let body = request_body(text, voice);
        let response = self
            .client
            .post(SYNTHESIZE_URL)
            .bearer_auth(self.token()?)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(&body)
            .send()?;

        let status = response.status();
        let payload = response.text()?;
        if !status.is_success() {
            return Err(Error::SynthesisError(format!(
                "Google TTS returned {}: {}",
                status, payload
            )));
        }
        decode_response(&payload)
    }

    /// Convert MP3 to headerless PCM through ffmpeg.
    fn convert(&self, mp3: &[u8]) -> Result<Vec<u8>> {
        let mut mp3_file = scratch_file(&self.temp_dir, ".mp3")?;
        mp3_file.write_all(mp3)?;
        mp3_file.flush()?;
        let wav_file = scratch_file(&self.temp_dir, ".wav")?;

        let status = Command::new("ffmpeg")
            .arg("-i")
            .arg(mp3_file.path())
            .args(["-acodec", PCM_CODEC, "-ar"])
            .arg(self.sample_rate.to_string())
            .arg(wav_file.path())
            .arg("-y")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::ConversionError(format!("Failed to start ffmpeg: {}", e)))?;

        if !status.success() {
            return Err(Error::ConversionError(format!("ffmpeg exited with {}", status)));
        }

        let reader = BufReader::new(File::open(wav_file.path())?);
        pcm_from_wav(reader)
    }
}

impl SynthesisProvider for GoogleTts {
    fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>> {
        info!("Synthesizing {} chars with {}", text.chars().count(), voice.voice_name);
        let mp3 = self.request_mp3(text, voice)?;
        let pcm = self.convert(&mp3)?;
        debug!("Synthesized {} MP3 bytes into {} PCM bytes", mp3.len(), pcm.len());
        Ok(pcm)
    }

    fn prepare(&self) -> Result<()> {
        self.prime_token()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

fn request_body<'a>(text: &'a str, voice: &'a VoiceConfig) -> SynthesisBody<'a> {
    SynthesisBody {
        input: TextInput { text },
        voice: VoiceSelection {
            language_code: &voice.language_code,
            name: &voice.voice_name,
            ssml_gender: &voice.ssml_gender,
        },
        audio_config: AudioConfig {
            speaking_rate: voice.speaking_rate,
            audio_encoding: "MP3",
        },
    }
}

fn decode_response(payload: &str) -> Result<Vec<u8>> {
    let response: SynthesisResponse = serde_json::from_str(payload)?;
    let content = response
        .audio_content
        .ok_or_else(|| Error::SynthesisError("No audioContent in response".to_string()))?;
    base64::engine::general_purpose::STANDARD
        .decode(content)
        .map_err(|e| Error::SynthesisError(format!("Failed to decode audio: {}", e)))
}

/// Uniquely named file removed when dropped.
fn scratch_file(dir: &Path, suffix: &str) -> Result<NamedTempFile> {
    Ok(tempfile::Builder::new()
        .prefix("cadence_tts_")
        .suffix(suffix)
        .tempfile_in(dir)?)
}

fn fetch_gcloud_token() -> Result<String> {
    let output = Command::new("gcloud")
        .args(["auth", "application-default", "print-access-token"])
        .output()
        .map_err(|e| Error::AuthError(format!("Failed to run gcloud: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::AuthError(format!("gcloud error: {}", stderr.trim())));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(Error::AuthError("gcloud returned an empty token".to_string()));
    }
    Ok(token)
}
