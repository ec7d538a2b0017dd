//! Error types for the Cadence speech pacer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Synthesis failed: {0}")]
    SynthesisError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Audio conversion failed: {0}")]
    ConversionError(String),

    #[error("Audio error: {0}")]
    AudioError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Pacing loop is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}
