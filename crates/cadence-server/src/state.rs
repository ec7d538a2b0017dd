//! Application state management

use cadence_core::StreamingTts;
use std::sync::Arc;

/// Shared application state
pub struct AppState<P> {
    pub tts: Arc<StreamingTts<P>>,
}

impl<P> AppState<P> {
    pub fn new(tts: Arc<StreamingTts<P>>) -> Self {
        Self { tts }
    }
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            tts: self.tts.clone(),
        }
    }
}
