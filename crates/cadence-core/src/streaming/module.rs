//! Streaming TTS: ingestion, pacing loop and lifecycle

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::pacer;
use super::playback::{PlaybackSnapshot, PlaybackState};
use super::utterance::Utterance;
use crate::audio::chunk_frames;
use crate::config::{StreamingConfig, TtsConfig};
use crate::error::{Error, Result};
use crate::iu::{AudioUnit, TextUnit, UpdateMessage};
use crate::provider::SynthesisProvider;

/// Frames a subscriber may fall behind before it starts skipping.
const AUDIO_CHANNEL_CAPACITY: usize = 128;

struct Runner {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Speaks an incrementally growing utterance as a steady stream of frames.
pub struct StreamingTts<P> {
    config: TtsConfig,
    provider: P,
    utterance: Mutex<Utterance>,
    playback: Arc<Mutex<PlaybackState>>,
    audio_tx: broadcast::Sender<UpdateMessage<AudioUnit>>,
    runner: Mutex<Option<Runner>>,
}

impl<P: SynthesisProvider> StreamingTts<P> {
    pub fn new(config: TtsConfig, provider: P) -> Result<Self> {
        config.streaming.validate()?;
        if provider.sample_rate() != config.streaming.sample_rate {
            return Err(Error::ConfigError(format!(
                "Provider produces {} Hz audio but the stream is configured for {} Hz",
                provider.sample_rate(),
                config.streaming.sample_rate
            )));
        }
        if provider.sample_width() != config.streaming.sample_width {
            return Err(Error::ConfigError(format!(
                "Provider produces {}-byte samples but the stream is configured for {}-byte samples",
                provider.sample_width(),
                config.streaming.sample_width
            )));
        }

        let (audio_tx, _) = broadcast::channel(AUDIO_CHANNEL_CAPACITY);
        let playback = PlaybackState::new(config.streaming.frame_bytes());

        Ok(Self {
            config,
            provider,
            utterance: Mutex::new(Utterance::new()),
            playback: Arc::new(Mutex::new(playback)),
            audio_tx,
            runner: Mutex::new(None),
        })
    }

    pub fn format(&self) -> &StreamingConfig {
        &self.config.streaming
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// One-time warmup so the first synthesis is not delayed.
    pub fn setup(&self) -> Result<()> {
        info!("Preparing synthesis provider");
        self.provider.prepare()
    }

    /// Reset all streaming state and start the pacing loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn prepare_run(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::ConfigError(format!("prepare_run needs a Tokio runtime: {}", e))
        })?;

        let mut runner = self.runner.lock().unwrap_or_else(PoisonError::into_inner);
        if runner.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(Error::AlreadyRunning);
        }

        self.utterance
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = runtime.spawn(pacer::run(
            self.playback.clone(),
            self.config.streaming.clone(),
            self.audio_tx.clone(),
            shutdown_rx,
        ));
        *runner = Some(Runner {
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the pacing loop and wait for it to exit.
    pub async fn shutdown(&self) {
        let runner = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(runner) = runner else {
            return;
        };

        // The loop may already be gone, in which case there is no receiver.
        let _ = runner.shutdown_tx.send(true);
        if let Err(e) = runner.handle.await {
            warn!("Pacing loop ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Receive every frame emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateMessage<AudioUnit>> {
        self.audio_tx.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.playback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    /// Apply a batch of text updates, re-synthesizing if warranted.
    ///
    /// Blocks for the duration of any synthesis call. Returns whether new
    /// audio was buffered. Provider errors are returned unchanged and leave
    /// the streaming state as it was.
    pub fn ingest_update(&self, message: &UpdateMessage<TextUnit>) -> Result<bool> {
        if message.is_empty() {
            return Ok(false);
        }

        let mut utterance = self.utterance.lock().unwrap_or_else(PoisonError::into_inner);
        let (committed, last_unit) = utterance.apply(message);
        if let Some(id) = last_unit {
            self.lock_playback().set_last_input(id);
        }

        let text = utterance.text();
        if !utterance.needs_synthesis(&text, committed, self.config.streaming.resynthesis_threshold)
        {
            return Ok(false);
        }

        debug!(committed, "Synthesizing {:?}", text);
        let pcm = self.provider.synthesize(&text, &self.config.voice)?;
        let frames = chunk_frames(&pcm, self.config.streaming.frame_bytes());

        {
            let mut playback = self.lock_playback();
            playback.load(frames);
            if committed {
                playback.mark_committed();
            }
        }

        if committed {
            utterance.clear();
        } else {
            utterance.mark_synthesized(text);
        }
        Ok(true)
    }

    fn lock_playback(&self) -> std::sync::MutexGuard<'_, PlaybackState> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;
    use crate::iu::UpdateType;
    use crate::provider::GoogleTts;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio_test::{assert_err, assert_ok};

    /// Returns `bytes_per_char` bytes of a marker value per character.
    struct ScriptedProvider {
        bytes_per_char: usize,
        calls: Mutex<Vec<String>>,
        fail: AtomicBool,
        latency: Duration,
    }

    impl ScriptedProvider {
        fn new(bytes_per_char: usize) -> Self {
            Self {
                bytes_per_char,
                calls: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                latency: Duration::ZERO,
            }
        }

        fn slow(bytes_per_char: usize, latency: Duration) -> Self {
            Self {
                latency,
                ..Self::new(bytes_per_char)
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl SynthesisProvider for ScriptedProvider {
        fn synthesize(&self, text: &str, _voice: &VoiceConfig) -> Result<Vec<u8>> {
            self.calls.lock().unwrap().push(text.to_string());
            if !self.latency.is_zero() {
                std::thread::sleep(self.latency);
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::SynthesisError("service unavailable".to_string()));
            }
            let marker = self.calls.lock().unwrap().len() as u8;
            Ok(vec![marker; text.chars().count() * self.bytes_per_char])
        }

        fn sample_rate(&self) -> u32 {
            8000
        }
    }

    fn config() -> TtsConfig {
        TtsConfig {
            streaming: StreamingConfig {
                sample_rate: 8000,
                sample_width: 2,
                frame_duration_ms: 50,
                resynthesis_threshold: 40,
            },
            ..Default::default()
        }
    }

    fn tts(bytes_per_char: usize) -> StreamingTts<ScriptedProvider> {
        StreamingTts::new(config(), ScriptedProvider::new(bytes_per_char)).unwrap()
    }

    fn add(unit: &TextUnit) -> UpdateMessage<TextUnit> {
        UpdateMessage::from_unit(unit.clone(), UpdateType::Add)
    }

    fn commit(unit: &TextUnit) -> UpdateMessage<TextUnit> {
        UpdateMessage::from_unit(unit.clone(), UpdateType::Commit)
    }

    #[test]
    fn rejects_mismatched_sample_rate() {
        let mut config = config();
        config.streaming.sample_rate = 44100;
        let result = StreamingTts::new(config, ScriptedProvider::new(1));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn rejects_mismatched_sample_width() {
        let mut config = config();
        config.streaming.sample_width = 1;
        let result = StreamingTts::new(config, ScriptedProvider::new(1));
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn google_provider_requires_16bit_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TtsConfig::default();
        config.streaming.sample_width = 1;
        let google = GoogleTts::new(config.streaming.sample_rate, dir.path()).unwrap();
        assert!(matches!(
            StreamingTts::new(config, google),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let tts = tts(800);
        assert!(!assert_ok!(tts.ingest_update(&UpdateMessage::new())));
        assert!(tts.provider().calls().is_empty());
    }

    #[test]
    fn small_growth_does_not_resynthesize() {
        let tts = tts(800);
        for i in 1..=40 {
            let synthesized = tts.ingest_update(&add(&TextUnit::new("a"))).unwrap();
            assert!(!synthesized, "update {} triggered synthesis", i);
        }
        assert!(tts.ingest_update(&add(&TextUnit::new("a"))).unwrap());
        assert_eq!(tts.provider().calls(), vec!["a".repeat(41)]);
        assert_eq!(tts.snapshot().buffered_frames, 41);
        assert!(!tts.snapshot().drain_pending);
    }

    #[test]
    fn commit_of_single_char_triggers_and_resets_text() {
        let tts = tts(800);
        let unit = TextUnit::new("k");
        tts.ingest_update(&add(&unit)).unwrap();
        assert!(tts.ingest_update(&commit(&unit)).unwrap());

        assert_eq!(tts.provider().calls(), vec!["k".to_string()]);
        assert!(tts.snapshot().drain_pending);
        assert!(tts.utterance.lock().unwrap().is_empty());

        // the next fragment starts a new utterance
        let next = TextUnit::new("z");
        tts.ingest_update(&add(&next)).unwrap();
        tts.ingest_update(&commit(&next)).unwrap();
        assert_eq!(tts.provider().calls(), vec!["k".to_string(), "z".to_string()]);
    }

    #[test]
    fn uncommitted_resynthesis_replaces_buffer() {
        let tts = tts(800);
        tts.ingest_update(&add(&TextUnit::new("a".repeat(41)))).unwrap();
        assert_eq!(tts.snapshot().buffered_frames, 41);

        tts.ingest_update(&add(&TextUnit::new("b".repeat(41)))).unwrap();
        assert_eq!(tts.snapshot().buffered_frames, 82);
        assert_eq!(tts.provider().calls().len(), 2);

        let mut playback = tts.playback.lock().unwrap();
        assert!(playback.tick().iter().all(|&b| b == 2));
    }

    #[test]
    fn synthesis_during_drain_appends() {
        let tts = tts(800);
        let first = TextUnit::new("Hi");
        tts.ingest_update(&add(&first)).unwrap();
        tts.ingest_update(&commit(&first)).unwrap();
        assert_eq!(tts.snapshot().buffered_frames, 2);

        tts.ingest_update(&add(&TextUnit::new("x".repeat(41)))).unwrap();
        assert_eq!(tts.snapshot().buffered_frames, 43);

        let mut playback = tts.playback.lock().unwrap();
        let markers: Vec<u8> = (0..3).map(|_| playback.tick()[0]).collect();
        assert_eq!(markers, vec![1, 1, 2]);
    }

    #[test]
    fn provider_failure_propagates_and_keeps_state() {
        let tts = tts(800);
        let unit = TextUnit::new("Hello");
        tts.ingest_update(&add(&unit)).unwrap();
        tts.provider().fail.store(true, Ordering::SeqCst);

        let err = assert_err!(tts.ingest_update(&commit(&unit)));
        assert!(matches!(err, Error::SynthesisError(_)));
        assert_eq!(tts.snapshot().buffered_frames, 0);
        assert!(!tts.snapshot().drain_pending);

        // the utterance survives, so a retried commit speaks it
        tts.provider().fail.store(false, Ordering::SeqCst);
        assert!(tts.ingest_update(&commit(&unit)).unwrap());
        assert_eq!(tts.provider().calls().last().unwrap(), "Hello");
    }

    #[test]
    fn prepare_run_requires_runtime() {
        let tts = tts(800);
        assert!(matches!(tts.prepare_run(), Err(Error::ConfigError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn hello_commit_drains_then_falls_silent() {
        // 5 chars * 320 bytes = 1600 bytes = two 800-byte frames
        let tts = tts(320);
        tts.prepare_run().unwrap();
        let mut audio = tts.subscribe();

        let hello = TextUnit::new("Hello");
        let message: UpdateMessage<TextUnit> =
            [(hello.clone(), UpdateType::Add), (hello.clone(), UpdateType::Commit)]
                .into_iter()
                .collect();
        assert!(tts.ingest_update(&message).unwrap());
        assert_eq!(tts.provider().calls(), vec!["Hello".to_string()]);
        assert!(tts.snapshot().drain_pending);
        assert!(tts.utterance.lock().unwrap().is_empty());

        for _ in 0..2 {
            let message = audio.recv().await.unwrap();
            let (unit, _) = message.iter().next().unwrap();
            assert_eq!(unit.raw_audio.len(), 800);
            assert!(unit.raw_audio.iter().all(|&b| b == 1));
            assert_eq!(unit.grounded_in, Some(hello.id));
        }
        assert!(tts.snapshot().drain_pending);

        let message = audio.recv().await.unwrap();
        let (unit, _) = message.iter().next().unwrap();
        assert!(unit.raw_audio.iter().all(|&b| b == 0));
        assert_eq!(unit.raw_audio.len(), 800);
        assert_eq!(
            tts.snapshot(),
            PlaybackSnapshot {
                cursor: 0,
                buffered_frames: 0,
                drain_pending: false
            }
        );

        tts.shutdown().await;
        assert!(!tts.is_running());
    }

    #[tokio::test]
    async fn shutdown_lets_in_flight_synthesis_finish() {
        let tts = Arc::new(
            StreamingTts::new(config(), ScriptedProvider::slow(800, Duration::from_millis(300)))
                .unwrap(),
        );
        tts.prepare_run().unwrap();

        let unit = TextUnit::new("Hi");
        let mut message = UpdateMessage::new();
        message.push(unit.clone(), UpdateType::Add);
        message.push(unit, UpdateType::Commit);
        let ingest = {
            let tts = tts.clone();
            tokio::task::spawn_blocking(move || tts.ingest_update(&message))
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        tts.shutdown().await;
        assert!(!tts.is_running());
        assert!(!ingest.is_finished());

        assert!(assert_ok!(ingest.await.unwrap()));
        assert_eq!(
            tts.snapshot(),
            PlaybackSnapshot {
                cursor: 0,
                buffered_frames: 2,
                drain_pending: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_restarts_cleanly() {
        let tts = tts(800);
        tts.prepare_run().unwrap();
        assert!(matches!(tts.prepare_run(), Err(Error::AlreadyRunning)));

        let unit = TextUnit::new("Hi");
        tts.ingest_update(&add(&unit)).unwrap();
        tts.ingest_update(&commit(&unit)).unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(tts.snapshot().cursor, 1);

        tts.shutdown().await;
        let mut audio = tts.subscribe();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(matches!(audio.try_recv(), Err(TryRecvError::Empty)));
        // shutdown does not flush buffered audio
        assert_eq!(tts.snapshot().buffered_frames, 2);

        tts.prepare_run().unwrap();
        assert_eq!(tts.snapshot().buffered_frames, 0);
        assert!(!tts.snapshot().drain_pending);
        tts.shutdown().await;
    }
}
