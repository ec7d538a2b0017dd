//! Fixed-cadence emission loop

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::playback::PlaybackState;
use crate::config::StreamingConfig;
use crate::iu::{AudioUnit, UpdateMessage, UpdateType};

/// How long to wait before the next tick, given the time since the last one.
///
/// An on-time tick sleeps out the rest of the frame. After an overrun the
/// loop sleeps `2 * frame - elapsed` (possibly zero) instead of bursting to
/// catch up.
pub fn pacing_delay(elapsed: Duration, frame: Duration) -> Duration {
    if elapsed < frame {
        frame - elapsed
    } else {
        (frame * 2).saturating_sub(elapsed)
    }
}

/// Emit one frame per tick until `shutdown` flips to true or its sender is
/// dropped. Buffered audio is not flushed on exit.
pub(super) async fn run(
    playback: Arc<Mutex<PlaybackState>>,
    format: StreamingConfig,
    audio_tx: broadcast::Sender<UpdateMessage<AudioUnit>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let frame_duration = format.frame_duration();
    let mut last_tick = Instant::now();
    let mut ticks: u64 = 0;

    info!(
        "Pacing loop started ({} ms frames, {} bytes each)",
        format.frame_duration_ms,
        format.frame_bytes()
    );

    loop {
        let elapsed = last_tick.elapsed();
        if elapsed >= frame_duration {
            debug!("Tick overran by {:?}", elapsed - frame_duration);
        }

        tokio::select! {
            _ = tokio::time::sleep(pacing_delay(elapsed, frame_duration)) => {}
            _ = shutdown.changed() => {}
        }
        if *shutdown.borrow() || shutdown.has_changed().is_err() {
            break;
        }
        last_tick = Instant::now();

        let (frame, grounded_in) = {
            let mut state = playback.lock().unwrap_or_else(PoisonError::into_inner);
            (state.tick(), state.last_input())
        };

        let unit = AudioUnit::new(
            grounded_in,
            frame,
            format.sample_rate,
            format.sample_width,
            StreamingConfig::CHANNELS,
        );
        // No subscribers is not an error; the frame is simply dropped.
        let receivers = audio_tx
            .send(UpdateMessage::from_unit(unit, UpdateType::Add))
            .unwrap_or(0);
        ticks += 1;
        trace!("Tick {} delivered to {} subscriber(s)", ticks, receivers);
    }

    info!("Pacing loop stopped after {} ticks", ticks);
}
