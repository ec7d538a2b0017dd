//! WebSocket audio stream

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use cadence_core::{AudioUnit, SynthesisProvider, UpdateMessage};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Upgrade to a WebSocket that carries every paced frame as a binary message.
pub async fn stream_audio<P: SynthesisProvider + 'static>(
    State(state): State<AppState<P>>,
    ws: WebSocketUpgrade,
) -> Response {
    let audio = state.tts.subscribe();
    ws.on_upgrade(move |socket| forward_frames(socket, audio))
}

async fn forward_frames(socket: WebSocket, audio: broadcast::Receiver<UpdateMessage<AudioUnit>>) {
    info!("Stream client connected");
    let (mut sink, mut incoming) = socket.split();
    let mut frames = BroadcastStream::new(audio);

    loop {
        tokio::select! {
            item = frames.next() => match item {
                Some(Ok(message)) => {
                    for (unit, _) in message.iter() {
                        if sink.send(Message::Binary(unit.raw_audio.to_vec())).await.is_err() {
                            debug!("Stream client went away mid-send");
                            return;
                        }
                    }
                }
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    warn!("Stream client lagged, skipped {} frames", skipped);
                }
                None => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!("Stream client disconnected");
}
