//! HTTP routes

mod stream;
mod updates;

use axum::{extract::State, routing::get, routing::post, Json, Router};
use cadence_core::SynthesisProvider;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router<P: SynthesisProvider + 'static>(state: AppState<P>, cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/v1/status", get(status::<P>))
        .route("/v1/updates", post(updates::post_updates::<P>))
        .route("/v1/stream", get(stream::stream_audio::<P>))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    running: bool,
    cursor: usize,
    buffered_frames: usize,
    drain_pending: bool,
    sample_rate: u32,
    sample_width: u16,
    channels: u16,
    frame_duration_ms: u64,
}

async fn status<P: SynthesisProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Json<StatusResponse> {
    let snapshot = state.tts.snapshot();
    let format = state.tts.format();
    Json(StatusResponse {
        running: state.tts.is_running(),
        cursor: snapshot.cursor,
        buffered_frames: snapshot.buffered_frames,
        drain_pending: snapshot.drain_pending,
        sample_rate: format.sample_rate,
        sample_width: format.sample_width,
        channels: cadence_core::StreamingConfig::CHANNELS,
        frame_duration_ms: format.frame_duration_ms,
    })
}
