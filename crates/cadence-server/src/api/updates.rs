//! Text update ingestion endpoint

use axum::{extract::State, Json};
use cadence_core::{SynthesisProvider, TextUnit, UpdateMessage, UpdateType};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub events: Vec<UpdateEvent>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEvent {
    /// Identifies the unit for later revoke/commit; generated when absent
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub text: String,
    pub kind: UpdateType,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub ids: Vec<Uuid>,
    pub synthesized: bool,
}

pub async fn post_updates<P: SynthesisProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let message: UpdateMessage<TextUnit> = request
        .events
        .into_iter()
        .map(|event| {
            let id = event.id.unwrap_or_else(Uuid::new_v4);
            (TextUnit::with_id(id, event.text), event.kind)
        })
        .collect();
    let ids: Vec<Uuid> = message.iter().map(|(unit, _)| unit.id).collect();
    debug!("Received {} text updates", message.len());

    // Synthesis blocks on network I/O.
    let tts = state.tts.clone();
    let synthesized = tokio::task::spawn_blocking(move || tts.ingest_update(&message)).await??;

    Ok(Json(UpdateResponse { ids, synthesized }))
}
