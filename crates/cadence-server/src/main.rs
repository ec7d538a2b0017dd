//! Cadence Server - HTTP API for paced speech streaming

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod settings;
mod state;

use cadence_core::{CachedProvider, GoogleTts, StreamingTts};
use settings::Settings;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cadence_server=debug,cadence_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cadence Server");

    let settings = Settings::load()?;
    let tts_config = settings.tts.clone();
    info!(
        "Voice {} ({}), {} Hz, {} ms frames",
        tts_config.voice.voice_name,
        tts_config.voice.language_code,
        tts_config.streaming.sample_rate,
        tts_config.streaming.frame_duration_ms
    );
    if tts_config.cache.enabled {
        info!("Synthesis cache: {:?}", tts_config.cache.dir);
    }

    let google = GoogleTts::new(tts_config.streaming.sample_rate, tts_config.temp_dir.clone())?;
    let provider = CachedProvider::new(google, tts_config.cache.clone())?;
    let tts = Arc::new(StreamingTts::new(tts_config, provider)?);

    // Token priming shells out to gcloud.
    let warmup = {
        let tts = tts.clone();
        tokio::task::spawn_blocking(move || tts.setup()).await?
    };
    if let Err(e) = warmup {
        warn!("Provider warmup failed, continuing: {}", e);
    }

    tts.prepare_run()?;

    let app = api::create_router(AppState::new(tts.clone()), settings.server.cors_enabled);

    let addr = settings.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tts.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
    }
}
