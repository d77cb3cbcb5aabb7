//! Thai TTS HTTP server.
//!
//! ```text
//! cargo run --features server --bin thaitts-server -- --port 8000 --data-dir ./data
//! ```
//!
//! Every flag also reads an environment variable (`PORT`, `DATA_DIR`,
//! `LEXICON_PATH`, …); see `--help`.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use thaitts::{
    config::ServerConfig,
    server::{router, AppState},
    synth::EngineCache,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    for dir in [config.data_dir.clone(), config.temp_dir(), config.results_audio_dir()] {
        std::fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }

    // No embedded model: every version is served by the tone engine.
    let state = AppState::load(config.clone(), EngineCache::tone()).context("cannot load dictionary")?;
    info!(
        entries = state.front_end().lexicon_len(),
        lexicon = %config.lexicon_path().display(),
        "Dictionary ready"
    );

    info!("Pre-loading default model ({})", config.model_version);
    if let Err(e) = state.engines.get(&config.model_version) {
        warn!("{:#}", e);
    }

    let engines = state.engines.clone();
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engines.clear();
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for shutdown signal: {}", e);
    }
}
