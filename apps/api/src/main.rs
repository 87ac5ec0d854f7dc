mod config;
mod deck;
mod documents;
mod errors;
mod export;
mod generation;
mod imagery;
mod llm_client;
mod models;
mod ooxml;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::imagery::GeminiImageSource;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Slideflow API v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.work_dir)
        .await
        .with_context(|| format!("Cannot create work dir {}", config.work_dir.display()))?;

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone(), &config.gemini_api_base)?;
    info!(
        "LLM client initialized (text: {}, image: {})",
        llm_client::TEXT_MODEL,
        llm_client::IMAGE_MODEL
    );

    // Picture source (GeminiImageSource by default, placeholder on failure)
    let images = Arc::new(GeminiImageSource::new(llm.clone()));

    let state = AppState::new(config.clone(), llm, images);
    info!("Presentation records in {}", state.store.dir().display());
    info!("PDF export via {}", state.pdf.soffice().display());

    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
