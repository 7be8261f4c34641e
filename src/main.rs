// =============================================================================
// fractal-lab — Main Entry Point
// =============================================================================
//
// Starts the analysis service with a synthetic buffer loaded and playback
// idle. Binance data is only fetched on an explicit `/playback/start` call.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod error;
mod indicators;
mod market_data;
mod playback;
mod runtime_config;
mod series;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::{RuntimeConfig, DEFAULT_CONFIG_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("fractal-lab starting up");

    let config_path =
        std::env::var("FRACTAL_LAB_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    if let Ok(addr) = std::env::var("FRACTAL_LAB_BIND_ADDR") {
        config.bind_addr = addr;
    }
    if let Ok(symbol) = std::env::var("FRACTAL_LAB_SYMBOL") {
        let symbol = symbol.trim().to_uppercase();
        if !symbol.is_empty() {
            config.default_symbol = symbol;
        }
    }

    info!(
        bind_addr = %config.bind_addr,
        default_symbol = %config.default_symbol,
        synthetic_length = config.synthetic_length,
        hurst_kind = %config.hurst.kind,
        hurst_simplified = config.hurst.simplified,
        "Configuration resolved"
    );

    // ── 2. Shared state ──────────────────────────────────────────────────
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, &config_path)?);

    // ── 3. Playback ticker ───────────────────────────────────────────────
    // The period is re-read every tick so config updates apply immediately.
    let tick_state = state.clone();
    tokio::spawn(async move {
        loop {
            let period = tick_state.runtime_config.read().playback_tick_ms.max(1);
            tokio::time::sleep(tokio::time::Duration::from_millis(period)).await;
            tick_state.tick_playback();
        }
    });

    // ── 4. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server to {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    let config = state.runtime_config.read().clone();
    if let Err(e) = config.save(&state.config_path) {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("fractal-lab shut down complete.");
    Ok(())
}
