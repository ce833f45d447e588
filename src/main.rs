//! SafetyLens · Safety Quiz Generator Backend
//!
//! - Axum HTTP API: media upload, batched quiz generation, review, docx export
//! - Gemini model gateway (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                : u16 (default 3000)
//!   GEMINI_API_KEY      : enables generation if present (API_KEY is accepted too)
//!   GEMINI_BASE_URL     : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL        : default "gemini-2.5-flash"
//!   GEMINI_TIMEOUT_SECS : per-batch request timeout, default 300
//!   QUIZ_CONFIG_PATH    : path to TOML config (prompts + export title)
//!   LOG_LEVEL           : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT          : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod media;
mod request;
mod gateway;
mod gemini;
mod normalize;
mod orchestrator;
mod export;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared application state (media store, question collection, run slot, gateway).
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "safetylens_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(state))
    .await?;
  Ok(())
}

/// Resolves on Ctrl-C. A run still in flight is asked to stop at its next batch boundary.
async fn shutdown_signal(state: Arc<AppState>) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "safetylens_backend", error = %e, "Failed to listen for shutdown signal");
    return std::future::pending().await;
  }
  if let Some(run) = state.current_run() {
    run.cancel();
    info!(target: "safetylens_backend", run_id = %run.id, "Cancelling in-flight run for shutdown");
  }
  info!(target: "safetylens_backend", "Shutting down");
}
