//! Router assembly: HTTP endpoints, static files, CORS, body limit and HTTP tracing.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::media::MAX_MEDIA_BYTES;
use crate::state::AppState;

pub mod http;

/// Largest accepted request body: one max-size file as base64 plus JSON framing.
const MAX_BODY_BYTES: usize = MAX_MEDIA_BYTES / 3 * 4 + 1024 * 1024;

/// Build the application router with:
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/media", get(http::http_list_media).post(http::http_post_media))
        .route("/api/v1/media/:id", delete(http::http_delete_media))
        .route("/api/v1/generate", post(http::http_post_generate))
        .route("/api/v1/generate/status", get(http::http_get_status))
        .route("/api/v1/generate/cancel", post(http::http_post_cancel))
        .route("/api/v1/questions", get(http::http_get_questions).delete(http::http_delete_questions))
        .route("/api/v1/export", get(http::http_get_export))
        // State + body limit + CORS + HTTP tracing
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
