//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; errors map to a status code plus `{"error": ...}`.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::{header, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument};

use crate::domain::GenerationConfig;
use crate::error::{AdmissionError, ExportError, RunError};
use crate::export::{DOCX_MIME, EXPORT_FILENAME};
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::Admission(AdmissionError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::Admission(_) => StatusCode::BAD_REQUEST,
      ApiError::Busy => StatusCode::CONFLICT,
      ApiError::MediaNotFound(_) | ApiError::NoRun => StatusCode::NOT_FOUND,
      ApiError::GatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Run(RunError::Validation(_)) => StatusCode::BAD_REQUEST,
      ApiError::Run(RunError::Gateway { .. }) => StatusCode::BAD_GATEWAY,
      ApiError::Run(RunError::Cancelled) => StatusCode::CONFLICT,
      ApiError::Export(ExportError::NothingToExport) => StatusCode::NOT_FOUND,
      ApiError::Export(ExportError::Pack(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    (self.status(), Json(ErrorOut { error: self.to_string() })).into_response()
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut {
    ok: true,
    gateway_configured: state.orchestrator.is_some(),
    gateway: state.orchestrator.as_ref().map(|o| o.gateway_name().to_string()),
    media_count: state.media.read().await.len(),
    run_in_flight: state.run_in_flight(),
  })
}

#[instrument(level = "info", skip(state))]
pub async fn http_list_media(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(MediaListOut { media: list_media(&state).await })
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name))]
pub async fn http_post_media(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MediaIn>,
) -> Result<impl IntoResponse, ApiError> {
  let summary = upload_media(&state, body).await?;
  info!(target: "safetylens_backend", id = %summary.id, bytes = summary.bytes, "HTTP media uploaded");
  Ok((StatusCode::CREATED, Json(summary)))
}

#[instrument(level = "info", skip(state), fields(%id))]
pub async fn http_delete_media(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
  remove_media(&state, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[instrument(level = "info", skip(state, body), fields(count = body.count))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GenerationConfig>,
) -> Result<Json<GenerateOut>, ApiError> {
  let out = generate(&state, body).await?;
  info!(target: "quiz", run_id = %out.run_id, items = out.items.len(), "HTTP generation served");
  Ok(Json(out))
}

#[instrument(level = "debug", skip(state))]
pub async fn http_get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(run_status(&state))
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_cancel(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let progress = cancel_run(&state)?;
  Ok((StatusCode::ACCEPTED, Json(progress)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_questions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(QuestionsOut { items: state.questions.read().await.clone() })
}

#[instrument(level = "info", skip(state))]
pub async fn http_delete_questions(State(state): State<Arc<AppState>>) -> StatusCode {
  reset_questions(&state).await;
  StatusCode::NO_CONTENT
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_export(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
  let bytes = export_current(&state).await?;
  let headers = [
    (header::CONTENT_TYPE, DOCX_MIME.to_string()),
    (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILENAME}\"")),
  ];
  Ok((headers, bytes))
}
