//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Media admission and removal (refused while a run is in flight)
//!   - Starting a generation run and publishing its result
//!   - Run status and cooperative cancellation
//!   - Exporting the last result

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::domain::GenerationConfig;
use crate::error::{AdmissionError, ExportError, RunError};
use crate::export::export_docx;
use crate::media::{admit, MediaSummary};
use crate::orchestrator::RunProgress;
use crate::protocol::{GenerateOut, MediaIn, RunStatusOut};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Admission(#[from] AdmissionError),
  #[error("a generation run is in progress; media cannot change and no second run can start until it finishes")]
  Busy,
  #[error("media \"{0}\" not found")]
  MediaNotFound(String),
  #[error("no generation run is in progress")]
  NoRun,
  #[error("model gateway is not configured (set GEMINI_API_KEY)")]
  GatewayUnavailable,
  #[error(transparent)]
  Run(#[from] RunError),
  #[error(transparent)]
  Export(#[from] ExportError),
}

#[instrument(level = "info", skip(state, body), fields(name = %body.name, mime = %body.mime_type, data_len = body.data.len()))]
pub async fn upload_media(state: &AppState, body: MediaIn) -> Result<MediaSummary, ApiError> {
  let item = match admit(&body.name, &body.mime_type, &body.data) {
    Ok(item) => item,
    Err(e) => {
      warn!(target: "safetylens_backend", error = %e, "Upload rejected");
      return Err(e.into());
    }
  };
  // Hold the store lock while checking the slot so a run never sees a half-applied upload.
  let mut media = state.media.write().await;
  if state.run_in_flight() {
    return Err(ApiError::Busy);
  }
  Ok(media.add(item))
}

#[instrument(level = "info", skip(state))]
pub async fn remove_media(state: &AppState, id: &str) -> Result<(), ApiError> {
  let mut media = state.media.write().await;
  if state.run_in_flight() {
    return Err(ApiError::Busy);
  }
  if media.remove(id) {
    Ok(())
  } else {
    Err(ApiError::MediaNotFound(id.to_string()))
  }
}

pub async fn list_media(state: &AppState) -> Vec<MediaSummary> {
  state.media.read().await.list()
}

/// Run one generation end to end and publish the result as the current collection.
#[instrument(level = "info", skip(state, config), fields(count = config.count, types = ?config.types, difficulty = config.difficulty.label()))]
pub async fn generate(state: &AppState, config: GenerationConfig) -> Result<GenerateOut, ApiError> {
  let orchestrator = state.orchestrator.as_ref().ok_or(ApiError::GatewayUnavailable)?;
  let guard = state.try_begin_run(config.count).ok_or(ApiError::Busy)?;
  let media = state.media.read().await.snapshot();

  let run_id = guard.handle().id.to_string();
  match orchestrator.run(guard.handle(), &media, &config).await {
    Ok(items) => {
      info!(target: "quiz", %run_id, requested = config.count, produced = items.len(), "Generation published");
      *state.questions.write().await = items.clone();
      Ok(GenerateOut { run_id, requested: config.count, items })
    }
    Err(e) => {
      error!(target: "quiz", %run_id, error = %e, "Generation failed");
      Err(e.into())
    }
  }
}

pub fn run_status(state: &AppState) -> RunStatusOut {
  let progress = state.current_run().map(|h| h.progress());
  RunStatusOut { in_flight: progress.is_some(), progress }
}

#[instrument(level = "info", skip(state))]
pub fn cancel_run(state: &AppState) -> Result<RunProgress, ApiError> {
  let handle = state.current_run().ok_or(ApiError::NoRun)?;
  handle.cancel();
  info!(target: "quiz", run_id = %handle.id, "Cancellation requested");
  Ok(handle.progress())
}

#[instrument(level = "info", skip(state))]
pub async fn export_current(state: &AppState) -> Result<Vec<u8>, ApiError> {
  let items = state.questions.read().await.clone();
  Ok(export_docx(&items, &state.config.export.title)?)
}

pub async fn reset_questions(state: &AppState) {
  let mut q = state.questions.write().await;
  info!(target: "quiz", cleared = q.len(), "Question collection reset");
  q.clear();
}
