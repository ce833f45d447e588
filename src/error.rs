//! Error taxonomy for runs, the model gateway, media admission and export.

use thiserror::Error;

/// Rejected before any batch is dispatched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
  #[error("please upload at least one image or video")]
  NoMedia,
  #[error("select at least one question type")]
  NoTypes,
  #[error("question count {count} is above the maximum of {max}")]
  CountOutOfRange { count: usize, max: usize },
}

/// Failure of a single gateway round trip, including contract violations of its payload.
#[derive(Debug, Error)]
pub enum GatewayError {
  #[error("model request failed: {0}")]
  Transport(String),
  #[error("model API returned HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("no data received from the model")]
  EmptyResponse,
  #[error("model output is not valid JSON: {0}")]
  MalformedJson(String),
  #[error("model output does not match the expected shape: {0}")]
  SchemaDrift(String),
}

/// Terminal failure of a run. Accumulated items are discarded.
#[derive(Debug, Error)]
pub enum RunError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("batch {batch_index} failed: {source}")]
  Gateway {
    batch_index: usize,
    #[source]
    source: GatewayError,
  },
  #[error("generation was cancelled")]
  Cancelled,
}

/// Per-file rejection at ingestion time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdmissionError {
  #[error("file \"{name}\" is too large ({size_mb:.1} MB, limit {limit_mb} MB); upload a smaller image or video")]
  TooLarge { name: String, size_mb: f64, limit_mb: usize },
  #[error("file \"{name}\" is not valid base64 data")]
  InvalidBase64 { name: String },
  #[error("file \"{name}\" has unsupported type \"{mime}\"; only images and videos are accepted")]
  UnsupportedMime { name: String, mime: String },
  #[error("file \"{name}\" is empty")]
  Empty { name: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("there are no questions to export")]
  NothingToExport,
  #[error("failed to write document: {0}")]
  Pack(String),
}
