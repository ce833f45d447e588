//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::QuizItem;
use crate::media::MediaSummary;
use crate::orchestrator::RunProgress;

/// Upload body. `data` is plain base64 or a `data:<mime>;base64,...` URL.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaIn {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize)]
pub struct MediaListOut {
    pub media: Vec<MediaSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOut {
    pub run_id: String,
    pub requested: usize,
    pub items: Vec<QuizItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStatusOut {
    pub in_flight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<RunProgress>,
}

#[derive(Serialize)]
pub struct QuestionsOut {
    pub items: Vec<QuizItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOut {
    pub ok: bool,
    pub gateway_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
    pub media_count: usize,
    pub run_in_flight: bool,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
