//! Minimal Gemini client implementing the model gateway.
//!
//! We only call `models/{model}:generateContent` with inline media parts and a strict
//! JSON response schema. Calls are instrumented and log model name, latency, token
//! usage and response size (not contents).
//!
//! NOTE: We never log the API key or media bytes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::domain::MediaItem;
use crate::error::GatewayError;
use crate::gateway::ModelGateway;
use crate::request::BatchRequest;
use crate::util::trunc_for_log;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Clone)]
pub struct GeminiGateway {
  client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl GeminiGateway {
  /// Construct the client if we find GEMINI_API_KEY (or API_KEY); otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY")
      .or_else(|_| std::env::var("API_KEY"))
      .ok()
      .map(|k| k.trim().to_string())
      .filter(|k| !k.is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    let timeout = std::env::var("GEMINI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs)
      .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));

    let client = reqwest::Client::builder().timeout(timeout).build().ok()?;

    Some(Self { client, api_key, base_url: base_url.trim_end_matches('/').to_string(), model, timeout })
  }

  fn endpoint(&self) -> String {
    format!("{}/models/{}:generateContent", self.base_url, self.model)
  }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
  fn name(&self) -> &str {
    &self.model
  }

  #[instrument(
    level = "info",
    skip(self, media, batch),
    fields(model = %self.model, batch_index = batch.batch_index, want = batch.count, media = media.len())
  )]
  async fn generate(&self, media: &[Arc<MediaItem>], batch: &BatchRequest) -> Result<String, GatewayError> {
    let body = build_request_body(media, batch);
    let start = Instant::now();

    let res = self
      .client
      .post(self.endpoint())
      .header(USER_AGENT, "safetylens-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          GatewayError::Transport(format!("request timed out after {:?}", self.timeout))
        } else {
          GatewayError::Transport(e.to_string())
        }
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_api_error(&body).unwrap_or(body);
      return Err(GatewayError::Http { status: status.as_u16(), message });
    }

    let body: GenerateContentResponse = res
      .json()
      .await
      .map_err(|e| GatewayError::Transport(format!("unreadable API response: {e}")))?;
    let elapsed = start.elapsed();

    if let Some(usage) = &body.usage_metadata {
      info!(
        prompt_tokens = ?usage.prompt_token_count,
        completion_tokens = ?usage.candidates_token_count,
        total_tokens = ?usage.total_token_count,
        "Gemini usage"
      );
    }
    if let Some(reason) = body.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
      warn!(%reason, "Gemini blocked the prompt");
    }

    let text = response_text(&body).ok_or(GatewayError::EmptyResponse)?;
    info!(?elapsed, response_bytes = text.len(), "Model response received");
    debug!(preview = %trunc_for_log(&text, 200), "Model response preview");
    Ok(text)
  }
}

/// Media first, then the batch instructions, in a single user turn.
fn build_request_body(media: &[Arc<MediaItem>], batch: &BatchRequest) -> GenerateContentRequest {
  let mut parts: Vec<Part> = media
    .iter()
    .map(|m| Part::InlineData {
      inline_data: InlineData { mime_type: m.mime_type.clone(), data: BASE64.encode(&m.data) },
    })
    .collect();
  parts.push(Part::Text { text: batch.instructions.clone() });

  GenerateContentRequest {
    system_instruction: Some(Content { role: None, parts: vec![Part::Text { text: batch.system_instruction.clone() }] }),
    contents: vec![Content { role: Some("user".into()), parts }],
    generation_config: GenerationSettings {
      response_mime_type: "application/json".into(),
      response_schema: batch.response_schema.clone(),
    },
  }
}

/// Concatenated text of the first candidate, if any non-blank text came back.
fn response_text(body: &GenerateContentResponse) -> Option<String> {
  let candidate = body.candidates.first()?;
  if let Some(reason) = &candidate.finish_reason {
    if reason != "STOP" {
      warn!(%reason, "Gemini candidate finished abnormally");
    }
  }
  let text: String = candidate
    .content
    .as_ref()?
    .parts
    .iter()
    .filter_map(|p| p.text.as_deref())
    .collect();
  if text.trim().is_empty() { None } else { Some(text) }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  #[serde(skip_serializing_if = "Option::is_none")]
  system_instruction: Option<Content>,
  contents: Vec<Content>,
  generation_config: GenerationSettings,
}

#[derive(Serialize)]
struct Content {
  #[serde(skip_serializing_if = "Option::is_none")]
  role: Option<String>,
  parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
  Text {
    text: String,
  },
  InlineData {
    #[serde(rename = "inlineData")]
    inline_data: InlineData,
  },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
  mime_type: String,
  data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationSettings {
  response_mime_type: String,
  response_schema: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)]
  candidates: Vec<Candidate>,
  #[serde(default)]
  usage_metadata: Option<UsageMetadata>,
  #[serde(default)]
  prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)]
  content: Option<CandidateContent>,
  #[serde(default)]
  finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
  #[serde(default)]
  parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
  #[serde(default)]
  text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)]
  block_reason: Option<String>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Prompts;
  use crate::domain::{Difficulty, GenerationConfig, ItemType, MediaKind};
  use crate::request::build_batch_request;

  fn batch() -> BatchRequest {
    let cfg = GenerationConfig { count: 10, types: vec![ItemType::TrueFalse], difficulty: Difficulty::Basic };
    build_batch_request(&Prompts::default(), &cfg, 0, 10)
  }

  #[test]
  fn body_carries_media_instructions_and_schema() {
    let media = vec![
      Arc::new(MediaItem { id: "1".into(), name: "a.png".into(), mime_type: "image/png".into(), kind: MediaKind::Image, data: b"png".to_vec() }),
      Arc::new(MediaItem { id: "2".into(), name: "b.mp4".into(), mime_type: "video/mp4".into(), kind: MediaKind::Video, data: b"mp4".to_vec() }),
    ];
    let body = serde_json::to_value(build_request_body(&media, &batch())).unwrap();

    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
    assert_eq!(parts[0]["inlineData"]["data"], BASE64.encode(b"png"));
    assert_eq!(parts[1]["inlineData"]["mimeType"], "video/mp4");
    assert!(parts[2]["text"].as_str().unwrap().contains("exactly 10 questions"));

    assert_eq!(body["contents"][0]["role"], "user");
    assert!(body["systemInstruction"].get("role").is_none());
    assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
  }

  #[test]
  fn response_text_joins_parts_and_rejects_blank() {
    let ok: GenerateContentResponse = serde_json::from_value(serde_json::json!({
      "candidates": [{ "content": { "parts": [{ "text": "[{\"a\":" }, { "text": "1}]" }] }, "finishReason": "STOP" }],
      "usageMetadata": { "promptTokenCount": 1200, "candidatesTokenCount": 800, "totalTokenCount": 2000 }
    }))
    .unwrap();
    assert_eq!(response_text(&ok).as_deref(), Some("[{\"a\":1}]"));

    let blocked: GenerateContentResponse = serde_json::from_value(serde_json::json!({
      "promptFeedback": { "blockReason": "SAFETY" }
    }))
    .unwrap();
    assert!(response_text(&blocked).is_none());

    let blank: GenerateContentResponse = serde_json::from_value(serde_json::json!({
      "candidates": [{ "content": { "parts": [{ "text": "  " }] } }]
    }))
    .unwrap();
    assert!(response_text(&blank).is_none());
  }

  #[test]
  fn api_error_message_is_extracted() {
    let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
    assert_eq!(extract_api_error(body).as_deref(), Some("API key not valid."));
    assert!(extract_api_error("<html>").is_none());
  }
}
