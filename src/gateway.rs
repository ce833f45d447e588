//! Model gateway seam: one round trip per batch, plus the response contract every
//! implementation's output is held to.
//!
//! The payload must be a JSON array of objects carrying the required fields; anything
//! else is surfaced as a typed error and never repaired here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::domain::MediaItem;
use crate::error::GatewayError;
use crate::request::BatchRequest;

#[async_trait]
pub trait ModelGateway: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &str;

  /// Send the media and one batch's instructions; return the raw text payload.
  /// The same media is attached to every batch of a run.
  async fn generate(&self, media: &[Arc<MediaItem>], batch: &BatchRequest) -> Result<String, GatewayError>;
}

/// One question object exactly as the model produced it.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
  #[serde(rename = "type")]
  pub item_type: String,
  pub content: String,
  #[serde(default)]
  pub options: Option<Vec<String>>,
  pub answer: RawAnswer,
  pub explanation: String,
  pub hazard_focus: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAnswer {
  Text(String),
  List(Vec<String>),
  Flag(bool),
}

/// Decode a batch payload into raw items.
pub fn decode_batch(payload: &str) -> Result<Vec<RawItem>, GatewayError> {
  let text = payload.trim();
  if text.is_empty() {
    return Err(GatewayError::EmptyResponse);
  }

  let value: Value = serde_json::from_str(text).map_err(|e| GatewayError::MalformedJson(e.to_string()))?;
  let elements = match value {
    Value::Array(elements) => elements,
    other => return Err(GatewayError::SchemaDrift(format!("expected a JSON array, got {}", json_kind(&other)))),
  };

  elements
    .into_iter()
    .enumerate()
    .map(|(i, el)| {
      if !el.is_object() {
        return Err(GatewayError::SchemaDrift(format!("item {i} is {}, not an object", json_kind(&el))));
      }
      serde_json::from_value::<RawItem>(el).map_err(|e| GatewayError::SchemaDrift(format!("item {i}: {e}")))
    })
    .collect()
}

fn json_kind(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
