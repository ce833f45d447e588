//! In-memory media store and upload admission.
//!
//! Admission happens at ingestion time, independent of any run: a file is decoded,
//! checked against the inline payload limit and tagged as image or video before it
//! can ever be attached to a generation request.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{MediaItem, MediaKind};
use crate::error::AdmissionError;
use crate::util::strip_data_url_prefix;

/// Per-file limit for inline model payloads.
pub const MAX_MEDIA_BYTES: usize = 20 * 1024 * 1024;

/// Decode and check one upload. Does not touch any store.
pub fn admit(name: &str, mime_type: &str, data: &str) -> Result<MediaItem, AdmissionError> {
  let name = name.trim().to_string();
  let mime_type = mime_type.trim().to_ascii_lowercase();

  let kind = MediaKind::from_mime(&mime_type).ok_or_else(|| AdmissionError::UnsupportedMime {
    name: name.clone(),
    mime: mime_type.clone(),
  })?;

  let encoded = strip_data_url_prefix(data.trim());
  // Reject before decoding when even the encoded form is clearly over the limit.
  if encoded.len() / 4 * 3 > MAX_MEDIA_BYTES + 3 {
    return Err(too_large(&name, encoded.len() / 4 * 3));
  }
  let bytes = BASE64
    .decode(encoded)
    .map_err(|_| AdmissionError::InvalidBase64 { name: name.clone() })?;

  if bytes.is_empty() {
    return Err(AdmissionError::Empty { name });
  }
  if bytes.len() > MAX_MEDIA_BYTES {
    return Err(too_large(&name, bytes.len()));
  }

  Ok(MediaItem {
    id: Uuid::new_v4().to_string(),
    name,
    mime_type,
    kind,
    data: bytes,
  })
}

fn too_large(name: &str, size: usize) -> AdmissionError {
  AdmissionError::TooLarge {
    name: name.to_string(),
    size_mb: size as f64 / (1024.0 * 1024.0),
    limit_mb: MAX_MEDIA_BYTES / (1024 * 1024),
  }
}

/// Public view of a stored item (no bytes).
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
  pub id: String,
  pub name: String,
  pub mime_type: String,
  pub kind: MediaKind,
  pub bytes: usize,
}

impl From<&MediaItem> for MediaSummary {
  fn from(m: &MediaItem) -> Self {
    Self {
      id: m.id.clone(),
      name: m.name.clone(),
      mime_type: m.mime_type.clone(),
      kind: m.kind,
      bytes: m.data.len(),
    }
  }
}

/// Uploaded media in insertion order. Items are shared so a run can hold a cheap snapshot.
#[derive(Default)]
pub struct MediaStore {
  items: Vec<Arc<MediaItem>>,
}

impl MediaStore {
  pub fn new() -> Self {
    Self::default()
  }

  #[instrument(level = "debug", skip(self, item), fields(id = %item.id, name = %item.name, bytes = item.data.len()))]
  pub fn add(&mut self, item: MediaItem) -> MediaSummary {
    let summary = MediaSummary::from(&item);
    self.items.push(Arc::new(item));
    info!(target: "safetylens_backend", id = %summary.id, kind = ?summary.kind, total = self.items.len(), "Media stored");
    summary
  }

  pub fn remove(&mut self, id: &str) -> bool {
    let before = self.items.len();
    self.items.retain(|m| m.id != id);
    let removed = self.items.len() != before;
    if !removed {
      warn!(target: "safetylens_backend", %id, "Remove requested for unknown media");
    }
    removed
  }

  pub fn list(&self) -> Vec<MediaSummary> {
    self.items.iter().map(|m| MediaSummary::from(m.as_ref())).collect()
  }

  pub fn snapshot(&self) -> Vec<Arc<MediaItem>> {
    self.items.clone()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn b64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
  }

  #[test]
  fn admits_image_from_data_url() {
    let data = format!("data:image/jpeg;base64,{}", b64(b"\xff\xd8\xff\xe0jpeg"));
    let item = admit("scaffold.jpg", "image/jpeg", &data).unwrap();
    assert_eq!(item.kind, MediaKind::Image);
    assert_eq!(item.data, b"\xff\xd8\xff\xe0jpeg");
    assert_eq!(item.name, "scaffold.jpg");
  }

  #[test]
  fn video_mime_is_tagged_as_video() {
    let item = admit("walkthrough.mp4", "video/mp4", &b64(b"....ftypmp42")).unwrap();
    assert_eq!(item.kind, MediaKind::Video);
  }

  #[test]
  fn rejects_oversized_file_naming_it() {
    let big = vec![0u8; MAX_MEDIA_BYTES + 1];
    let err = admit("forklift.mov", "video/quicktime", &b64(&big)).unwrap_err();
    assert!(matches!(err, AdmissionError::TooLarge { .. }));
    assert!(err.to_string().contains("forklift.mov"));
  }

  #[test]
  fn accepts_file_exactly_at_limit() {
    let exact = vec![7u8; MAX_MEDIA_BYTES];
    assert!(admit("big.png", "image/png", &b64(&exact)).is_ok());
  }

  #[test]
  fn rejects_non_media_and_bad_payloads() {
    let err = admit("notes.pdf", "application/pdf", &b64(b"%PDF")).unwrap_err();
    assert!(matches!(err, AdmissionError::UnsupportedMime { .. }));

    let err = admit("x.png", "image/png", "!!not base64!!").unwrap_err();
    assert_eq!(err, AdmissionError::InvalidBase64 { name: "x.png".into() });

    let err = admit("x.png", "image/png", "").unwrap_err();
    assert_eq!(err, AdmissionError::Empty { name: "x.png".into() });
  }

  #[test]
  fn store_adds_removes_and_snapshots() {
    let mut store = MediaStore::new();
    let a = store.add(admit("a.png", "image/png", &b64(b"a")).unwrap());
    let b = store.add(admit("b.png", "image/png", &b64(b"bb")).unwrap());
    assert_eq!(store.len(), 2);

    let snap = store.snapshot();
    assert!(store.remove(&a.id));
    assert!(!store.remove(&a.id));
    assert_eq!(store.list().len(), 1);
    assert_eq!(store.list()[0].id, b.id);
    // The snapshot taken before removal is unaffected.
    assert_eq!(snap.len(), 2);
  }
}
