//! Batch orchestrator: sequential batched generation for one run.
//!
//! Flow per run:
//! 1) Validate inputs (media present, at least one type) before anything is sent.
//! 2) Plan `ceil(count / batch_size)` dispatch slots (count capped at `MAX_COUNT`);
//!    this is the hard bound on calls.
//! 3) For each slot: recompute `want = min(batch_size, count - collected)`, stop at 0,
//!    call the gateway, decode + normalize the batch, append.
//! 4) Any failure aborts the run; collected items are dropped with it.
//!
//! The orchestrator keeps no per-run state. Everything run-specific lives in the
//! caller-owned `RunHandle`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::Prompts;
use crate::domain::{GenerationConfig, MediaItem, QuizItem};
use crate::error::{GatewayError, RunError, ValidationError};
use crate::gateway::{decode_batch, ModelGateway};
use crate::normalize::normalize_item;
use crate::request::{batch_count, build_batch_request, plan_batches, BatchRequest, BATCH_SIZE, MAX_COUNT};

/// Caller-owned handle for one run: identity, id stamp, cancellation and progress.
#[derive(Debug)]
pub struct RunHandle {
  pub id: Uuid,
  stamp_ms: i64,
  requested: usize,
  cancelled: AtomicBool,
  batches_planned: AtomicUsize,
  batches_completed: AtomicUsize,
  items_collected: AtomicUsize,
}

/// Point-in-time view of a run's progress.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunProgress {
  pub run_id: String,
  pub requested: usize,
  pub batches_planned: usize,
  pub batches_completed: usize,
  pub items_collected: usize,
  pub cancel_requested: bool,
}

impl RunHandle {
  pub fn new(requested: usize) -> Self {
    Self::with_stamp(requested, Utc::now().timestamp_millis())
  }

  pub fn with_stamp(requested: usize, stamp_ms: i64) -> Self {
    Self {
      id: Uuid::new_v4(),
      stamp_ms,
      requested,
      cancelled: AtomicBool::new(false),
      batches_planned: AtomicUsize::new(0),
      batches_completed: AtomicUsize::new(0),
      items_collected: AtomicUsize::new(0),
    }
  }

  /// Cooperative: takes effect before the next dispatch, never interrupts an in-flight call.
  pub fn cancel(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }

  /// Item id derived from the run stamp and the item's position; unique within a run.
  pub fn item_id(&self, batch_index: usize, position: usize) -> String {
    format!("gen-{}-{}-{}", self.stamp_ms, batch_index, position)
  }

  pub fn progress(&self) -> RunProgress {
    RunProgress {
      run_id: self.id.to_string(),
      requested: self.requested,
      batches_planned: self.batches_planned.load(Ordering::SeqCst),
      batches_completed: self.batches_completed.load(Ordering::SeqCst),
      items_collected: self.items_collected.load(Ordering::SeqCst),
      cancel_requested: self.is_cancelled(),
    }
  }

  fn record_batch(&self, collected: usize) {
    self.batches_completed.fetch_add(1, Ordering::SeqCst);
    self.items_collected.store(collected, Ordering::SeqCst);
  }
}

/// Reject a run before any batch is dispatched.
pub fn validate_run(media: &[Arc<MediaItem>], config: &GenerationConfig) -> Result<(), ValidationError> {
  if media.is_empty() {
    return Err(ValidationError::NoMedia);
  }
  if config.types.is_empty() {
    return Err(ValidationError::NoTypes);
  }
  if config.count > MAX_COUNT {
    return Err(ValidationError::CountOutOfRange { count: config.count, max: MAX_COUNT });
  }
  Ok(())
}

#[derive(Clone)]
pub struct BatchOrchestrator {
  gateway: Arc<dyn ModelGateway>,
  prompts: Prompts,
  batch_size: usize,
}

impl BatchOrchestrator {
  pub fn new(gateway: Arc<dyn ModelGateway>, prompts: Prompts) -> Self {
    Self { gateway, prompts, batch_size: BATCH_SIZE }
  }

  #[cfg(test)]
  pub fn with_batch_size(mut self, batch_size: usize) -> Self {
    self.batch_size = batch_size.max(1);
    self
  }

  pub fn gateway_name(&self) -> &str {
    self.gateway.name()
  }

  /// Run all batches sequentially. Returns every collected item or a single terminal error.
  ///
  /// The result length may differ from `config.count`: overflow is kept and a short
  /// final batch is not topped up.
  #[instrument(
    level = "info",
    skip(self, handle, media, config),
    fields(run_id = %handle.id, count = config.count, media = media.len(), gateway = %self.gateway.name())
  )]
  pub async fn run(
    &self,
    handle: &RunHandle,
    media: &[Arc<MediaItem>],
    config: &GenerationConfig,
  ) -> Result<Vec<QuizItem>, RunError> {
    validate_run(media, config)?;

    let total = i64::try_from(config.count)
      .map_err(|_| ValidationError::CountOutOfRange { count: config.count, max: MAX_COUNT })?;
    let slots = batch_count(config.count, self.batch_size);
    handle.batches_planned.store(slots, Ordering::SeqCst);
    info!(target: "quiz", batches = slots, batch_size = self.batch_size, difficulty = config.difficulty.label(), "Run started");

    let start = Instant::now();
    let mut collected: Vec<QuizItem> = Vec::with_capacity(config.count.min(self.batch_size));

    for (batch_index, planned) in plan_batches(total, self.batch_size).enumerate() {
      let remaining = config.count.saturating_sub(collected.len());
      let want = remaining.min(self.batch_size);
      if want == 0 {
        info!(target: "quiz", batch_index, collected = collected.len(), "Requested total reached early; stopping");
        break;
      }
      if handle.is_cancelled() {
        warn!(target: "quiz", batch_index, collected = collected.len(), "Run cancelled before dispatch");
        return Err(RunError::Cancelled);
      }

      debug!(target: "quiz", batch_index, planned, want, "Dispatching batch");
      let request = build_batch_request(&self.prompts, config, batch_index, want);
      let batch_start = Instant::now();
      let items = match self.run_batch(handle, media, &request).await {
        Ok(items) => items,
        Err(source) => {
          error!(target: "quiz", batch_index, want, elapsed = ?batch_start.elapsed(), error = %source, "Batch failed; aborting run");
          return Err(RunError::Gateway { batch_index, source });
        }
      };

      let received = items.len();
      if received != want {
        warn!(target: "quiz", batch_index, want, received, "Model returned a different number of items than requested");
      }
      let off_type = items.iter().filter(|i| !config.types.contains(&i.item_type)).count();
      if off_type > 0 {
        warn!(target: "quiz", batch_index, off_type, "Model returned items of unrequested types");
      }

      collected.extend(items);
      handle.record_batch(collected.len());
      info!(target: "quiz", batch_index, want, received, collected = collected.len(), elapsed = ?batch_start.elapsed(), "Batch completed");
    }

    info!(target: "quiz", requested = config.count, collected = collected.len(), elapsed = ?start.elapsed(), "Run completed");
    Ok(collected)
  }

  async fn run_batch(
    &self,
    handle: &RunHandle,
    media: &[Arc<MediaItem>],
    request: &BatchRequest,
  ) -> Result<Vec<QuizItem>, GatewayError> {
    let payload = self.gateway.generate(media, request).await?;
    let raw = decode_batch(&payload)?;
    raw
      .into_iter()
      .enumerate()
      .map(|(position, r)| normalize_item(r, handle.item_id(request.batch_index, position)))
      .collect()
  }
}
