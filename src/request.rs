//! Batch planning and per-batch request payloads.
//!
//! A run asks the model for at most `BATCH_SIZE` items per call; the plan splits the
//! requested total into full batches plus one remainder batch.

use serde_json::{json, Value};

use crate::config::Prompts;
use crate::domain::{GenerationConfig, ItemType};
use crate::util::fill_template;

/// Items requested per model call. Keeps each response well inside the model's output limit.
pub const BATCH_SIZE: usize = 10;

/// Choice items carry exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// Largest question count a single run accepts.
pub const MAX_COUNT: usize = 200;

/// Number of dispatch slots needed for `total` items.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
  if batch_size == 0 {
    return 0;
  }
  total.div_ceil(batch_size)
}

/// Split `total_needed` into batch sizes. Every entry but the last equals `batch_size`.
/// Lazy, so the plan never allocates per batch.
pub fn plan_batches(total_needed: i64, batch_size: usize) -> impl ExactSizeIterator<Item = usize> {
  let total = if total_needed <= 0 { 0 } else { usize::try_from(total_needed).unwrap_or(usize::MAX) };
  let slots = batch_count(total, batch_size);
  (0..slots).map(move |i| if i + 1 < slots { batch_size } else { total - i * batch_size })
}

/// Everything the gateway needs for one batch, apart from the media.
#[derive(Clone, Debug)]
pub struct BatchRequest {
  pub batch_index: usize,
  pub count: usize,
  pub system_instruction: String,
  pub instructions: String,
  pub response_schema: Value,
}

/// Render the request for one batch of `count` items.
pub fn build_batch_request(prompts: &Prompts, config: &GenerationConfig, batch_index: usize, count: usize) -> BatchRequest {
  BatchRequest {
    batch_index,
    count,
    system_instruction: prompts.system.clone(),
    instructions: render_instructions(prompts, config, count),
    response_schema: response_schema(),
  }
}

pub fn render_instructions(prompts: &Prompts, config: &GenerationConfig, count: usize) -> String {
  let count_s = count.to_string();
  let types = types_for_prompt(&config.types);
  fill_template(
    &prompts.batch_template,
    &[("count", &count_s), ("types", &types), ("difficulty", config.difficulty.label())],
  )
}

/// `single_choice (Single choice), true_false (True / false)`, in fixed type order, no duplicates.
fn types_for_prompt(types: &[ItemType]) -> String {
  ItemType::ALL
    .iter()
    .filter(|t| types.contains(t))
    .map(|t| format!("{} ({})", t.wire_name(), t.label()))
    .collect::<Vec<_>>()
    .join(", ")
}

/// Structured-output schema: an array of question objects.
pub fn response_schema() -> Value {
  let type_names: Vec<&str> = ItemType::ALL.iter().map(|t| t.wire_name()).collect();
  json!({
    "type": "ARRAY",
    "items": {
      "type": "OBJECT",
      "properties": {
        "type": { "type": "STRING", "enum": type_names },
        "content": { "type": "STRING" },
        "options": { "type": "ARRAY", "items": { "type": "STRING" } },
        "answer": { "type": "STRING" },
        "explanation": { "type": "STRING" },
        "hazardFocus": { "type": "STRING" }
      },
      "required": ["type", "content", "answer", "explanation", "hazardFocus"]
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Difficulty;

  #[test]
  fn plan_sums_to_total_with_single_short_batch() {
    for total in 1..=137i64 {
      for batch in [1usize, 3, 7, 10, 25] {
        let plan: Vec<usize> = plan_batches(total, batch).collect();
        assert_eq!(plan.iter().sum::<usize>() as i64, total, "total={total} batch={batch}");
        assert!(plan.iter().all(|&n| n > 0 && n <= batch));
        assert!(plan.iter().filter(|&&n| n < batch).count() <= 1);
        let expected_len = (total as usize + batch - 1) / batch;
        assert_eq!(plan.len(), expected_len);
        if let Some((last, head)) = plan.split_last() {
          assert!(head.iter().all(|&n| n == batch));
          let rem = total as usize % batch;
          assert_eq!(*last, if rem == 0 { batch } else { rem });
        }
      }
    }
  }

  #[test]
  fn plan_is_empty_for_non_positive_totals() {
    assert_eq!(plan_batches(0, BATCH_SIZE).len(), 0);
    assert_eq!(plan_batches(-5, BATCH_SIZE).len(), 0);
    assert_eq!(plan_batches(i64::MIN, BATCH_SIZE).len(), 0);
  }

  #[test]
  fn plan_for_fifty_three() {
    assert_eq!(plan_batches(53, 10).collect::<Vec<_>>(), vec![10, 10, 10, 10, 10, 3]);
    assert_eq!(plan_batches(50, 10).collect::<Vec<_>>(), vec![10, 10, 10, 10, 10]);
  }

  #[test]
  fn huge_plans_are_sized_without_allocating() {
    let plan = plan_batches(2_000_000_000_003, 10);
    assert_eq!(plan.len(), 200_000_000_001);
    assert_eq!(plan.take(2).collect::<Vec<_>>(), vec![10, 10]);
    assert_eq!(batch_count(usize::MAX, 10), usize::MAX / 10 + 1);
    assert_eq!(batch_count(20, 0), 0);
  }

  #[test]
  fn instructions_embed_count_types_and_difficulty() {
    let cfg = GenerationConfig {
      count: 53,
      types: vec![ItemType::TrueFalse, ItemType::SingleChoice],
      difficulty: Difficulty::Expert,
    };
    let req = build_batch_request(&Prompts::default(), &cfg, 5, 3);
    assert_eq!(req.batch_index, 5);
    assert_eq!(req.count, 3);
    assert!(req.instructions.contains("exactly 3 questions"));
    assert!(req.instructions.contains("single_choice (Single choice), true_false (True / false)"));
    assert!(!req.instructions.contains("multiple_choice (Multiple choice)"));
    assert!(req.instructions.contains("Difficulty level: expert"));
    assert!(req.instructions.contains("exactly four options"));
    assert!(!req.instructions.contains("{count}"));
  }

  #[test]
  fn schema_lists_required_fields() {
    let schema = response_schema();
    assert_eq!(schema["type"], "ARRAY");
    let required: Vec<&str> = schema["items"]["required"]
      .as_array()
      .unwrap()
      .iter()
      .map(|v| v.as_str().unwrap())
      .collect();
    assert_eq!(required, vec!["type", "content", "answer", "explanation", "hazardFocus"]);
    assert_eq!(schema["items"]["properties"]["type"]["enum"][2], "true_false");
  }
}
