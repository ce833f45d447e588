//! Turning raw model objects into `QuizItem`s.
//!
//! Labels (A, B, C, ...) are never stored: they are stripped from option and answer
//! text here and re-derived from array position when rendering.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Answer, ItemType, QuizItem};
use crate::error::GatewayError;
use crate::gateway::{RawAnswer, RawItem};
use crate::request::OPTION_COUNT;

static LABEL_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-F][.:、：．)）\s]\s*").unwrap());

static BARE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-F])[.:、：．)）]?$").unwrap());

const ANSWER_SEPARATORS: &[char] = &[',', '，', '、', ';', '；'];

/// Remove a leading `A.` / `B)` / `C、` / `D ` style label. Clean text is returned unchanged.
pub fn strip_label_prefix(text: &str) -> String {
  let t = text.trim();
  LABEL_PREFIX_RE.replace(t, "").trim_end().to_string()
}

/// Display label for the option at `index`.
pub fn option_label(index: usize) -> char {
  if index < 26 {
    (b'A' + index as u8) as char
  } else {
    '-'
  }
}

fn label_index(text: &str) -> Option<usize> {
  let caps = BARE_LABEL_RE.captures(text.trim())?;
  let letter = caps.get(1)?.as_str().chars().next()?;
  Some((letter as u8 - b'A') as usize)
}

fn drift(msg: impl Into<String>) -> GatewayError {
  GatewayError::SchemaDrift(msg.into())
}

fn required_text(field: &str, value: &str) -> Result<String, GatewayError> {
  let v = value.trim();
  if v.is_empty() {
    Err(drift(format!("field \"{field}\" is empty")))
  } else {
    Ok(v.to_string())
  }
}

/// Normalize one raw object. Any mismatch with the item invariants is schema drift.
pub fn normalize_item(raw: RawItem, id: String) -> Result<QuizItem, GatewayError> {
  let item_type = ItemType::parse_label(&raw.item_type)
    .ok_or_else(|| drift(format!("unknown question type \"{}\"", raw.item_type)))?;
  let content = required_text("content", &raw.content)?;
  let explanation = required_text("explanation", &raw.explanation)?;
  let hazard_focus = required_text("hazardFocus", &raw.hazard_focus)?;

  let (options, answer) = if item_type.is_choice() {
    let options = normalize_options(raw.options.unwrap_or_default())?;
    let answer = resolve_choice_answer(item_type, &options, raw.answer)?;
    (options, answer)
  } else {
    (Vec::new(), Answer::Single(resolve_true_false(raw.answer)?))
  };

  Ok(QuizItem { id, item_type, content, options, answer, explanation, hazard_focus })
}

fn normalize_options(raw: Vec<String>) -> Result<Vec<String>, GatewayError> {
  if raw.len() != OPTION_COUNT {
    return Err(drift(format!("choice question has {} options, expected {}", raw.len(), OPTION_COUNT)));
  }
  let options: Vec<String> = raw.iter().map(|o| strip_label_prefix(o)).collect();
  if options.iter().any(String::is_empty) {
    return Err(drift("choice question has an empty option"));
  }
  Ok(options)
}

/// Resolve one answer value to an option index: bare label first, then option text.
fn resolve_one(options: &[String], value: &str) -> Option<usize> {
  if let Some(idx) = label_index(value) {
    return (idx < options.len()).then_some(idx);
  }
  let text = strip_label_prefix(value);
  options
    .iter()
    .position(|o| *o == text)
    .or_else(|| options.iter().position(|o| o.to_lowercase() == text.to_lowercase()))
}

fn split_multi(options: &[String], text: &str) -> Vec<String> {
  if resolve_one(options, text).is_some() {
    return vec![text.to_string()];
  }
  let compact: String = text
    .chars()
    .filter(|c| !c.is_whitespace() && !ANSWER_SEPARATORS.contains(c))
    .collect();
  if !compact.is_empty() && compact.chars().all(|c| ('A'..='F').contains(&c)) {
    return compact.chars().map(String::from).collect();
  }
  text
    .split(ANSWER_SEPARATORS)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}

fn resolve_choice_answer(item_type: ItemType, options: &[String], raw: RawAnswer) -> Result<Answer, GatewayError> {
  let values = match raw {
    RawAnswer::Text(s) if item_type == ItemType::MultipleChoice => split_multi(options, &s),
    RawAnswer::Text(s) => vec![s],
    RawAnswer::List(vs) => vs,
    RawAnswer::Flag(b) => return Err(drift(format!("boolean answer {b} on a choice question"))),
  };

  let mut picked: Vec<usize> = Vec::new();
  for v in &values {
    let idx = resolve_one(options, v).ok_or_else(|| drift(format!("answer \"{v}\" matches no option")))?;
    if !picked.contains(&idx) {
      picked.push(idx);
    }
  }
  picked.sort_unstable();

  match (item_type, picked.len()) {
    (_, 0) => Err(drift("choice question has no answer")),
    (ItemType::SingleChoice, 1) => Ok(Answer::Single(options[picked[0]].clone())),
    (ItemType::SingleChoice, n) => Err(drift(format!("single-choice question has {n} answers"))),
    _ => Ok(Answer::Multiple(picked.into_iter().map(|i| options[i].clone()).collect())),
  }
}

fn resolve_true_false(raw: RawAnswer) -> Result<String, GatewayError> {
  let text = match raw {
    RawAnswer::Flag(b) => return Ok(canonical_bool(b)),
    RawAnswer::Text(s) => s,
    RawAnswer::List(vs) if vs.len() == 1 => vs.into_iter().next().unwrap_or_default(),
    RawAnswer::List(vs) => return Err(drift(format!("true/false question has {} answers", vs.len()))),
  };
  let key = text.trim().trim_end_matches(['.', '。']).to_lowercase();
  match key.as_str() {
    "true" | "t" | "yes" | "correct" | "正确" | "对" | "是" | "√" | "✓" => Ok(canonical_bool(true)),
    "false" | "f" | "no" | "incorrect" | "错误" | "错" | "否" | "×" | "✗" => Ok(canonical_bool(false)),
    _ => Err(drift(format!("true/false answer \"{}\" is not recognised", text.trim()))),
  }
}

fn canonical_bool(b: bool) -> String {
  if b { "True".into() } else { "False".into() }
}

/// Text shown for an answer in the answer key: labels re-derived from option positions.
pub fn display_answer(item: &QuizItem) -> String {
  if !item.item_type.is_choice() {
    return item.answer.values().join(", ");
  }
  item
    .answer
    .values()
    .into_iter()
    .map(|v| match item.options.iter().position(|o| o == v) {
      Some(i) => format!("{}. {}", option_label(i), v),
      None => v.to_string(),
    })
    .collect::<Vec<_>>()
    .join("; ")
}
