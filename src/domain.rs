//! Domain models: quiz item types, difficulty, answers, quiz items, run configuration and media.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of question kinds the generator may produce.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
  SingleChoice,
  MultipleChoice,
  TrueFalse,
}

impl ItemType {
  /// Fixed export order.
  pub const ALL: [ItemType; 3] = [ItemType::SingleChoice, ItemType::MultipleChoice, ItemType::TrueFalse];

  /// Name used on the wire and inside the response schema.
  pub fn wire_name(self) -> &'static str {
    match self {
      ItemType::SingleChoice => "single_choice",
      ItemType::MultipleChoice => "multiple_choice",
      ItemType::TrueFalse => "true_false",
    }
  }

  /// Human label used in prompts and exported documents.
  pub fn label(self) -> &'static str {
    match self {
      ItemType::SingleChoice => "Single choice",
      ItemType::MultipleChoice => "Multiple choice",
      ItemType::TrueFalse => "True / false",
    }
  }

  pub fn is_choice(self) -> bool {
    matches!(self, ItemType::SingleChoice | ItemType::MultipleChoice)
  }

  /// Map a label the model sent back onto the enum.
  /// Accepts wire names, English labels and the Chinese labels the model tends to echo.
  pub fn parse_label(raw: &str) -> Option<ItemType> {
    let key: String = raw
      .trim()
      .chars()
      .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '/'))
      .collect::<String>()
      .to_lowercase();
    match key.as_str() {
      "singlechoice" | "single" | "单选题" | "单选" => Some(ItemType::SingleChoice),
      "multiplechoice" | "multichoice" | "multiple" | "多选题" | "多选" => Some(ItemType::MultipleChoice),
      "truefalse" | "trueorfalse" | "judgement" | "判断题" | "判断" => Some(ItemType::TrueFalse),
      _ => None,
    }
  }
}

impl fmt::Display for ItemType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
  Basic,
  #[default]
  Intermediate,
  Expert,
}

impl Difficulty {
  pub fn label(self) -> &'static str {
    match self {
      Difficulty::Basic => "basic",
      Difficulty::Intermediate => "intermediate",
      Difficulty::Expert => "expert",
    }
  }
}

/// Correct answer of an item. Serialized as a bare string or an array of strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Answer {
  Single(String),
  Multiple(Vec<String>),
}

impl Answer {
  pub fn values(&self) -> Vec<&str> {
    match self {
      Answer::Single(v) => vec![v.as_str()],
      Answer::Multiple(vs) => vs.iter().map(String::as_str).collect(),
    }
  }
}

/// One generated question. Ids are assigned by the orchestrator, never by the model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizItem {
  pub id: String,
  #[serde(rename = "type")]
  pub item_type: ItemType,
  pub content: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
  pub answer: Answer,
  pub explanation: String,
  pub hazard_focus: String,
}

/// Per-run configuration. Immutable once a run starts.
/// Fields left out of a request fall back to `GenerationConfig::default()`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
  pub count: usize,
  pub types: Vec<ItemType>,
  pub difficulty: Difficulty,
}

impl Default for GenerationConfig {
  fn default() -> Self {
    Self {
      count: 50,
      types: vec![ItemType::SingleChoice, ItemType::TrueFalse],
      difficulty: Difficulty::Intermediate,
    }
  }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
  Image,
  Video,
}

impl MediaKind {
  pub fn from_mime(mime: &str) -> Option<MediaKind> {
    if mime.starts_with("image/") {
      Some(MediaKind::Image)
    } else if mime.starts_with("video/") {
      Some(MediaKind::Video)
    } else {
      None
    }
  }
}

/// Uploaded media held in memory. Bytes are already decoded.
#[derive(Clone, Debug)]
pub struct MediaItem {
  pub id: String,
  pub name: String,
  pub mime_type: String,
  pub kind: MediaKind,
  pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn item_type_labels_map_one_to_one() {
    for t in ItemType::ALL {
      assert_eq!(ItemType::parse_label(t.wire_name()), Some(t));
      assert_eq!(ItemType::parse_label(t.label()), Some(t));
    }
    assert_eq!(ItemType::parse_label("单选题"), Some(ItemType::SingleChoice));
    assert_eq!(ItemType::parse_label(" Multiple-Choice "), Some(ItemType::MultipleChoice));
    assert_eq!(ItemType::parse_label("判断题"), Some(ItemType::TrueFalse));
    assert_eq!(ItemType::parse_label("essay"), None);
  }

  #[test]
  fn answer_serializes_untagged() {
    let one = serde_json::to_string(&Answer::Single("True".into())).unwrap();
    assert_eq!(one, "\"True\"");
    let many: Answer = serde_json::from_str(r#"["a","b"]"#).unwrap();
    assert_eq!(many, Answer::Multiple(vec!["a".into(), "b".into()]));
  }

  #[test]
  fn quiz_item_uses_camel_case_wire_names() {
    let item = QuizItem {
      id: "gen-1-0-0".into(),
      item_type: ItemType::TrueFalse,
      content: "Ladders may be used as work platforms.".into(),
      options: vec![],
      answer: Answer::Single("False".into()),
      explanation: "Use a proper platform.".into(),
      hazard_focus: "Working at height".into(),
    };
    let v = serde_json::to_value(&item).unwrap();
    assert_eq!(v["type"], "true_false");
    assert_eq!(v["hazardFocus"], "Working at height");
    assert!(v.get("options").is_none());
  }

  #[test]
  fn config_defaults_difficulty() {
    let cfg: GenerationConfig = serde_json::from_str(r#"{"count":20,"types":["single_choice"]}"#).unwrap();
    assert_eq!(cfg.difficulty, Difficulty::Intermediate);
    assert_eq!(cfg.types, vec![ItemType::SingleChoice]);
  }

  #[test]
  fn missing_config_fields_use_defaults() {
    let cfg: GenerationConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, GenerationConfig::default());
    assert_eq!(cfg.count, 50);
    assert_eq!(cfg.types, vec![ItemType::SingleChoice, ItemType::TrueFalse]);

    let cfg: GenerationConfig = serde_json::from_str(r#"{"types":["multiple_choice"]}"#).unwrap();
    assert_eq!(cfg.count, 50);
    assert_eq!(cfg.difficulty, Difficulty::Intermediate);

    let cfg: GenerationConfig = serde_json::from_str(r#"{"count":5,"types":[]}"#).unwrap();
    assert!(cfg.types.is_empty());
  }
}
