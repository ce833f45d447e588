//! Loading quiz configuration (prompts + export settings) from TOML.
//!
//! See `QuizConfig` and `Prompts` for the expected schema. Every section is optional;
//! missing values fall back to the built-in defaults.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub export: ExportSettings,
}

/// Prompts sent with every batch.
///
/// `batch_template` placeholders: `{count}`, `{types}`, `{difficulty}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub system: String,
  pub batch_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      system: "You are a workplace-safety question bank assistant that strictly follows the output format.\n\
1. Output ONLY a standard JSON array.\n\
2. Question text must never contain words like 'image', 'photo', 'video', 'as shown' or 'in the figure'.\n\
3. Single-choice and multiple-choice questions must have exactly four options. Option strings must NOT start with label prefixes such as 'A.' or 'B.'.\n\
4. Generate exactly the number of questions requested.".into(),
      batch_template: "You are a senior corporate safety expert.\n\
Analyse the attached workplace photos or videos, identify the safety hazards they show (or the points where work is done correctly), and build a safety training question bank from that analysis.\n\
\n\
Strict requirements for this batch:\n\
1. Generate exactly {count} questions, no more and no fewer.\n\
2. Question types must be limited to: {types}.\n\
3. Difficulty level: {difficulty}.\n\
4. Every question must relate closely to the scenes, equipment, operations or environment in the material.\n\
5. Never refer to the material: phrases such as 'as shown', 'in the picture', 'in the video', 'figure 1' or 'above' are forbidden. Each question must be a self-contained scenario description that places the learner on site.\n\
6. Options: single_choice and multiple_choice questions must have exactly four options, ordered as they will be labelled A, B, C, D, placed in the options array. Do NOT put 'A.', 'B.' or any other label prefix inside the option strings; give only the option text. true_false questions have no options.\n\
7. Completeness: every question needs its content, options (for choice types), the correct answer (the option text for single choice, every correct option text for multiple choice, True or False for true_false), an explanation of why it is safe or unsafe citing general safety practice, and the specific hazard point it targets (hazardFocus).\n\
8. The output must be a strict JSON array.".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
  pub title: String,
}

impl Default for ExportSettings {
  fn default() -> Self {
    Self { title: "Workplace Safety Hazard Quiz".into() }
  }
}

pub fn parse_quiz_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  toml::from_str::<QuizConfig>(s)
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_quiz_config(&s) {
      Ok(cfg) => {
        info!(target: "safetylens_backend", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "safetylens_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "safetylens_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
