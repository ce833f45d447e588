//! Quiz export: an ordered document model rendered to a `.docx` artifact.
//!
//! Layout: title, generation date, one section per item type present (fixed order),
//! then a page break and an answer key covering every item in original order.

use std::io::Cursor;

use chrono::{Local, NaiveDate};
use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run};
use tracing::{info, instrument};

use crate::domain::{ItemType, QuizItem};
use crate::error::ExportError;
use crate::normalize::{display_answer, option_label, strip_label_prefix};

pub const EXPORT_FILENAME: &str = "safety-quiz-bank.docx";
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const ROMAN: [&str; 3] = ["I", "II", "III"];
const MUTED: &str = "666666";
const ANSWER_RED: &str = "D32F2F";

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
  Title(String),
  Subtitle(String),
  SectionHeading { item_type: ItemType, text: String },
  Question { number: usize, content: String, hazard_focus: String },
  OptionLine { label: char, text: String },
  Spacer,
  PageBreak,
  AnswerKeyHeading(String),
  AnswerEntry { index: usize, item_type: ItemType, section_number: usize, answer: String },
  Explanation(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuizDocument {
  pub blocks: Vec<Block>,
}

impl QuizDocument {
  /// Item types that got a section, in document order.
  pub fn sections(&self) -> Vec<ItemType> {
    self
      .blocks
      .iter()
      .filter_map(|b| match b {
        Block::SectionHeading { item_type, .. } => Some(*item_type),
        _ => None,
      })
      .collect()
  }

  pub fn answer_entries(&self) -> Vec<&Block> {
    self.blocks.iter().filter(|b| matches!(b, Block::AnswerEntry { .. })).collect()
  }
}

/// Build the document model. Pure; the date is passed in.
pub fn build_document(items: &[QuizItem], title: &str, generated_on: NaiveDate) -> QuizDocument {
  let mut blocks = vec![
    Block::Title(title.to_string()),
    Block::Subtitle(format!("Generated on {}", generated_on.format("%Y-%m-%d"))),
  ];

  // Number within section, indexed like `items`.
  let mut section_numbers = vec![0usize; items.len()];
  let mut section_no = 0;

  for item_type in ItemType::ALL {
    let members: Vec<(usize, &QuizItem)> = items.iter().enumerate().filter(|(_, q)| q.item_type == item_type).collect();
    if members.is_empty() {
      continue;
    }
    blocks.push(Block::SectionHeading {
      item_type,
      text: format!("{}. {}", ROMAN[section_no], item_type.label()),
    });
    section_no += 1;

    for (n, (idx, q)) in members.into_iter().enumerate() {
      section_numbers[idx] = n + 1;
      blocks.push(Block::Question {
        number: n + 1,
        content: q.content.clone(),
        hazard_focus: q.hazard_focus.clone(),
      });
      for (i, opt) in q.options.iter().enumerate() {
        blocks.push(Block::OptionLine { label: option_label(i), text: strip_label_prefix(opt) });
      }
      blocks.push(Block::Spacer);
    }
  }

  blocks.push(Block::PageBreak);
  blocks.push(Block::AnswerKeyHeading("Answers and explanations".into()));
  for (idx, q) in items.iter().enumerate() {
    blocks.push(Block::AnswerEntry {
      index: idx + 1,
      item_type: q.item_type,
      section_number: section_numbers[idx],
      answer: display_answer(q),
    });
    blocks.push(Block::Explanation(q.explanation.clone()));
  }

  QuizDocument { blocks }
}

fn paragraph(block: &Block) -> Paragraph {
  match block {
    Block::Title(t) => Paragraph::new()
      .add_run(Run::new().add_text(t).bold().size(36))
      .align(AlignmentType::Center),
    Block::Subtitle(t) => Paragraph::new()
      .add_run(Run::new().add_text(t).italic().color(MUTED))
      .align(AlignmentType::Center),
    Block::SectionHeading { text, .. } => Paragraph::new().add_run(Run::new().add_text(text).bold().size(28)),
    Block::Question { number, content, hazard_focus } => Paragraph::new()
      .add_run(Run::new().add_text(format!("{number}. {content}")).bold())
      .add_run(Run::new().add_text(format!(" [{hazard_focus}]")).italic().color(MUTED).size(16)),
    Block::OptionLine { label, text } => Paragraph::new().add_run(Run::new().add_tab().add_text(format!("{label}. {text}"))),
    Block::Spacer => Paragraph::new(),
    Block::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
    Block::AnswerKeyHeading(t) => Paragraph::new()
      .add_run(Run::new().add_text(t).bold().size(28))
      .align(AlignmentType::Center),
    Block::AnswerEntry { index, item_type, section_number, answer } => Paragraph::new()
      .add_run(Run::new().add_text(format!("{index}. [{item_type} #{section_number}] ")).bold())
      .add_run(Run::new().add_text(format!("Correct answer: {answer}")).bold().color(ANSWER_RED)),
    Block::Explanation(t) => Paragraph::new()
      .add_run(Run::new().add_text("Explanation: ").bold())
      .add_run(Run::new().add_text(t)),
  }
}

pub fn render_docx(doc: &QuizDocument) -> Result<Vec<u8>, ExportError> {
  let docx = doc.blocks.iter().fold(Docx::new(), |d, b| d.add_paragraph(paragraph(b)));
  let mut buf = Cursor::new(Vec::new());
  docx.build().pack(&mut buf).map_err(|e| ExportError::Pack(e.to_string()))?;
  Ok(buf.into_inner())
}

/// Build and render the export for `items`, dated today.
#[instrument(level = "info", skip(items, title), fields(items = items.len()))]
pub fn export_docx(items: &[QuizItem], title: &str) -> Result<Vec<u8>, ExportError> {
  if items.is_empty() {
    return Err(ExportError::NothingToExport);
  }
  let doc = build_document(items, title, Local::now().date_naive());
  let bytes = render_docx(&doc)?;
  info!(target: "quiz", sections = doc.sections().len(), answers = doc.answer_entries().len(), bytes = bytes.len(), "Quiz document exported");
  Ok(bytes)
}
