//! Core data model types for mcqbench.
//!
//! A `Dataset` is an ordered list of `QuestionRecord`s; evaluating one record
//! produces one immutable `Outcome`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A single answer choice, guaranteed to be in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Choice(u8);

impl Choice {
    /// Returns `None` unless `n` is a displayed choice number (1-4).
    pub fn new(n: u8) -> Option<Self> {
        (1..=OPTION_COUNT as u8).contains(&n).then_some(Choice(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Choice {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Choice::new(n).ok_or_else(|| format!("choice out of range: {n}"))
    }
}

impl From<Choice> for u8 {
    fn from(c: Choice) -> u8 {
        c.0
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    /// Index 0..3 correspond to displayed choices 1..4.
    pub options: [String; OPTION_COUNT],
    /// Ground truth, absent when the dataset has none for this record.
    #[serde(default)]
    pub expected_answer: Option<Choice>,
    /// The `Answer` cell as written in the input, echoed into the report
    /// even when it could not be normalized.
    #[serde(default)]
    pub answer_text: String,
}

impl QuestionRecord {
    pub fn new(question: impl Into<String>, options: [&str; OPTION_COUNT]) -> Self {
        Self {
            question: question.into(),
            options: options.map(str::to_string),
            expected_answer: None,
            answer_text: String::new(),
        }
    }

    pub fn with_answer(mut self, answer: u8) -> Self {
        self.expected_answer = Choice::new(answer);
        self.answer_text = answer.to_string();
        self
    }
}

/// The full quiz set, in input-file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    /// Where the records came from (file path or a test label).
    pub source: String,
    /// Whether the input carried an `Answer` column at all.
    pub has_answer_column: bool,
    pub records: Vec<QuestionRecord>,
}

impl Dataset {
    pub fn new(source: impl Into<String>, records: Vec<QuestionRecord>) -> Self {
        let has_answer_column = records.iter().any(|r| r.expected_answer.is_some());
        Self {
            source: source.into(),
            has_answer_column,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_ground_truth(&self) -> bool {
        self.has_answer_column
    }
}

/// What the model answered for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelAnswer {
    Choice(Choice),
    /// The reply arrived but contained no digit 1-4.
    Unparseable,
    /// Every attempt to reach the backend failed.
    ApiError,
}

impl ModelAnswer {
    pub fn choice(self) -> Option<Choice> {
        match self {
            ModelAnswer::Choice(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_api_error(self) -> bool {
        matches!(self, ModelAnswer::ApiError)
    }
}

impl fmt::Display for ModelAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelAnswer::Choice(c) => write!(f, "{c}"),
            ModelAnswer::Unparseable => write!(f, "UNPARSEABLE"),
            ModelAnswer::ApiError => write!(f, "API_ERROR"),
        }
    }
}

/// The recorded result of evaluating one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Position of the record in the dataset.
    pub index: usize,
    /// Full question text.
    pub question_text: String,
    pub model_answer: ModelAnswer,
    pub expected_answer: Option<Choice>,
    pub is_correct: bool,
    /// Trimmed model reply; absent when the backend never answered.
    pub raw_response: Option<String>,
    /// Requests sent for this question, retries included.
    pub attempts: u32,
}

impl Outcome {
    pub fn new(
        index: usize,
        record: &QuestionRecord,
        model_answer: ModelAnswer,
        raw_response: Option<String>,
        attempts: u32,
    ) -> Self {
        let is_correct = match (model_answer.choice(), record.expected_answer) {
            (Some(got), Some(want)) => got == want,
            _ => false,
        };
        Self {
            index,
            question_text: record.question.clone(),
            model_answer,
            expected_answer: record.expected_answer,
            is_correct,
            raw_response,
            attempts,
        }
    }

    /// Question text shortened for console display.
    pub fn display_question(&self) -> String {
        truncate_for_display(&self.question_text, DISPLAY_QUESTION_CHARS)
    }
}

/// Questions longer than this are shortened in console output.
pub const DISPLAY_QUESTION_CHARS: usize = 50;

/// Truncate to `max_chars` characters, appending `...` when anything was cut.
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Normalize a raw `Answer` cell to a choice.
///
/// Both sides of the correctness comparison are integers: the cell is trimmed
/// and parsed as an integer, and integral decimals such as `3.0` (what
/// spreadsheet exports produce for numeric columns with gaps) are accepted.
/// Anything else yields `None`.
pub fn normalize_answer(raw: &str) -> Option<Choice> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<u8>() {
        return Choice::new(n);
    }
    let value = trimmed.parse::<f64>().ok()?;
    if value.fract() != 0.0 || !(1.0..=OPTION_COUNT as f64).contains(&value) {
        return None;
    }
    Choice::new(value as u8)
}
