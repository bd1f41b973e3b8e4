//! CSV dataset loader.
//!
//! Loads question sets from tabular files and validates them. A header row is
//! mandatory; `Question` and `Option 1`..`Option 4` must all be present or the
//! whole load fails. `Answer` is optional.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::error::DatasetError;
use crate::model::{normalize_answer, Dataset, QuestionRecord, OPTION_COUNT};

pub const QUESTION_COLUMN: &str = "Question";
pub const OPTION_COLUMNS: [&str; OPTION_COUNT] = ["Option 1", "Option 2", "Option 3", "Option 4"];
pub const ANSWER_COLUMN: &str = "Answer";

/// Column positions resolved from the header row.
struct ColumnMap {
    question: usize,
    options: [usize; OPTION_COUNT],
    answer: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
        let present: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |name: &str| present.iter().position(|h| h == name);

        let missing: Vec<String> = std::iter::once(QUESTION_COLUMN)
            .chain(OPTION_COLUMNS)
            .filter(|name| find(*name).is_none())
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns { missing, present });
        }

        let mut options = [0; OPTION_COUNT];
        for (slot, name) in options.iter_mut().zip(OPTION_COLUMNS) {
            *slot = find(name).unwrap_or_default();
        }

        Ok(Self {
            question: find(QUESTION_COLUMN).unwrap_or_default(),
            options,
            answer: find(ANSWER_COLUMN),
        })
    }
}

/// Load a dataset from a CSV file.
pub fn load_dataset(path: &Path) -> Result<Dataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_dataset_from_reader(file, &path.display().to_string())
}

/// Load a dataset from any reader (useful for testing).
pub fn load_dataset_from_reader<R: Read>(reader: R, source: &str) -> Result<Dataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = ColumnMap::resolve(reader.headers()?)?;

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let cell = |i: usize| row.get(i).unwrap_or_default().to_string();

        let answer_text = columns.answer.map(cell).unwrap_or_default();
        let expected_answer = normalize_answer(&answer_text);
        if expected_answer.is_none() && !answer_text.trim().is_empty() {
            tracing::warn!(row = idx + 1, value = %answer_text, "ignoring unusable Answer value");
        }

        records.push(QuestionRecord {
            question: cell(columns.question),
            options: columns.options.map(cell),
            expected_answer,
            answer_text,
        });
    }

    tracing::debug!(source, count = records.len(), "loaded dataset");

    Ok(Dataset {
        source: source.to_string(),
        has_answer_column: columns.answer.is_some(),
        records,
    })
}

/// A non-fatal issue found in a dataset.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// 1-based record number, if the warning concerns one record.
    pub row: Option<usize>,
    pub message: String,
}

/// Check a loaded dataset for common issues.
pub fn validate_dataset(dataset: &Dataset) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if dataset.is_empty() {
        warnings.push(ValidationWarning {
            row: None,
            message: "dataset has no questions".into(),
        });
    }

    if !dataset.has_ground_truth() {
        warnings.push(ValidationWarning {
            row: None,
            message: "no Answer column; accuracy cannot be scored".into(),
        });
    }

    let mut seen = HashSet::new();
    for (idx, record) in dataset.records.iter().enumerate() {
        let row = Some(idx + 1);
        if record.question.trim().is_empty() {
            warnings.push(ValidationWarning {
                row,
                message: "question text is empty".into(),
            });
        } else if !seen.insert(record.question.trim()) {
            warnings.push(ValidationWarning {
                row,
                message: "duplicate question text".into(),
            });
        }
        if dataset.has_ground_truth() && record.expected_answer.is_none() {
            warnings.push(ValidationWarning {
                row,
                message: "Answer is missing or not a number in 1-4".into(),
            });
        }
    }

    warnings
}
