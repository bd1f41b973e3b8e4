//! The result of one evaluation run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Outcome;
use crate::statistics::RunSummary;

/// A complete evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    /// Unique run identifier.
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Backend name (e.g. "local").
    pub backend: String,
    /// Model that answered the questions.
    pub model: String,
    /// Where the dataset was loaded from.
    pub dataset_source: String,
    /// Number of records in the dataset, processed or not.
    pub dataset_size: usize,
    /// Whether the dataset carried an `Answer` column.
    pub has_ground_truth: bool,
    /// One outcome per processed record, in dataset order.
    pub outcomes: Vec<Outcome>,
    pub summary: RunSummary,
    /// True when the operator stopped the run before the last record.
    pub aborted: bool,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl EvalReport {
    /// Records never reached because the run was aborted.
    pub fn skipped(&self) -> usize {
        self.dataset_size.saturating_sub(self.outcomes.len())
    }

    /// Default report file name, derived from the model id.
    pub fn default_file_name(&self) -> String {
        format!("{}_results.csv", safe_file_stem(&self.model))
    }
}

/// Replace characters that are awkward in file names.
pub fn safe_file_stem(model: &str) -> String {
    model
        .chars()
        .map(|c| match c {
            '-' | '.' | '/' | ':' | '\\' | ' ' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_model() {
        assert_eq!(safe_file_stem("claude-opus-4-1-20250805"), "claude_opus_4_1_20250805");
        assert_eq!(safe_file_stem("qwen/qwen3-4b:q4.gguf"), "qwen_qwen3_4b_q4_gguf");
    }

    #[test]
    fn skipped_counts_unprocessed_records() {
        let report = EvalReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            backend: "local".into(),
            model: "gemini-1.5-flash".into(),
            dataset_source: "t.csv".into(),
            dataset_size: 5,
            has_ground_truth: true,
            outcomes: vec![],
            summary: RunSummary::from_outcomes(&[]),
            aborted: true,
            duration_ms: 0,
        };
        assert_eq!(report.skipped(), 5);
        assert_eq!(report.default_file_name(), "gemini_1_5_flash_results.csv");
    }
}
