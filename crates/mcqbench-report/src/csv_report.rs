//! CSV result file.
//!
//! One row per processed question, echoing the dataset columns, followed by a
//! single summary row. The file starts with a UTF-8 BOM so spreadsheet tools
//! pick the right encoding for non-ASCII questions.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use mcqbench_core::model::{Dataset, Outcome};
use mcqbench_core::report::EvalReport;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub const HEADER: [&str; 9] = [
    "Question",
    "Option 1",
    "Option 2",
    "Option 3",
    "Option 4",
    "Answer",
    "Model Response",
    "Model Answer",
    "Is Correct (O/X)",
];

/// Where the report goes when no explicit path was given.
pub fn default_report_path(report: &EvalReport, output_dir: &Path) -> PathBuf {
    output_dir.join(report.default_file_name())
}

fn outcome_row(outcome: &Outcome, dataset: &Dataset) -> [String; 9] {
    let record = dataset.records.get(outcome.index);
    let [o1, o2, o3, o4] = record.map(|r| r.options.clone()).unwrap_or_default();
    // The input cell as written, so unusable values stay visible.
    let answer = match record {
        Some(r) if !r.answer_text.is_empty() => r.answer_text.clone(),
        _ => outcome
            .expected_answer
            .map(|c| c.to_string())
            .unwrap_or_default(),
    };

    let verdict = match (outcome.expected_answer, outcome.is_correct) {
        (None, _) => "",
        (Some(_), true) => "O",
        (Some(_), false) => "X",
    };

    [
        outcome.question_text.clone(),
        o1,
        o2,
        o3,
        o4,
        answer,
        outcome.raw_response.clone().unwrap_or_default(),
        outcome.model_answer.to_string(),
        verdict.to_string(),
    ]
}

fn summary_row(report: &EvalReport) -> [String; 9] {
    let summary = &report.summary;
    let accuracy = if report.has_ground_truth {
        format!("Final Accuracy: {:.2}%", summary.accuracy)
    } else {
        "Final Accuracy: N/A (no Answer column)".to_string()
    };
    let mut total = format!("Total Questions: {}", summary.total_records);
    if report.aborted {
        total.push_str(", aborted");
    }

    [
        format!("SUMMARY - Model: {}", report.model),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format!(
            "Correct: {}/{}",
            summary.correct_count, summary.answered_count
        ),
        accuracy,
        format!("API Errors: {}", summary.api_error_count),
        total,
    ]
}

/// Write the report as CSV, replacing any existing file at `path`.
pub fn write_csv_report(report: &EvalReport, dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADER)?;
    for outcome in &report.outcomes {
        writer.write_record(outcome_row(outcome, dataset))?;
    }
    writer.write_record(summary_row(report))?;
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
