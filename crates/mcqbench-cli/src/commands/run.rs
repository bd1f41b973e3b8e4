//! The `mcqbench run` command.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use mcqbench_core::dataset::{load_dataset, validate_dataset};
use mcqbench_core::engine::{AbortHandle, Evaluator, EvaluatorConfig, ProgressReporter};
use mcqbench_core::model::{Outcome, QuestionRecord};
use mcqbench_core::report::EvalReport;
use mcqbench_core::retry::{FinalFailure, RetryPolicy};
use mcqbench_core::statistics::RunningTally;
use mcqbench_core::ProviderError;
use mcqbench_providers::config::load_config_from;
use mcqbench_providers::BackendKind;
use mcqbench_report::{default_report_path, write_csv_report};

use super::backend;

/// Console progress reporter.
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn on_question_start(&self, index: usize, total: usize, record: &QuestionRecord) {
        eprintln!("\n--- [Question {}/{}] ---", index + 1, total);
        eprintln!("  {}", record.question);
    }

    fn on_retry(&self, _index: usize, attempt: u32, error: &ProviderError, delay: Duration) {
        eprintln!(
            "  Attempt {attempt} failed ({error}); retrying in {:.1}s",
            delay.as_secs_f64()
        );
    }

    fn on_api_error(&self, _index: usize, failure: &FinalFailure) {
        eprintln!("  ERROR: {failure}");
    }

    fn on_outcome(&self, outcome: &Outcome, tally: &RunningTally) {
        match outcome.expected_answer {
            Some(expected) => eprintln!(
                "  Expected: {expected}, model: {}, result: {} (running accuracy {:.1}%)",
                outcome.model_answer,
                if outcome.is_correct { "O" } else { "X" },
                tally.accuracy()
            ),
            None => eprintln!("  Model: {}", outcome.model_answer),
        }
    }

    fn on_run_complete(&self, report: &EvalReport) {
        if report.aborted {
            eprintln!(
                "\nRun stopped: {} of {} questions processed",
                report.outcomes.len(),
                report.dataset_size
            );
        } else {
            eprintln!(
                "\nComplete: {} questions ({:.1}s)",
                report.outcomes.len(),
                report.duration_ms as f64 / 1000.0
            );
        }
    }
}

pub async fn execute(
    dataset_path: Option<PathBuf>,
    backend_kind: Option<BackendKind>,
    model: Option<String>,
    output: Option<PathBuf>,
    delay_ms: Option<u64>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    // Load config
    let config = load_config_from(config_path.as_deref())?;

    // Load the dataset before touching the network
    let dataset_path = dataset_path.unwrap_or_else(|| config.dataset.clone());
    let dataset = load_dataset(&dataset_path)
        .with_context(|| format!("cannot use dataset {}", dataset_path.display()))?;
    for warning in validate_dataset(&dataset) {
        match warning.row {
            Some(row) => eprintln!("Warning: row {row}: {}", warning.message),
            None => eprintln!("Warning: {}", warning.message),
        }
    }

    let client = backend::connect(&config, backend_kind, model.as_deref()).await?;

    let evaluator_config = EvaluatorConfig {
        request_delay: Duration::from_millis(delay_ms.unwrap_or(config.request_delay_ms)),
    };
    let mut evaluator = Evaluator::new(client, RetryPolicy::new(&config.retry), evaluator_config);

    // Ctrl-C stops the run between questions; gathered outcomes are still written.
    let abort = AbortHandle::new();
    let watcher = {
        let abort = abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted; stopping after the current question...");
                abort.abort();
            }
        })
    };

    eprintln!(
        "mcqbench v{}: {} questions from {}",
        env!("CARGO_PKG_VERSION"),
        dataset.len(),
        dataset.source
    );

    let result = evaluator.run(&dataset, &ConsoleReporter, &abort).await;
    watcher.abort();
    let report = result?;

    let path = output.unwrap_or_else(|| default_report_path(&report, &config.output_dir));
    write_csv_report(&report, &dataset, &path)?;

    print_summary(&report);
    eprintln!("Results saved to: {}", path.display());

    Ok(())
}

fn print_summary(report: &EvalReport) {
    use comfy_table::{Cell, Table};

    let summary = &report.summary;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);

    table.add_row(vec![Cell::new("Model"), Cell::new(&report.model)]);
    table.add_row(vec![
        Cell::new("Questions"),
        Cell::new(summary.total_records),
    ]);
    if report.aborted {
        table.add_row(vec![Cell::new("Skipped"), Cell::new(report.skipped())]);
    }
    table.add_row(vec![
        Cell::new("API errors"),
        Cell::new(summary.api_error_count),
    ]);
    table.add_row(vec![
        Cell::new("Answered"),
        Cell::new(summary.answered_count),
    ]);
    table.add_row(vec![
        Cell::new("Unparseable"),
        Cell::new(summary.unparseable_count),
    ]);

    if report.has_ground_truth {
        table.add_row(vec![Cell::new("Correct"), Cell::new(summary.correct_count)]);
        table.add_row(vec![
            Cell::new("Accuracy"),
            Cell::new(format!("{:.2}%", summary.accuracy)),
        ]);
        table.add_row(vec![Cell::new("Rating"), Cell::new(summary.band())]);
    } else {
        table.add_row(vec![
            Cell::new("Accuracy"),
            Cell::new("n/a (no Answer column)"),
        ]);
    }

    eprintln!("\n{table}");
}
