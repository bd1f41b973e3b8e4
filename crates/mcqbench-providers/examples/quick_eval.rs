//! Quick eval: drive the evaluator as a library, no server needed.
//!
//! A scripted `MockClient` stands in for a model so the whole pipeline
//! (dataset, prompt, retry, parsing, scoring, CSV report) runs offline.
//!
//! ```bash
//! cargo run -p mcqbench-providers --example quick_eval
//! ```

use std::sync::Arc;
use std::time::Duration;

use mcqbench_core::dataset::load_dataset_from_reader;
use mcqbench_core::engine::{AbortHandle, Evaluator, EvaluatorConfig, NoopReporter};
use mcqbench_core::retry::{RetryConfig, RetryPolicy};
use mcqbench_providers::mock::MockClient;
use mcqbench_providers::ProviderError;

const DATASET: &str = "\
Question,Option 1,Option 2,Option 3,Option 4,Answer
What is 7 x 8?,54,56,58,64,2
Which planet is known as the red planet?,Venus,Jupiter,Mars,Saturn,3
Chemical symbol for gold?,Ag,Au,Gd,Go,2
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dataset = load_dataset_from_reader(DATASET.as_bytes(), "inline")?;
    println!("Loaded {} questions", dataset.len());

    // One rate-limit hiccup, then keyed replies; the last one is wrong on purpose.
    let client = Arc::new(
        MockClient::new(vec![
            ("7 x 8".into(), "2".into()),
            ("red planet".into(), "The answer is 3.".into()),
            ("gold".into(), "1".into()),
        ])
        .with_model("quick-mock")
        .failing_first([ProviderError::RateLimited {
            retry_after_ms: None,
        }]),
    );

    let retry = RetryPolicy::new(&RetryConfig {
        rate_limit_backoff_ms: 200,
        ..RetryConfig::default()
    });
    let config = EvaluatorConfig {
        request_delay: Duration::from_millis(50),
    };
    let mut evaluator = Evaluator::new(client.clone(), retry, config);

    let report = evaluator
        .run(&dataset, &NoopReporter, &AbortHandle::new())
        .await?;

    for outcome in &report.outcomes {
        println!(
            "  [{}] {} -> {} (attempts: {})",
            outcome.index + 1,
            outcome.display_question(),
            outcome.model_answer,
            outcome.attempts,
        );
    }
    println!(
        "Accuracy: {:.2}% ({}/{}), API errors: {}, requests sent: {}",
        report.summary.accuracy,
        report.summary.correct_count,
        report.summary.answered_count,
        report.summary.api_error_count,
        client.call_count(),
    );

    let dir = tempfile::tempdir()?;
    let path = mcqbench_report::default_report_path(&report, dir.path());
    mcqbench_report::write_csv_report(&report, &dataset, &path)?;
    println!("Report written to {}", path.display());
    print!("{}", std::fs::read_to_string(&path)?.trim_start_matches('\u{feff}'));

    Ok(())
}
