//! The evaluation loop.
//!
//! Walks a dataset strictly in order with at most one request in flight:
//! build the prompt, call the backend through the retry policy, parse the
//! reply, append the outcome. A failed question becomes an `API_ERROR`
//! outcome; it never stops the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::answer::parse_answer;
use crate::error::ProviderError;
use crate::model::{Dataset, ModelAnswer, Outcome, QuestionRecord};
use crate::prompt::build_prompt;
use crate::report::EvalReport;
use crate::retry::{FinalFailure, RetryPolicy};
use crate::statistics::{RunSummary, RunningTally};
use crate::traits::ModelClient;

/// Settings for the evaluation loop.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorConfig {
    /// Courtesy pause between questions. Never applied after the last one.
    pub request_delay: Duration,
}

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Completed,
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_question_start(&self, index: usize, total: usize, record: &QuestionRecord);
    fn on_retry(&self, index: usize, attempt: u32, error: &ProviderError, delay: Duration);
    fn on_api_error(&self, index: usize, failure: &FinalFailure);
    fn on_outcome(&self, outcome: &Outcome, tally: &RunningTally);
    fn on_run_complete(&self, report: &EvalReport);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_question_start(&self, _: usize, _: usize, _: &QuestionRecord) {}
    fn on_retry(&self, _: usize, _: u32, _: &ProviderError, _: Duration) {}
    fn on_api_error(&self, _: usize, _: &FinalFailure) {}
    fn on_outcome(&self, _: &Outcome, _: &RunningTally) {}
    fn on_run_complete(&self, _: &EvalReport) {}
}

#[derive(Debug, Default)]
struct AbortState {
    flag: AtomicBool,
    notify: Notify,
}

/// Operator-abort flag, checked between questions. Also cuts short the
/// pause between questions.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AbortState>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.flag.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_aborted(&self) -> bool {
        self.0.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub async fn aborted(&self) {
        loop {
            // Register before checking the flag so a concurrent abort is not missed.
            let notified = self.0.notify.notified();
            if self.is_aborted() {
                return;
            }
            notified.await;
        }
    }
}

/// Runs one dataset against one model backend.
pub struct Evaluator {
    client: Arc<dyn ModelClient>,
    retry: RetryPolicy,
    config: EvaluatorConfig,
    state: RunState,
}

impl Evaluator {
    pub fn new(client: Arc<dyn ModelClient>, retry: RetryPolicy, config: EvaluatorConfig) -> Self {
        Self {
            client,
            retry,
            config,
            state: RunState::Pending,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Evaluate every record in order and return the report.
    ///
    /// If `abort` is raised, the loop stops before the next question and the
    /// outcomes gathered so far are returned with `aborted` set.
    pub async fn run(
        &mut self,
        dataset: &Dataset,
        progress: &dyn ProgressReporter,
        abort: &AbortHandle,
    ) -> Result<EvalReport> {
        anyhow::ensure!(
            self.state == RunState::Pending,
            "evaluator has already been run"
        );
        self.state = RunState::Running;

        let start = Instant::now();
        let total = dataset.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut tally = RunningTally::default();
        let mut aborted = false;

        tracing::info!(
            backend = self.client.name(),
            model = self.client.model(),
            questions = total,
            "starting evaluation"
        );

        for (index, record) in dataset.records.iter().enumerate() {
            if index > 0 && !self.config.request_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.request_delay) => {}
                    _ = abort.aborted() => {}
                }
            }
            if abort.is_aborted() {
                tracing::warn!(processed = index, total, "run aborted by operator");
                aborted = true;
                break;
            }

            progress.on_question_start(index, total, record);
            let outcome = self.evaluate_one(index, record, progress).await;
            tally.record(&outcome);
            progress.on_outcome(&outcome, &tally);
            outcomes.push(outcome);
        }

        let summary = RunSummary::from_outcomes(&outcomes);
        tracing::info!(
            answered = summary.answered_count,
            correct = summary.correct_count,
            api_errors = summary.api_error_count,
            accuracy = summary.accuracy,
            "evaluation finished"
        );

        let report = EvalReport {
            id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            backend: self.client.name().to_string(),
            model: self.client.model().to_string(),
            dataset_source: dataset.source.clone(),
            dataset_size: total,
            has_ground_truth: dataset.has_ground_truth(),
            outcomes,
            summary,
            aborted,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        self.state = RunState::Completed;
        progress.on_run_complete(&report);
        Ok(report)
    }

    async fn evaluate_one(
        &self,
        index: usize,
        record: &QuestionRecord,
        progress: &dyn ProgressReporter,
    ) -> Outcome {
        let prompt = build_prompt(record);
        let result = self
            .retry
            .call_with_observer(self.client.as_ref(), &prompt, |attempt, error, delay| {
                progress.on_retry(index, attempt, error, delay)
            })
            .await;

        match result {
            Ok(completion) => {
                let answer = parse_answer(&completion.text);
                tracing::debug!(index, %answer, attempts = completion.attempts, "parsed reply");
                Outcome::new(
                    index,
                    record,
                    answer,
                    Some(completion.text),
                    completion.attempts,
                )
            }
            Err(failure) => {
                tracing::error!(index, "question failed: {failure}");
                progress.on_api_error(index, &failure);
                Outcome::new(index, record, ModelAnswer::ApiError, None, failure.attempts)
            }
        }
    }
}
