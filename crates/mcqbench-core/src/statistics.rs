//! Accuracy accounting over an outcome log.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ModelAnswer, Outcome};

/// `correct / answered * 100`, or 0 when nothing was answered.
pub fn accuracy_percent(correct: usize, answered: usize) -> f64 {
    if answered == 0 {
        0.0
    } else {
        correct as f64 / answered as f64 * 100.0
    }
}

/// Counters updated as each outcome is appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTally {
    pub processed: usize,
    /// Outcomes that were not API errors; unparseable replies count here.
    pub answered: usize,
    pub api_errors: usize,
    pub correct: usize,
}

impl RunningTally {
    pub fn record(&mut self, outcome: &Outcome) {
        self.processed += 1;
        if outcome.model_answer == ModelAnswer::ApiError {
            self.api_errors += 1;
        } else {
            self.answered += 1;
        }
        if outcome.is_correct {
            self.correct += 1;
        }
    }

    pub fn accuracy(&self) -> f64 {
        accuracy_percent(self.correct, self.answered)
    }
}

/// Final aggregate statistics for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_records: usize,
    pub answered_count: usize,
    pub api_error_count: usize,
    pub correct_count: usize,
    /// Percentage in `0.0..=100.0`.
    pub accuracy: f64,
    /// Replies that arrived but held no digit 1-4.
    pub unparseable_count: usize,
}

impl RunSummary {
    /// Compute the summary from the full outcome log.
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut tally = RunningTally::default();
        let mut unparseable_count = 0;
        for outcome in outcomes {
            tally.record(outcome);
            if outcome.model_answer == ModelAnswer::Unparseable {
                unparseable_count += 1;
            }
        }
        Self {
            total_records: tally.processed,
            answered_count: tally.answered,
            api_error_count: tally.api_errors,
            correct_count: tally.correct,
            accuracy: tally.accuracy(),
            unparseable_count,
        }
    }

    pub fn incorrect_count(&self) -> usize {
        self.answered_count - self.correct_count
    }

    pub fn band(&self) -> PerformanceBand {
        PerformanceBand::from_accuracy(self.accuracy)
    }
}

/// Qualitative rating shown next to the final accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceBand {
    Excellent,
    Good,
    Fair,
    Average,
    Struggling,
}

impl PerformanceBand {
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a >= 90.0 => PerformanceBand::Excellent,
            a if a >= 80.0 => PerformanceBand::Good,
            a if a >= 70.0 => PerformanceBand::Fair,
            a if a >= 60.0 => PerformanceBand::Average,
            _ => PerformanceBand::Struggling,
        }
    }
}

impl fmt::Display for PerformanceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PerformanceBand::Excellent => "excellent",
            PerformanceBand::Good => "good",
            PerformanceBand::Fair => "fair",
            PerformanceBand::Average => "average",
            PerformanceBand::Struggling => "struggling",
        };
        f.write_str(label)
    }
}
