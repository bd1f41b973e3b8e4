//! Bounded retry with tiered backoff around a single `ModelClient` call.
//!
//! Rate-limit errors wait for the long backoff (or the provider's hint, if
//! longer); connection and protocol errors wait for the short one; auth
//! errors fail at once. Waits block the caller: there is only ever one
//! request in flight.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ProviderError;
use crate::traits::ModelClient;

/// Retry settings, as read from the `[retry]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per prompt, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Wait before retrying a connection or protocol error.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Wait before retrying a rate-limit error.
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
    /// Ceiling on a provider's `retry-after` hint.
    #[serde(default = "default_max_rate_limit_backoff_ms")]
    pub max_rate_limit_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    2_000
}
fn default_rate_limit_backoff_ms() -> u64 {
    10_000
}
fn default_max_rate_limit_backoff_ms() -> u64 {
    120_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            max_rate_limit_backoff_ms: default_max_rate_limit_backoff_ms(),
        }
    }
}

/// A reply obtained within the attempt budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub attempts: u32,
}

/// Every attempt failed, or a non-retryable error cut the budget short.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("gave up after {attempts} attempt(s): {error}")]
pub struct FinalFailure {
    /// The last error seen.
    pub error: ProviderError,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    rate_limit_backoff: Duration,
    max_rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
            rate_limit_backoff: Duration::from_millis(config.rate_limit_backoff_ms),
            max_rate_limit_backoff: Duration::from_millis(config.max_rate_limit_backoff_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// How long to wait before retrying after `error`.
    ///
    /// A rate-limit hint can lengthen the wait up to `max_rate_limit_backoff`
    /// but never shorten it below `rate_limit_backoff`.
    pub fn delay_for(&self, error: &ProviderError) -> Duration {
        if error.is_rate_limit() {
            let hint = error
                .retry_after_ms()
                .map(Duration::from_millis)
                .unwrap_or_default()
                .min(self.max_rate_limit_backoff);
            self.rate_limit_backoff.max(hint)
        } else {
            self.backoff
        }
    }

    pub async fn call_with_retry(
        &self,
        client: &dyn ModelClient,
        prompt: &str,
    ) -> Result<Completion, FinalFailure> {
        self.call_with_observer(client, prompt, |_, _, _| {}).await
    }

    /// Like [`call_with_retry`](Self::call_with_retry), invoking `on_retry`
    /// with (failed attempt number, error, upcoming wait) before each wait.
    pub async fn call_with_observer<F>(
        &self,
        client: &dyn ModelClient,
        prompt: &str,
        mut on_retry: F,
    ) -> Result<Completion, FinalFailure>
    where
        F: FnMut(u32, &ProviderError, Duration),
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match client.complete(prompt).await {
                Ok(text) => {
                    return Ok(Completion {
                        text,
                        attempts: attempt,
                    })
                }
                Err(error) => {
                    if !error.is_retryable() || attempt >= self.max_attempts {
                        return Err(FinalFailure {
                            error,
                            attempts: attempt,
                        });
                    }
                    let delay = self.delay_for(&error);
                    tracing::warn!(
                        backend = client.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "request failed, retrying: {error}"
                    );
                    on_retry(attempt, &error, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    struct Scripted {
        replies: Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn model(&self) -> &str {
            "scripted-model"
        }
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::ConnectionFailure("script exhausted".into())))
        }
    }

    fn transient() -> ProviderError {
        ProviderError::ConnectionFailure("connection reset".into())
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_waits() {
        let client = Scripted::new(vec![Err(transient()), Err(transient()), Ok("2".into())]);
        let policy = RetryPolicy::default();

        let start = Instant::now();
        let mut waits = Vec::new();
        let completion = policy
            .call_with_observer(&client, "prompt", |_, _, delay| waits.push(delay))
            .await
            .unwrap();

        assert_eq!(completion.text, "2");
        assert_eq!(completion.attempts, 3);
        assert_eq!(waits, vec![Duration::from_secs(2); 2]);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_failure_is_not_retried() {
        let client = Scripted::new(vec![
            Err(ProviderError::AuthFailure("invalid key".into())),
            Ok("1".into()),
        ]);
        let policy = RetryPolicy::default();

        let mut waits = 0;
        let failure = policy
            .call_with_observer(&client, "prompt", |_, _, _| waits += 1)
            .await
            .unwrap_err();

        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.error, ProviderError::AuthFailure(_)));
        assert_eq!(waits, 0);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_carries_last_error() {
        let client = Scripted::new(vec![
            Err(transient()),
            Err(ProviderError::malformed("not json")),
            Err(ProviderError::ProtocolError {
                status: 503,
                message: "unavailable".into(),
            }),
        ]);
        let policy = RetryPolicy::default();

        let failure = policy.call_with_retry(&client, "prompt").await.unwrap_err();
        assert_eq!(failure.attempts, 3);
        assert_eq!(
            failure.error,
            ProviderError::ProtocolError {
                status: 503,
                message: "unavailable".into(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_uses_long_backoff() {
        let client = Scripted::new(vec![
            Err(ProviderError::RateLimited {
                retry_after_ms: None,
            }),
            Ok("4".into()),
        ]);
        let policy = RetryPolicy::default();

        let start = Instant::now();
        let completion = policy.call_with_retry(&client, "prompt").await.unwrap();
        assert_eq!(completion.attempts, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn rate_limit_hint_extends_backoff() {
        let policy = RetryPolicy::default();
        let long_hint = ProviderError::RateLimited {
            retry_after_ms: Some(30_000),
        };
        let short_hint = ProviderError::RateLimited {
            retry_after_ms: Some(1_000),
        };
        assert_eq!(policy.delay_for(&long_hint), Duration::from_secs(30));
        assert_eq!(policy.delay_for(&short_hint), Duration::from_secs(10));
        assert_eq!(policy.delay_for(&transient()), Duration::from_secs(2));
    }

    #[test]
    fn rate_limit_hint_is_capped() {
        let policy = RetryPolicy::default();
        let day = ProviderError::RateLimited {
            retry_after_ms: Some(86_400_000),
        };
        let absurd = ProviderError::RateLimited {
            retry_after_ms: Some(u64::MAX),
        };
        assert_eq!(policy.delay_for(&day), Duration::from_secs(120));
        assert_eq!(policy.delay_for(&absurd), Duration::from_secs(120));

        // A ceiling below the base wait leaves the base wait in force.
        let policy = RetryPolicy::new(&RetryConfig {
            max_rate_limit_backoff_ms: 1_000,
            ..RetryConfig::default()
        });
        assert_eq!(policy.delay_for(&day), Duration::from_secs(10));
    }

    #[test]
    fn max_rate_limit_backoff_defaults_when_omitted() {
        let config: RetryConfig =
            serde_json::from_str(r#"{"max_attempts": 2, "rate_limit_backoff_ms": 5000}"#).unwrap();
        assert_eq!(config.max_rate_limit_backoff_ms, 120_000);
        assert_eq!(config.backoff_ms, 2_000);
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        });
        assert_eq!(policy.max_attempts(), 1);
    }
}
