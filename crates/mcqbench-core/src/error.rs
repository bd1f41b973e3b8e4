//! Error taxonomy for model backends and dataset loading.
//!
//! `ProviderError` lives in core so the retry policy and the evaluation loop
//! can classify failures by kind instead of matching on message strings.

use thiserror::Error;

/// Errors that can occur when sending a prompt to a model backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The backend could not be reached (refused connection, DNS, timeout).
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// The credential was rejected.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// The backend asked us to slow down (HTTP 429 or a provider quota error).
    #[error("rate limited{}", retry_hint(.retry_after_ms))]
    RateLimited { retry_after_ms: Option<u64> },

    /// The backend answered, but not with something we understand.
    ///
    /// `status` is 0 when the HTTP exchange succeeded but the body was malformed.
    #[error("protocol error (HTTP {status}): {message}")]
    ProtocolError { status: u16, message: String },

    /// The local server reported an empty model listing.
    #[error("no model is loaded on the server")]
    NoModelLoaded,
}

fn retry_hint(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(", retry after {ms}ms"),
        None => String::new(),
    }
}

impl ProviderError {
    /// Shorthand for a malformed or unexpected response body.
    pub fn malformed(message: impl Into<String>) -> Self {
        ProviderError::ProtocolError {
            status: 0,
            message: message.into(),
        }
    }

    /// Returns `true` if waiting and sending the same request again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::ConnectionFailure(_)
                | ProviderError::RateLimited { .. }
                | ProviderError::ProtocolError { .. }
        )
    }

    /// Returns `true` for rate-limit errors, which get the long backoff.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// The provider's own retry-after hint in milliseconds, if it sent one.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

/// Errors that abort dataset loading as a whole.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// One or more required columns are absent from the header row.
    #[error("missing required columns {missing:?}; columns present: {present:?}")]
    MissingColumns {
        missing: Vec<String>,
        present: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ProviderError::ConnectionFailure("refused".into()).is_retryable());
        assert!(ProviderError::malformed("bad json").is_retryable());
        assert!(ProviderError::RateLimited {
            retry_after_ms: None
        }
        .is_rate_limit());
        assert!(!ProviderError::AuthFailure("bad key".into()).is_retryable());
        assert!(!ProviderError::NoModelLoaded.is_retryable());
    }

    #[test]
    fn rate_limit_display() {
        let with_hint = ProviderError::RateLimited {
            retry_after_ms: Some(5000),
        };
        assert_eq!(with_hint.to_string(), "rate limited, retry after 5000ms");
        assert_eq!(with_hint.retry_after_ms(), Some(5000));

        let bare = ProviderError::RateLimited {
            retry_after_ms: None,
        };
        assert_eq!(bare.to_string(), "rate limited");
    }

    #[test]
    fn missing_columns_message_lists_both_sides() {
        let err = DatasetError::MissingColumns {
            missing: vec!["Option 4".into()],
            present: vec!["Question".into(), "Option 1".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Option 4"));
        assert!(msg.contains("Question"));
    }
}
