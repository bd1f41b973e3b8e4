//! HTTP plumbing shared by the backends.

use std::time::Duration;

use mcqbench_core::ProviderError;

/// Build a client with the given request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ProviderError::ConnectionFailure(format!("failed to build HTTP client: {e}")))
}

/// Map a transport-level failure (nothing usable came back).
pub(crate) fn send_error(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> ProviderError {
    if e.is_timeout() {
        ProviderError::ConnectionFailure(format!("request timed out after {timeout_secs}s"))
    } else if e.is_connect() {
        ProviderError::ConnectionFailure(format!("{base_url} not reachable: {e}"))
    } else {
        ProviderError::ConnectionFailure(e.to_string())
    }
}

/// Parse a `retry-after` header given in seconds. Huge values saturate.
pub(crate) fn retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

/// Decode a JSON success body, treating a bad shape as a protocol error.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::malformed(format!("failed to parse response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    fn headers(value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("retry-after", HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn retry_after_seconds_to_millis() {
        assert_eq!(retry_after_ms(&headers("7")), Some(7_000));
        assert_eq!(retry_after_ms(&headers(" 3 ")), Some(3_000));
    }

    #[test]
    fn retry_after_overflow_saturates() {
        assert_eq!(retry_after_ms(&headers("18446744073709552")), Some(u64::MAX));
        assert_eq!(
            retry_after_ms(&headers("18446744073709551")),
            Some(18_446_744_073_709_551_000)
        );
    }

    #[test]
    fn retry_after_http_date_is_ignored() {
        assert_eq!(retry_after_ms(&headers("Wed, 21 Oct 2026 07:28:00 GMT")), None);
        assert_eq!(retry_after_ms(&HeaderMap::new()), None);
    }
}
