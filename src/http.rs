// =============================================================================
// Shared HTTP plumbing for the market-data clients
// =============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::FetchError;

/// Build the shared `reqwest::Client` used by every provider.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("crypto-indicator-bot/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Send `request` and decode the body as JSON.
///
/// Transport failures become `FetchFailed` (or `Timeout` when reqwest's own
/// deadline fired); a body that is not JSON becomes `MalformedResponse`. The
/// status is returned alongside the body so each provider can decode its own
/// error envelope before deciding how to treat a non-2xx status.
pub async fn send_json(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<(StatusCode, serde_json::Value), FetchError> {
    let resp = request.send().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout {
                provider,
                after: timeout,
            }
        } else {
            FetchError::failed(provider, e)
        }
    })?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| FetchError::failed(provider, format!("reading body: {e}")))?;

    let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        if status.is_success() {
            FetchError::malformed(provider, format!("invalid JSON: {e}"))
        } else {
            FetchError::failed(provider, format!("HTTP {status}: {}", truncate(&text, 200)))
        }
    })?;

    debug!(provider, %status, "response received");
    Ok((status, body))
}

/// Parse a JSON value that may be either a string or a number into `f64`.
pub fn parse_str_f64(provider: &'static str, val: &serde_json::Value) -> Result<f64, FetchError> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .map_err(|e| FetchError::malformed(provider, format!("'{s}' is not a number: {e}")))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        Err(FetchError::malformed(provider, format!("expected string or number, got: {val}")))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_str_f64_accepts_both_encodings() {
        assert_eq!(parse_str_f64("t", &serde_json::json!("1.5")).unwrap(), 1.5);
        assert_eq!(parse_str_f64("t", &serde_json::json!(2.25)).unwrap(), 2.25);
        assert!(parse_str_f64("t", &serde_json::json!("x")).is_err());
        assert!(parse_str_f64("t", &serde_json::json!([1])).is_err());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
