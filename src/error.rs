// =============================================================================
// Error taxonomy
// =============================================================================
//
// Per-data-point errors (`FetchError`) are absorbed by the aggregator and
// rendered as "N/A". Request-level errors (`ReportError`) reach the caller and
// become a visible one-line message. Dispatch errors (`SinkError`) are only
// logged.
// =============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::types::ReportKind;

/// Failure of a single outbound market-data request.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    #[error("{provider} request failed: {cause}")]
    FetchFailed { provider: &'static str, cause: String },

    #[error("{provider} returned error {code}: {message}")]
    ProviderError {
        provider: &'static str,
        code: String,
        message: String,
    },

    #[error("{provider} timed out after {}s", after.as_secs())]
    Timeout {
        provider: &'static str,
        after: Duration,
    },

    #[error("{provider} response malformed: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },
}

impl FetchError {
    pub fn failed(provider: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::FetchFailed {
            provider,
            cause: cause.to_string(),
        }
    }

    pub fn malformed(provider: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider,
            detail: detail.into(),
        }
    }
}

/// Failure of a whole report request.
#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),

    #[error("no data available for the {0} report")]
    NoData(ReportKind),
}

impl From<FetchError> for ReportError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::UnsupportedTimeframe(tf) => Self::UnsupportedTimeframe(tf),
            other => Self::InvalidConfiguration(other.to_string()),
        }
    }
}

impl From<ConfigError> for ReportError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnsupportedTimeframe(tf) => Self::UnsupportedTimeframe(tf),
            ConfigError::Invalid(msg) => Self::InvalidConfiguration(msg),
        }
    }
}

/// Configuration rejected by `AppConfig::validate`.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unsupported timeframe: {0}")]
    UnsupportedTimeframe(String),
}

/// Failure delivering a finished report to the chat endpoint.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    #[error("chat API rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("chat API transport error: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_timeframe_stays_typed_through_report_error() {
        let err: ReportError = FetchError::UnsupportedTimeframe("2h".into()).into();
        assert!(matches!(err, ReportError::UnsupportedTimeframe(ref tf) if tf == "2h"));
    }

    #[test]
    fn timeout_display_mentions_provider_and_duration() {
        let err = FetchError::Timeout {
            provider: "okx",
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "okx timed out after 10s");
    }

    #[test]
    fn config_error_maps_to_invalid_configuration() {
        let err: ReportError = ConfigError::Invalid("no symbols".into()).into();
        assert_eq!(err.to_string(), "invalid configuration: no symbols");
    }
}
