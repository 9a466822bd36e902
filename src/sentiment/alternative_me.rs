// =============================================================================
// Alternative.me Crypto Fear & Greed Index
// =============================================================================
//
// GET {base}/fng/?limit=1&format=json
//
//   { "data": [ { "value": "40", "value_classification": "Fear",
//                 "timestamp": "1551157200" } ],
//     "metadata": { "error": null } }
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::http;
use crate::providers::SentimentProvider;
use crate::sentiment::{parse_index_value, SentimentReading};

const PROVIDER: &str = "alternative.me";
const SOURCE_NAME: &str = "Alternative.me";

/// Fetches the latest index value from Alternative.me (no API key needed).
pub struct AlternativeMeClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl AlternativeMeClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Decode a `/fng/` response body.
    fn parse_response(body: &serde_json::Value) -> Result<SentimentReading, FetchError> {
        if let Some(err) = body["metadata"]["error"].as_str() {
            return Err(FetchError::ProviderError {
                provider: PROVIDER,
                code: "metadata.error".to_string(),
                message: err.to_string(),
            });
        }

        let entry = body["data"]
            .as_array()
            .and_then(|arr| arr.first())
            .ok_or_else(|| FetchError::malformed(PROVIDER, "data array missing or empty"))?;

        let value = parse_index_value(PROVIDER, &entry["value"])?;
        let timestamp = entry["timestamp"]
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| entry["timestamp"].as_i64())
            .unwrap_or_default();

        Ok(SentimentReading::new(value, SOURCE_NAME, timestamp))
    }
}

#[async_trait]
impl SentimentProvider for AlternativeMeClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self), name = "alternative_me::fetch_reading")]
    async fn fetch_reading(&self) -> Result<SentimentReading, FetchError> {
        let url = format!("{}/fng/?limit=1&format=json", self.base_url);
        let (status, body) = http::send_json(PROVIDER, self.client.get(&url), self.timeout).await?;

        if !status.is_success() {
            return Err(FetchError::failed(PROVIDER, format!("HTTP {status}: {body}")));
        }

        let reading = Self::parse_response(&body)?;
        debug!(
            value = reading.value,
            classification = %reading.classification,
            "fear/greed fetched"
        );
        Ok(reading)
    }
}
