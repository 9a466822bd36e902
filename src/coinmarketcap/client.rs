// =============================================================================
// CoinMarketCap Pro API Client
// =============================================================================
//
// Two endpoints, both authenticated with the `X-CMC_PRO_API_KEY` header:
//
//   GET /v1/cryptocurrency/quotes/latest?symbol=BTC
//     { "status": { "error_code": 0, ... },
//       "data": { "BTC": { "quote": { "USD": { "price": 64000.1 } } } } }
//
//   GET /v3/fear-and-greed/latest
//     { "status": { "error_code": "0", ... },
//       "data": { "value": 52, "value_classification": "Neutral",
//                 "update_time": "2024-09-19T02:54:58.470Z" } }
//
// `data.<SYMBOL>` is an object on some plans and an array of matches on
// others; both shapes are accepted. A non-zero `status.error_code` (number or
// string) is a provider error.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use tracing::{debug, instrument};

use crate::error::FetchError;
use crate::http::{self, parse_str_f64};
use crate::providers::{PriceProvider, SentimentProvider};
use crate::sentiment::{parse_index_value, SentimentReading};
use crate::types::Symbol;

const PROVIDER: &str = "coinmarketcap";
const SOURCE_NAME: &str = "CoinMarketCap";
pub const BASE_URL: &str = "https://pro-api.coinmarketcap.com";

pub struct CoinMarketCapClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl CoinMarketCapClient {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    async fn get(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let request = self
            .client
            .get(url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .header("Accept", "application/json");
        let (status, body) = http::send_json(PROVIDER, request, self.timeout).await?;

        if let Some(err) = Self::status_error(&body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(FetchError::failed(PROVIDER, format!("HTTP {status}")));
        }
        Ok(body)
    }

    fn status_error(body: &serde_json::Value) -> Option<FetchError> {
        let status = body.get("status")?;
        let code = match &status["error_code"] {
            serde_json::Value::Number(n) => n.as_i64().unwrap_or(-1),
            serde_json::Value::String(s) => s.trim().parse::<i64>().unwrap_or(-1),
            _ => return None,
        };
        if code == 0 {
            return None;
        }
        Some(FetchError::ProviderError {
            provider: PROVIDER,
            code: code.to_string(),
            message: status["error_message"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn parse_quote(body: &serde_json::Value, base: &str) -> Result<f64, FetchError> {
        let entry = &body["data"][base];
        let entry = match entry {
            serde_json::Value::Array(items) => items
                .first()
                .ok_or_else(|| FetchError::malformed(PROVIDER, format!("no quote for {base}")))?,
            serde_json::Value::Object(_) => entry,
            _ => return Err(FetchError::malformed(PROVIDER, format!("no quote for {base}"))),
        };

        let price = parse_str_f64(PROVIDER, &entry["quote"]["USD"]["price"])?;
        if price <= 0.0 || !price.is_finite() {
            return Err(FetchError::malformed(PROVIDER, format!("non-positive price {price}")));
        }
        Ok(price)
    }

    fn parse_fear_greed(body: &serde_json::Value) -> Result<SentimentReading, FetchError> {
        let data = &body["data"];
        if !data.is_object() {
            return Err(FetchError::malformed(PROVIDER, "data object missing"));
        }
        let value = parse_index_value(PROVIDER, &data["value"])?;
        let timestamp = data["update_time"]
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp())
            .unwrap_or_default();
        Ok(SentimentReading::new(value, SOURCE_NAME, timestamp))
    }
}

#[async_trait]
impl PriceProvider for CoinMarketCapClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    /// USD quote. The quote asset of `symbol` is ignored; CMC prices in fiat.
    #[instrument(skip(self, symbol), fields(symbol = %symbol), name = "coinmarketcap::get_quote")]
    async fn fetch_price(&self, symbol: &Symbol) -> Result<f64, FetchError> {
        let url = format!(
            "{}/v1/cryptocurrency/quotes/latest?symbol={}",
            self.base_url, symbol.base
        );
        let body = self.get(&url).await?;
        let price = Self::parse_quote(&body, &symbol.base)?;
        debug!(price, "quote fetched");
        Ok(price)
    }
}

#[async_trait]
impl SentimentProvider for CoinMarketCapClient {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    #[instrument(skip(self), name = "coinmarketcap::get_fear_greed")]
    async fn fetch_reading(&self) -> Result<SentimentReading, FetchError> {
        let url = format!("{}/v3/fear-and-greed/latest", self.base_url);
        let body = self.get(&url).await?;
        let reading = Self::parse_fear_greed(&body)?;
        debug!(
            value = reading.value,
            classification = %reading.classification,
            "fear/greed fetched"
        );
        Ok(reading)
    }
}

impl std::fmt::Debug for CoinMarketCapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinMarketCapClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::Classification;

    #[test]
    fn quote_accepts_object_and_array_shapes() {
        let object = serde_json::json!({
            "status": { "error_code": 0 },
            "data": { "BTC": { "symbol": "BTC", "quote": { "USD": { "price": 64000.5 } } } }
        });
        let array = serde_json::json!({
            "status": { "error_code": 0 },
            "data": { "BTC": [ { "symbol": "BTC", "quote": { "USD": { "price": 63999.5 } } } ] }
        });
        assert_eq!(CoinMarketCapClient::parse_quote(&object, "BTC").unwrap(), 64000.5);
        assert_eq!(CoinMarketCapClient::parse_quote(&array, "BTC").unwrap(), 63999.5);
    }

    #[test]
    fn missing_symbol_is_malformed() {
        let body = serde_json::json!({ "status": { "error_code": 0 }, "data": {} });
        assert!(matches!(
            CoinMarketCapClient::parse_quote(&body, "ETH"),
            Err(FetchError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn status_error_code_accepts_string_and_number() {
        let numeric = serde_json::json!({
            "status": { "error_code": 1002, "error_message": "API key missing." }
        });
        let string = serde_json::json!({
            "status": { "error_code": "1008", "error_message": "rate limit" }
        });
        let ok = serde_json::json!({ "status": { "error_code": "0" } });

        match CoinMarketCapClient::status_error(&numeric) {
            Some(FetchError::ProviderError { code, message, .. }) => {
                assert_eq!(code, "1002");
                assert_eq!(message, "API key missing.");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(CoinMarketCapClient::status_error(&string).is_some());
        assert!(CoinMarketCapClient::status_error(&ok).is_none());
    }

    #[test]
    fn fear_greed_payload() {
        let body = serde_json::json!({
            "status": { "error_code": "0" },
            "data": {
                "value": 82,
                "value_classification": "Greed",
                "update_time": "2024-09-19T02:54:58.470Z"
            }
        });
        let reading = CoinMarketCapClient::parse_fear_greed(&body).unwrap();
        assert_eq!(reading.value, 82);
        assert_eq!(reading.classification, Classification::ExtremeGreed);
        assert_eq!(reading.source, "CoinMarketCap");
        assert_eq!(reading.timestamp, 1_726_714_498);
    }

    #[test]
    fn debug_redacts_key() {
        let client = CoinMarketCapClient::new(
            reqwest::Client::new(),
            BASE_URL,
            "super-secret",
            Duration::from_secs(1),
        );
        let printed = format!("{client:?}");
        assert!(!printed.contains("super-secret"));
    }
}
