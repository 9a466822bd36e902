// =============================================================================
// OKX REST API Client — spot candles
// =============================================================================
//
// GET /api/v5/market/candles?instId=BTC-USDT&bar=1H&limit=300
//
//   { "code": "0", "msg": "",
//     "data": [ ["ts","o","h","l","c","vol","volCcy","volCcyQuote","confirm"], ... ] }
//
// `data` is newest-first. Any `code` other than "0" is a provider error.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::http::{self, parse_str_f64};
use crate::market_data::{into_ascending, Candle};
use crate::providers::SeriesProvider;
use crate::types::{Symbol, Timeframe};

const PROVIDER: &str = "okx";
pub const BASE_URL: &str = "https://www.okx.com";

/// OKX caps `/market/candles` at this many rows per request.
const MAX_LIMIT: u32 = 300;

pub struct OkxClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl OkxClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// OKX `bar` notation. OKX has no 8-hour bar; the 12h and daily bars use
    /// the UTC-aligned variants so buckets match Binance's.
    pub fn bar(timeframe: Timeframe) -> Result<&'static str, FetchError> {
        match timeframe {
            Timeframe::M15 => Ok("15m"),
            Timeframe::H1 => Ok("1H"),
            Timeframe::H4 => Ok("4H"),
            Timeframe::H12 => Ok("12Hutc"),
            Timeframe::D1 => Ok("1Dutc"),
            Timeframe::H8 => Err(FetchError::UnsupportedTimeframe(format!("{timeframe} (okx)"))),
        }
    }

    fn parse_candles(body: &serde_json::Value) -> Result<Vec<Candle>, FetchError> {
        let code = body["code"].as_str().unwrap_or_default();
        if code != "0" {
            return Err(FetchError::ProviderError {
                provider: PROVIDER,
                code: code.to_string(),
                message: body["msg"].as_str().unwrap_or_default().to_string(),
            });
        }

        let rows = body["data"]
            .as_array()
            .ok_or_else(|| FetchError::malformed(PROVIDER, "data is not an array"))?;

        let mut candles = Vec::with_capacity(rows.len());
        for row in rows {
            let arr = row
                .as_array()
                .ok_or_else(|| FetchError::malformed(PROVIDER, "candle row is not an array"))?;
            if arr.len() < 5 {
                warn!("skipping malformed okx candle with {} elements", arr.len());
                continue;
            }

            let ts = parse_str_f64(PROVIDER, &arr[0])? as i64;
            let volume = match arr.get(5) {
                Some(v) => Some(parse_str_f64(PROVIDER, v)?),
                None => None,
            };
            candles.push(Candle::new(
                ts,
                parse_str_f64(PROVIDER, &arr[1])?,
                parse_str_f64(PROVIDER, &arr[2])?,
                parse_str_f64(PROVIDER, &arr[3])?,
                parse_str_f64(PROVIDER, &arr[4])?,
                volume,
            ));
        }

        Ok(into_ascending(candles))
    }
}

#[async_trait]
impl SeriesProvider for OkxClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    #[instrument(skip(self, symbol), fields(symbol = %symbol), name = "okx::get_candles")]
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let bar = Self::bar(timeframe)?;
        let limit = limit.min(MAX_LIMIT);
        let url = format!(
            "{}/api/v5/market/candles?instId={}&bar={}&limit={}",
            self.base_url,
            symbol.okx_inst_id(),
            bar,
            limit
        );

        let (status, body) = http::send_json(PROVIDER, self.client.get(&url), self.timeout).await?;
        // OKX wraps most errors in the envelope even on 4xx; check it first.
        let candles = Self::parse_candles(&body)?;
        if !status.is_success() {
            return Err(FetchError::failed(PROVIDER, format!("HTTP {status}")));
        }

        debug!(%timeframe, bar, count = candles.len(), "okx candles fetched");
        Ok(candles)
    }
}

impl std::fmt::Debug for OkxClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_first_payload_is_returned_ascending() {
        let body = serde_json::json!({
            "code": "0",
            "msg": "",
            "data": [
                ["1700007200000", "3.0", "3.2", "2.9", "3.1", "10", "31", "31", "1"],
                ["1700003600000", "2.0", "2.2", "1.9", "2.1", "11", "23", "23", "1"],
                ["1700000000000", "1.0", "1.2", "0.9", "1.1", "12", "13", "13", "1"]
            ]
        });
        let candles = OkxClient::parse_candles(&body).unwrap();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![1.1, 2.1, 3.1]);
        assert_eq!(candles[0].timestamp, 1_700_000_000_000);
        assert_eq!(candles[2].volume, Some(10.0));
    }

    #[test]
    fn non_zero_code_is_provider_error() {
        let body = serde_json::json!({
            "code": "51001",
            "msg": "Instrument ID does not exist",
            "data": []
        });
        let err = OkxClient::parse_candles(&body).unwrap_err();
        assert!(matches!(err, FetchError::ProviderError { ref code, .. } if code == "51001"));
    }

    #[test]
    fn bar_notation() {
        assert_eq!(OkxClient::bar(Timeframe::M15).unwrap(), "15m");
        assert_eq!(OkxClient::bar(Timeframe::H1).unwrap(), "1H");
        assert_eq!(OkxClient::bar(Timeframe::H4).unwrap(), "4H");
        assert_eq!(OkxClient::bar(Timeframe::D1).unwrap(), "1Dutc");
        assert!(matches!(
            OkxClient::bar(Timeframe::H8),
            Err(FetchError::UnsupportedTimeframe(_))
        ));
    }
}
