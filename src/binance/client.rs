// =============================================================================
// Binance REST API Client — public market data
// =============================================================================
//
// Only unsigned endpoints are used: klines and the last-price ticker. The same
// client type serves the spot API and the USDⓈ-M futures API; the market
// decides the base URL and path prefix.
//
// Binance reports errors as `{"code": -1121, "msg": "Invalid symbol."}` with a
// 4xx status; those become `FetchError::ProviderError`.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::FetchError;
use crate::http::{self, parse_str_f64};
use crate::market_data::{into_ascending, Candle};
use crate::providers::{PriceProvider, SeriesProvider};
use crate::types::{Symbol, Timeframe};

pub const SPOT_BASE_URL: &str = "https://api.binance.com";
pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// Which Binance API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinanceMarket {
    Spot,
    UsdFutures,
}

impl BinanceMarket {
    fn path_prefix(&self) -> &'static str {
        match self {
            Self::Spot => "/api/v3",
            Self::UsdFutures => "/fapi/v1",
        }
    }

    fn provider(&self) -> &'static str {
        match self {
            Self::Spot => "binance",
            Self::UsdFutures => "binance-futures",
        }
    }
}

/// Binance public market-data client.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
    market: BinanceMarket,
    timeout: Duration,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        market: BinanceMarket,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(base_url = %base_url, market = ?market, "BinanceClient initialised");
        Self {
            client,
            base_url,
            market,
            timeout,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.base_url, self.market.path_prefix(), endpoint)
    }

    /// GET + JSON decode, mapping Binance's `{code, msg}` envelope.
    async fn get(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let provider = self.market.provider();
        let (status, body) = http::send_json(provider, self.client.get(url), self.timeout).await?;

        if let Some(err) = Self::error_envelope(provider, &body) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(FetchError::failed(provider, format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }

    fn error_envelope(provider: &'static str, body: &serde_json::Value) -> Option<FetchError> {
        let code = body.get("code")?.as_i64()?;
        let msg = body.get("msg").and_then(|m| m.as_str()).unwrap_or_default();
        Some(FetchError::ProviderError {
            provider,
            code: code.to_string(),
            message: msg.to_string(),
        })
    }

    // -------------------------------------------------------------------------
    // Response decoding
    // -------------------------------------------------------------------------

    /// Decode Binance's array-of-arrays kline format.
    ///
    /// Array indices:
    ///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
    ///   [6] closeTime, [7] quoteAssetVolume, ...
    fn parse_klines(
        provider: &'static str,
        body: &serde_json::Value,
    ) -> Result<Vec<Candle>, FetchError> {
        let raw = body
            .as_array()
            .ok_or_else(|| FetchError::malformed(provider, "klines response is not an array"))?;

        let mut candles = Vec::with_capacity(raw.len());
        for entry in raw {
            let arr = entry
                .as_array()
                .ok_or_else(|| FetchError::malformed(provider, "kline entry is not an array"))?;

            if arr.len() < 6 {
                warn!("skipping malformed kline entry with {} elements", arr.len());
                continue;
            }

            let open_time = arr[0]
                .as_i64()
                .ok_or_else(|| {
                    FetchError::malformed(provider, "kline open time is not an integer")
                })?;
            candles.push(Candle::new(
                open_time,
                parse_str_f64(provider, &arr[1])?,
                parse_str_f64(provider, &arr[2])?,
                parse_str_f64(provider, &arr[3])?,
                parse_str_f64(provider, &arr[4])?,
                Some(parse_str_f64(provider, &arr[5])?),
            ));
        }

        Ok(into_ascending(candles))
    }

    fn parse_ticker_price(
        provider: &'static str,
        body: &serde_json::Value,
    ) -> Result<f64, FetchError> {
        let price = parse_str_f64(provider, &body["price"])?;
        if price <= 0.0 || !price.is_finite() {
            return Err(FetchError::malformed(provider, format!("non-positive price {price}")));
        }
        Ok(price)
    }
}

// -------------------------------------------------------------------------
// Provider impls
// -------------------------------------------------------------------------

#[async_trait]
impl SeriesProvider for BinanceClient {
    fn name(&self) -> &'static str {
        self.market.provider()
    }

    /// GET {prefix}/klines. Binance uses the canonical timeframe notation.
    #[instrument(skip(self, symbol), fields(symbol = %symbol), name = "binance::get_klines")]
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        let url = format!(
            "{}?symbol={}&interval={}&limit={}",
            self.url("klines"),
            symbol.binance_pair(),
            timeframe.as_str(),
            limit
        );

        let body = self.get(&url).await?;
        let mut candles = Self::parse_klines(self.market.provider(), &body)?;

        // Keep the newest `limit` if the upstream ever over-delivers.
        let excess = candles.len().saturating_sub(limit as usize);
        candles.drain(..excess);

        debug!(%timeframe, count = candles.len(), "klines fetched");
        Ok(candles)
    }
}

#[async_trait]
impl PriceProvider for BinanceClient {
    fn name(&self) -> &'static str {
        self.market.provider()
    }

    /// GET {prefix}/ticker/price
    #[instrument(skip(self, symbol), fields(symbol = %symbol), name = "binance::get_ticker_price")]
    async fn fetch_price(&self, symbol: &Symbol) -> Result<f64, FetchError> {
        let url = format!("{}?symbol={}", self.url("ticker/price"), symbol.binance_pair());
        let body = self.get(&url).await?;
        let price = Self::parse_ticker_price(self.market.provider(), &body)?;
        debug!(price, "ticker price fetched");
        Ok(price)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("market", &self.market)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kline(open_time: i64, close: &str) -> serde_json::Value {
        serde_json::json!([
            open_time, "1.0", "2.0", "0.5", close, "100.0",
            open_time + 59_999, "150.0", 12, "50.0", "75.0", "0"
        ])
    }

    #[test]
    fn klines_are_parsed_and_sorted_ascending() {
        let body = serde_json::json!([kline(2000, "11.5"), kline(1000, "10.5")]);
        let candles = BinanceClient::parse_klines("binance", &body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].timestamp, 1000);
        assert_eq!(candles[0].close, 10.5);
        assert_eq!(candles[1].close, 11.5);
        assert_eq!(candles[1].volume, Some(100.0));
    }

    #[test]
    fn short_kline_entries_are_skipped() {
        let body = serde_json::json!([[1000, "1.0"], kline(2000, "3.0")]);
        let candles = BinanceClient::parse_klines("binance", &body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 3.0);
    }

    #[test]
    fn non_array_klines_are_malformed() {
        let body = serde_json::json!({ "unexpected": true });
        assert!(matches!(
            BinanceClient::parse_klines("binance", &body),
            Err(FetchError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn error_envelope_maps_to_provider_error() {
        let body = serde_json::json!({ "code": -1121, "msg": "Invalid symbol." });
        let err = BinanceClient::error_envelope("binance", &body).unwrap();
        match err {
            FetchError::ProviderError { code, message, .. } => {
                assert_eq!(code, "-1121");
                assert_eq!(message, "Invalid symbol.");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(BinanceClient::error_envelope("binance", &serde_json::json!([])).is_none());
    }

    #[test]
    fn ticker_price_parsing() {
        let body = serde_json::json!({ "symbol": "BTCUSDT", "price": "64123.45000000" });
        assert_eq!(BinanceClient::parse_ticker_price("binance", &body).unwrap(), 64123.45);
        let zero = serde_json::json!({ "symbol": "BTCUSDT", "price": "0" });
        assert!(BinanceClient::parse_ticker_price("binance", &zero).is_err());
    }

    #[test]
    fn urls_follow_market_prefix() {
        let client = reqwest::Client::new();
        let timeout = Duration::from_secs(1);
        let spot = BinanceClient::new(client.clone(), SPOT_BASE_URL, BinanceMarket::Spot, timeout);
        let fut = BinanceClient::new(client, FUTURES_BASE_URL, BinanceMarket::UsdFutures, timeout);
        assert_eq!(spot.url("klines"), "https://api.binance.com/api/v3/klines");
        assert_eq!(fut.url("ticker/price"), "https://fapi.binance.com/fapi/v1/ticker/price");
    }
}
