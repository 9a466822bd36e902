// =============================================================================
// Provider seams
// =============================================================================
//
// The aggregator only talks to these traits. Concrete HTTP clients (Binance,
// OKX, CoinMarketCap, Alternative.me) implement them; tests substitute fakes.
// =============================================================================

use async_trait::async_trait;

use crate::error::FetchError;
use crate::market_data::Candle;
use crate::sentiment::SentimentReading;
use crate::types::{Symbol, Timeframe};

/// Source of OHLC(V) candles.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Short provider name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Up to `limit` candles, ascending by timestamp.
    async fn fetch_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError>;
}

/// Source of a single 0–100 market sentiment reading.
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_reading(&self) -> Result<SentimentReading, FetchError>;
}

/// Source of a last-traded price (spot or contract, depending on the impl).
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_price(&self, symbol: &Symbol) -> Result<f64, FetchError>;
}
