// In-memory providers and sink shared by the async tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::aggregator::{Aggregator, RequestMatrix};
use crate::error::{FetchError, SinkError};
use crate::market_data::Candle;
use crate::providers::{PriceProvider, SentimentProvider, SeriesProvider};
use crate::sentiment::SentimentReading;
use crate::service::ReportService;
use crate::telegram::MessageSink;
use crate::types::{Symbol, Timeframe};

/// Serves a strictly rising series, except for the configured failures.
pub struct FakeSeries {
    pub failing: Option<Timeframe>,
    pub unsupported: Option<Timeframe>,
    pub len: usize,
}

impl FakeSeries {
    pub fn rising(len: usize) -> Self {
        Self {
            failing: None,
            unsupported: None,
            len,
        }
    }
}

#[async_trait]
impl SeriesProvider for FakeSeries {
    fn name(&self) -> &'static str {
        "fake-series"
    }

    async fn fetch_candles(
        &self,
        _symbol: &Symbol,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, FetchError> {
        if self.unsupported == Some(timeframe) {
            return Err(FetchError::UnsupportedTimeframe(timeframe.to_string()));
        }
        if self.failing == Some(timeframe) {
            return Err(FetchError::failed("fake-series", "connection reset"));
        }
        let n = self.len.min(limit as usize);
        Ok((0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Candle::new(i as i64, close, close, close, close, None)
            })
            .collect())
    }
}

pub struct FixedPrice(pub f64);

#[async_trait]
impl PriceProvider for FixedPrice {
    fn name(&self) -> &'static str {
        "fixed-price"
    }

    async fn fetch_price(&self, _symbol: &Symbol) -> Result<f64, FetchError> {
        Ok(self.0)
    }
}

pub struct SlowPrice;

#[async_trait]
impl PriceProvider for SlowPrice {
    fn name(&self) -> &'static str {
        "slow-price"
    }

    async fn fetch_price(&self, _symbol: &Symbol) -> Result<f64, FetchError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1.0)
    }
}

pub struct FailingPrice;

#[async_trait]
impl PriceProvider for FailingPrice {
    fn name(&self) -> &'static str {
        "failing-price"
    }

    async fn fetch_price(&self, _symbol: &Symbol) -> Result<f64, FetchError> {
        Err(FetchError::failed("failing-price", "HTTP 503"))
    }
}

/// `value: None` fails with a provider error.
pub struct FakeSentiment {
    pub name: &'static str,
    pub value: Option<u8>,
}

#[async_trait]
impl SentimentProvider for FakeSentiment {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_reading(&self) -> Result<SentimentReading, FetchError> {
        match self.value {
            Some(v) => Ok(SentimentReading::new(v, self.name, 0)),
            None => Err(FetchError::ProviderError {
                provider: "fake",
                code: "1002".into(),
                message: "API key missing".into(),
            }),
        }
    }
}

#[derive(Default)]
pub struct CollectorSink {
    pub messages: Mutex<Vec<String>>,
    pub reject: bool,
}

impl CollectorSink {
    pub fn rejecting() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl MessageSink for CollectorSink {
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        if self.reject {
            return Err(SinkError::Rejected {
                status: 400,
                description: "Bad Request".into(),
            });
        }
        self.messages.lock().push(text.to_string());
        Ok(())
    }
}

pub fn matrix() -> RequestMatrix {
    RequestMatrix {
        symbols: vec![Symbol::new("BTC", "USDT"), Symbol::new("ETH", "USDT")],
        rsi_timeframes: vec![Timeframe::H1, Timeframe::H4],
        rsi_periods: vec![6, 14],
        rsi_candle_limit: 50,
        ema_timeframe: Timeframe::H1,
        ema_periods: vec![5, 200],
        ema_candle_limit: 50,
    }
}

/// Spot 100, contract 105, Alternative.me at 15 and CoinMarketCap failing.
pub fn aggregator(
    series: FakeSeries,
    spot: Arc<dyn PriceProvider>,
    timeout: Duration,
) -> Aggregator {
    Aggregator::new(
        Arc::new(series),
        spot,
        Some(Arc::new(FixedPrice(105.0))),
        vec![
            Arc::new(FakeSentiment {
                name: "Alternative.me",
                value: Some(15),
            }),
            Arc::new(FakeSentiment {
                name: "CoinMarketCap",
                value: None,
            }),
        ],
        matrix(),
        timeout,
    )
}

pub fn healthy_service() -> ReportService {
    ReportService::new(
        aggregator(FakeSeries::rising(50), Arc::new(FixedPrice(100.0)), Duration::from_secs(1)),
        chrono::FixedOffset::east_opt(8 * 3600).unwrap(),
    )
}
