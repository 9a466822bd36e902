// =============================================================================
// Aggregator — one report cycle's concurrent fan-out
// =============================================================================
//
// For every symbol in the request matrix the aggregator gathers, as needed by
// the report kind:
//
//   1. Spot price           one `PriceProvider` call per symbol
//   2. Contract price       one call per symbol when premium is enabled
//   3. RSI                  one candle fetch per (symbol, timeframe), every
//                             configured period computed from that series
//   4. EMA distance         one candle fetch per symbol on the EMA timeframe
//   5. Sentiment            one call per configured sentiment provider
//
// All of these are issued concurrently and each is raced against the fetch
// timeout. A failed or timed-out call becomes `None` for that one data point
// and is logged; nothing is retried. The only per-call error that fails the
// whole request is `UnsupportedTimeframe`.
// =============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::error::{FetchError, ReportError};
use crate::indicators::{current_ema, current_rsi, ema_distance, spot_premium};
use crate::market_data::closes;
use crate::providers::{PriceProvider, SentimentProvider, SeriesProvider};
use crate::report::{
    EmaDistance, PeriodValue, ReportData, RsiRow, SymbolEma, SymbolPremium, SymbolPrice, SymbolRsi,
};
use crate::sentiment::{CompositeSentiment, SentimentReading};
use crate::types::{ReportKind, Symbol, Timeframe};

/// Static symbol × timeframe × period matrix every cycle covers.
#[derive(Debug, Clone)]
pub struct RequestMatrix {
    pub symbols: Vec<Symbol>,
    pub rsi_timeframes: Vec<Timeframe>,
    pub rsi_periods: Vec<usize>,
    pub rsi_candle_limit: u32,
    pub ema_timeframe: Timeframe,
    pub ema_periods: Vec<usize>,
    pub ema_candle_limit: u32,
}

impl RequestMatrix {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            symbols: config.symbols(),
            rsi_timeframes: config.rsi_timeframes.clone(),
            rsi_periods: config.rsi_periods.clone(),
            rsi_candle_limit: config.rsi_candle_limit,
            ema_timeframe: config.ema_timeframe,
            ema_periods: config.ema_periods.clone(),
            ema_candle_limit: config.ema_candle_limit,
        }
    }
}

pub struct Aggregator {
    series: Arc<dyn SeriesProvider>,
    spot: Arc<dyn PriceProvider>,
    contract: Option<Arc<dyn PriceProvider>>,
    sentiment: Vec<Arc<dyn SentimentProvider>>,
    matrix: RequestMatrix,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(
        series: Arc<dyn SeriesProvider>,
        spot: Arc<dyn PriceProvider>,
        contract: Option<Arc<dyn PriceProvider>>,
        sentiment: Vec<Arc<dyn SentimentProvider>>,
        matrix: RequestMatrix,
        timeout: Duration,
    ) -> Self {
        Self {
            series,
            spot,
            contract,
            sentiment,
            matrix,
            timeout,
        }
    }

    pub fn matrix(&self) -> &RequestMatrix {
        &self.matrix
    }

    /// Gather everything `kind` needs. `rsi_timeframes` overrides the matrix
    /// timeframes for the RSI block (used by `/rsi <timeframe>`).
    pub async fn collect(
        &self,
        kind: ReportKind,
        rsi_timeframes: &[Timeframe],
        generated_at: DateTime<FixedOffset>,
    ) -> Result<ReportData, ReportError> {
        let symbols = &self.matrix.symbols;
        let want_spot = kind.needs_prices() || kind.needs_premium();

        let spot_fut = async {
            if want_spot {
                join_all(symbols.iter().map(|s| self.price(self.spot.as_ref(), s))).await
            } else {
                Vec::new()
            }
        };
        let contract_fut = async {
            match &self.contract {
                Some(contract) if kind.needs_premium() => {
                    join_all(symbols.iter().map(|s| self.price(contract.as_ref(), s))).await
                }
                _ => vec![None; symbols.len()],
            }
        };
        let sentiment_fut = async {
            if kind.needs_sentiment() {
                self.sentiment().await
            } else {
                CompositeSentiment::default()
            }
        };
        let rsi_fut = async {
            if kind.needs_rsi() {
                join_all(symbols.iter().map(|s| self.symbol_rsi(s, rsi_timeframes))).await
            } else {
                Vec::new()
            }
        };
        let ema_fut = async {
            if kind.needs_ema() {
                join_all(symbols.iter().map(|s| self.symbol_ema(s))).await
            } else {
                Vec::new()
            }
        };

        let (spot, contract, sentiment, rsi, ema) =
            tokio::join!(spot_fut, contract_fut, sentiment_fut, rsi_fut, ema_fut);

        let mut data = ReportData::new(generated_at);
        data.rsi = rsi.into_iter().collect::<Result<_, _>>()?;
        data.ema = ema.into_iter().collect::<Result<_, _>>()?;
        data.sentiment = sentiment;

        if kind.needs_prices() {
            data.prices = symbols
                .iter()
                .zip(&spot)
                .map(|(symbol, price)| SymbolPrice {
                    symbol: symbol.clone(),
                    price: *price,
                })
                .collect();
        }
        if kind.needs_premium() {
            data.premiums = symbols
                .iter()
                .zip(spot.iter().zip(&contract))
                .map(|(symbol, (spot, contract))| SymbolPremium {
                    symbol: symbol.clone(),
                    spot: *spot,
                    contract: *contract,
                    premium: match (spot, contract) {
                        (Some(s), Some(c)) => spot_premium(*s, *c),
                        _ => None,
                    },
                })
                .collect();
        }

        debug!(%kind, symbols = symbols.len(), "aggregation settled");
        Ok(data)
    }

    // -------------------------------------------------------------------------
    // Per-data-point fetches
    // -------------------------------------------------------------------------

    async fn price(&self, provider: &dyn PriceProvider, symbol: &Symbol) -> Option<f64> {
        let outcome = timed(provider.name(), self.timeout, provider.fetch_price(symbol)).await;
        absorb(outcome, provider.name(), symbol, "price")
    }

    async fn close_series(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Option<Vec<f64>>, FetchError> {
        let provider = self.series.name();
        let outcome = timed(
            provider,
            self.timeout,
            self.series.fetch_candles(symbol, timeframe, limit),
        )
        .await;

        match outcome {
            Err(e @ FetchError::UnsupportedTimeframe(_)) => Err(e),
            other => Ok(absorb(other, provider, symbol, timeframe.as_str()).map(|c| closes(&c))),
        }
    }

    async fn symbol_rsi(
        &self,
        symbol: &Symbol,
        timeframes: &[Timeframe],
    ) -> Result<SymbolRsi, FetchError> {
        let limit = self.matrix.rsi_candle_limit;
        let series =
            join_all(timeframes.iter().map(|tf| self.close_series(symbol, *tf, limit))).await;

        let mut rows = Vec::with_capacity(timeframes.len());
        for (timeframe, closes) in timeframes.iter().zip(series) {
            let closes = closes?;
            let values = self
                .matrix
                .rsi_periods
                .iter()
                .map(|&period| PeriodValue {
                    period,
                    value: closes.as_deref().and_then(|c| current_rsi(c, period)),
                })
                .collect();
            rows.push(RsiRow {
                timeframe: *timeframe,
                values,
            });
        }

        Ok(SymbolRsi {
            symbol: symbol.clone(),
            rows,
        })
    }

    async fn symbol_ema(&self, symbol: &Symbol) -> Result<SymbolEma, FetchError> {
        let timeframe = self.matrix.ema_timeframe;
        let closes = self
            .close_series(symbol, timeframe, self.matrix.ema_candle_limit)
            .await?;
        let last_close = closes.as_ref().and_then(|c| c.last().copied());

        let distances = self
            .matrix
            .ema_periods
            .iter()
            .map(|&period| {
                let ema = closes.as_deref().and_then(|c| current_ema(c, period));
                let distance = match (last_close, ema) {
                    (Some(price), Some(ema)) => ema_distance(price, ema),
                    _ => None,
                };
                EmaDistance {
                    period,
                    ema,
                    distance,
                }
            })
            .collect();

        Ok(SymbolEma {
            symbol: symbol.clone(),
            timeframe,
            last_close,
            distances,
        })
    }

    async fn sentiment(&self) -> CompositeSentiment {
        let outcomes: Vec<(String, Result<SentimentReading, FetchError>)> =
            join_all(self.sentiment.iter().map(|provider| async move {
                let outcome =
                    timed(provider.name(), self.timeout, provider.fetch_reading()).await;
                if let Err(e) = &outcome {
                    warn!(provider = provider.name(), error = %e, "sentiment reading unavailable");
                }
                (provider.name().to_string(), outcome)
            }))
            .await;

        CompositeSentiment::combine(outcomes)
    }
}

/// Race `fut` against `after`; expiry becomes `FetchError::Timeout`.
pub async fn timed<T, F>(provider: &'static str, after: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(outcome) => outcome,
        Err(_) => Err(FetchError::Timeout { provider, after }),
    }
}

/// Turn a per-data-point failure into `None`, logging it once.
fn absorb<T>(
    outcome: Result<T, FetchError>,
    provider: &'static str,
    symbol: &Symbol,
    what: &str,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(provider, symbol = %symbol, data = what, error = %e, "data point unavailable");
            None
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::testing::{aggregator, FakeSeries, FixedPrice, SlowPrice};

    fn now() -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }

    fn healthy() -> Aggregator {
        aggregator(FakeSeries::rising(50), Arc::new(FixedPrice(100.0)), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn comprehensive_fills_every_section() {
        let agg = healthy();
        let tfs = agg.matrix().rsi_timeframes.clone();
        let data = agg.collect(ReportKind::Comprehensive, &tfs, now()).await.unwrap();

        assert_eq!(data.prices.len(), 2);
        assert!(data.prices.iter().all(|p| p.price == Some(100.0)));

        // Strictly rising series: RSI 100 for every slot.
        assert_eq!(data.rsi.len(), 2);
        for row in data.rsi.iter().flat_map(|s| &s.rows) {
            assert!(row.values.iter().all(|v| v.value == Some(100.0)));
        }

        // EMA(5) defined and below the last close; EMA(200) lacks history.
        let ema = &data.ema[0];
        assert_eq!(ema.last_close, Some(149.0));
        assert!(ema.distances[0].distance.is_some_and(|d| d > 0.0));
        assert_eq!(ema.distances[1].ema, None);
        assert_eq!(ema.distances[1].distance, None);

        assert_eq!(data.premiums[0].premium, Some(5.0));
        assert!(!data.has_no_data());
    }

    #[tokio::test]
    async fn one_sentiment_provider_failing_keeps_the_other() {
        let agg = healthy();
        let data = agg.collect(ReportKind::Sentiment, &[], now()).await.unwrap();

        assert_eq!(data.sentiment.readings.len(), 1);
        assert_eq!(data.sentiment.readings[0].value, 15);
        assert_eq!(data.sentiment.unavailable, vec!["CoinMarketCap".to_string()]);
        assert!(data.sentiment.mean.is_none());
        assert!(data.prices.is_empty());
        assert!(data.rsi.is_empty());
    }

    #[tokio::test]
    async fn failed_timeframe_becomes_none_without_aborting() {
        let series = FakeSeries {
            failing: Some(Timeframe::H4),
            unsupported: None,
            len: 50,
        };
        let agg = aggregator(series, Arc::new(FixedPrice(100.0)), Duration::from_secs(1));
        let data = agg
            .collect(ReportKind::Rsi, &[Timeframe::H1, Timeframe::H4], now())
            .await
            .unwrap();

        let btc = &data.rsi[0];
        assert!(btc.rows[0].values.iter().all(|v| v.value.is_some()));
        assert!(btc.rows[1].values.iter().all(|v| v.value.is_none()));
        assert_eq!(btc.rows[1].values.len(), 2);
    }

    #[tokio::test]
    async fn slow_price_times_out_to_none() {
        let agg = aggregator(
            FakeSeries::rising(50),
            Arc::new(SlowPrice),
            Duration::from_millis(50),
        );
        let started = std::time::Instant::now();
        let data = agg.collect(ReportKind::Premium, &[], now()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(data.prices.iter().all(|p| p.price.is_none()));
        assert_eq!(data.premiums[0].contract, Some(105.0));
        assert_eq!(data.premiums[0].premium, None);
    }

    #[tokio::test]
    async fn unsupported_timeframe_fails_the_request() {
        let series = FakeSeries {
            failing: None,
            unsupported: Some(Timeframe::H8),
            len: 50,
        };
        let agg = aggregator(series, Arc::new(FixedPrice(100.0)), Duration::from_secs(1));
        let err = agg.collect(ReportKind::Rsi, &[Timeframe::H8], now()).await.unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedTimeframe(_)));
    }

    #[tokio::test]
    async fn timed_maps_expiry_to_timeout() {
        let outcome: Result<(), FetchError> = timed("okx", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(outcome, Err(FetchError::Timeout { provider: "okx", .. })));
    }
}
