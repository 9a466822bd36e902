use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLC(V) candle, normalised from any provider's kline format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, milliseconds since the UNIX epoch.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Not every upstream reports volume (OKX index candles do not).
    pub volume: Option<f64>,
}

impl Candle {
    pub fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

// ---------------------------------------------------------------------------
// Normalisation helpers
// ---------------------------------------------------------------------------

/// Sort candles oldest-first and drop duplicate buckets.
///
/// Providers differ in the order they return data (OKX is newest-first), so
/// every fetcher funnels its output through here before returning. When the
/// same timestamp appears twice the later entry wins.
pub fn into_ascending(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.timestamp);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.timestamp == candle.timestamp => *last = candle,
            _ => out.push(candle),
        }
    }
    out
}

/// Close prices in the order given (callers pass ascending candles).
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64, close: f64) -> Candle {
        Candle::new(ts, close, close, close, close, None)
    }

    #[test]
    fn descending_input_is_reordered() {
        let input = vec![candle(3, 30.0), candle(2, 20.0), candle(1, 10.0)];
        let out = into_ascending(input);
        let ts: Vec<i64> = out.iter().map(|c| c.timestamp).collect();
        assert_eq!(ts, vec![1, 2, 3]);
        assert_eq!(closes(&out), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn duplicate_timestamps_collapse_to_last_seen() {
        let input = vec![candle(1, 10.0), candle(2, 20.0), candle(2, 21.0)];
        let out = into_ascending(input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].close, 21.0);
    }

    #[test]
    fn empty_series_stays_empty() {
        assert!(into_ascending(Vec::new()).is_empty());
    }
}
