// =============================================================================
// Report data and rendering
// =============================================================================
//
// `ReportData` is what one aggregation cycle produced; every indicator slot is
// an `Option` where `None` means "insufficient data or fetch failure". The
// formatter in `format` turns it into chat text without any I/O.
// =============================================================================

pub mod format;

pub use format::{failure_message, render};

use chrono::{DateTime, FixedOffset};

use crate::sentiment::CompositeSentiment;
use crate::types::{Symbol, Timeframe};

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPrice {
    pub symbol: Symbol,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodValue {
    pub period: usize,
    pub value: Option<f64>,
}

/// RSI values of every configured period for one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiRow {
    pub timeframe: Timeframe,
    pub values: Vec<PeriodValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRsi {
    pub symbol: Symbol,
    pub rows: Vec<RsiRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmaDistance {
    pub period: usize,
    pub ema: Option<f64>,
    /// Signed percentage of `last_close` over `ema`.
    pub distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEma {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub last_close: Option<f64>,
    pub distances: Vec<EmaDistance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolPremium {
    pub symbol: Symbol,
    pub spot: Option<f64>,
    pub contract: Option<f64>,
    pub premium: Option<f64>,
}

/// Everything one report cycle gathered. Sections the report kind does not
/// use stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    pub generated_at: DateTime<FixedOffset>,
    pub prices: Vec<SymbolPrice>,
    pub sentiment: CompositeSentiment,
    pub rsi: Vec<SymbolRsi>,
    pub ema: Vec<SymbolEma>,
    pub premiums: Vec<SymbolPremium>,
}

impl ReportData {
    pub fn new(generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            generated_at,
            prices: Vec::new(),
            sentiment: CompositeSentiment::default(),
            rsi: Vec::new(),
            ema: Vec::new(),
            premiums: Vec::new(),
        }
    }

    /// True when not a single data point was obtained.
    pub fn has_no_data(&self) -> bool {
        let prices = self.prices.iter().all(|p| p.price.is_none());
        let sentiment = self.sentiment.is_empty();
        let rsi = self
            .rsi
            .iter()
            .flat_map(|s| &s.rows)
            .flat_map(|r| &r.values)
            .all(|v| v.value.is_none());
        let ema = self
            .ema
            .iter()
            .all(|s| s.last_close.is_none() && s.distances.iter().all(|d| d.ema.is_none()));
        let premiums = self
            .premiums
            .iter()
            .all(|p| p.spot.is_none() && p.contract.is_none());
        prices && sentiment && rsi && ema && premiums
    }
}
