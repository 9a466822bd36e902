// =============================================================================
// Shared value types used across the indicator bot
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FetchError;

// =============================================================================
// Timeframe
// =============================================================================

/// Candle interval supported by every series provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Timeframe {
    M15,
    H1,
    H4,
    H8,
    H12,
    D1,
}

impl Timeframe {
    /// All supported timeframes, shortest first.
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::D1,
    ];

    /// Canonical notation (`15m`, `1h`, ... `1d`), identical to Binance's.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M15 => "15m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::H8 => "8h",
            Self::H12 => "12h",
            Self::D1 => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == normalised)
            .ok_or_else(|| FetchError::UnsupportedTimeframe(s.trim().to_string()))
    }
}

impl Serialize for Timeframe {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Timeframe {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Symbol
// =============================================================================

/// A base/quote trading pair, e.g. BTC/USDT.
///
/// Each provider spells the pair differently; the accessors below do the
/// translation so callers only ever carry this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into().trim().to_uppercase(),
            quote: quote.into().trim().to_uppercase(),
        }
    }

    /// `BTCUSDT`
    pub fn binance_pair(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// `BTC-USDT`
    pub fn okx_inst_id(&self) -> String {
        format!("{}-{}", self.base, self.quote)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

// =============================================================================
// ReportKind
// =============================================================================

/// Which report the pipeline should build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Rsi,
    Ema,
    Sentiment,
    Premium,
    Comprehensive,
}

impl ReportKind {
    pub fn needs_prices(&self) -> bool {
        matches!(self, Self::Ema | Self::Premium | Self::Comprehensive)
    }

    pub fn needs_sentiment(&self) -> bool {
        matches!(self, Self::Sentiment | Self::Comprehensive)
    }

    pub fn needs_rsi(&self) -> bool {
        matches!(self, Self::Rsi | Self::Comprehensive)
    }

    pub fn needs_ema(&self) -> bool {
        matches!(self, Self::Ema | Self::Comprehensive)
    }

    pub fn needs_premium(&self) -> bool {
        matches!(self, Self::Premium | Self::Comprehensive)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsi => write!(f, "RSI"),
            Self::Ema => write!(f, "EMA"),
            Self::Sentiment => write!(f, "Sentiment"),
            Self::Premium => write!(f, "Premium"),
            Self::Comprehensive => write!(f, "Comprehensive"),
        }
    }
}
