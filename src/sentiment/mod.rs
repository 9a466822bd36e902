// =============================================================================
// Market Sentiment Module
// =============================================================================
//
// Independent fear/greed providers each yield one 0–100 reading. Readings are
// combined into a `CompositeSentiment`; a failed provider is recorded by name
// and never aborts the others.
//
// Two threshold tables apply:
//
//   Classification (labels, suggestion text)   MoodBand (emoji only)
//     0–20   Extreme Fear                        0–24   😱
//    21–40   Fear                               25–49   😟
//    41–60   Neutral                            50–74   😊
//    61–80   Greed                              75–100  🤑
//    81–100  Extreme Greed

pub mod alternative_me;

pub use alternative_me::AlternativeMeClient;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
}

impl Classification {
    /// Label for a 0–100 value. Values above 100 count as Extreme Greed.
    pub fn from_value(value: u8) -> Self {
        match value {
            0..=20 => Self::ExtremeFear,
            21..=40 => Self::Fear,
            41..=60 => Self::Neutral,
            61..=80 => Self::Greed,
            _ => Self::ExtremeGreed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ExtremeFear => "Extreme Fear",
            Self::Fear => "Fear",
            Self::Neutral => "Neutral",
            Self::Greed => "Greed",
            Self::ExtremeGreed => "Extreme Greed",
        }
    }

    /// Reading guidance shown under the sentiment section.
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::ExtremeFear => {
                "Extreme fear has historically been a buying opportunity. Still check the fundamentals."
            }
            Self::Fear => {
                "Fear dominates. Consider building positions gradually with controlled size."
            }
            Self::Neutral => "Sentiment is balanced. No strong contrarian signal either way.",
            Self::Greed => "Greed is building. Stay cautious and consider taking some profit.",
            Self::ExtremeGreed => {
                "Extreme greed has historically been a good time to sell. Consider reducing exposure."
            }
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// MoodBand (emoji table)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodBand {
    Panic,
    Worried,
    Content,
    Euphoric,
}

impl MoodBand {
    pub fn from_value(value: u8) -> Self {
        match value {
            0..=24 => Self::Panic,
            25..=49 => Self::Worried,
            50..=74 => Self::Content,
            _ => Self::Euphoric,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Panic => "😱",
            Self::Worried => "😟",
            Self::Content => "😊",
            Self::Euphoric => "🤑",
        }
    }
}

// =============================================================================
// Readings
// =============================================================================

/// One provider's fear/greed reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
    /// 0–100.
    pub value: u8,
    /// Always derived from `value`, never copied from the provider.
    pub classification: Classification,
    /// Display name of the provider, e.g. "Alternative.me".
    pub source: String,
    /// Provider's own timestamp for the reading, seconds since the epoch.
    pub timestamp: i64,
}

impl SentimentReading {
    pub fn new(value: u8, source: impl Into<String>, timestamp: i64) -> Self {
        Self {
            value,
            classification: Classification::from_value(value),
            source: source.into(),
            timestamp,
        }
    }
}

/// Arithmetic mean across providers, classified with the same table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanReading {
    pub value: u8,
    pub classification: Classification,
}

/// Every provider's outcome for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeSentiment {
    pub readings: Vec<SentimentReading>,
    /// Display names of providers that failed this cycle.
    pub unavailable: Vec<String>,
    /// Present only when every provider succeeded and there are at least two.
    pub mean: Option<MeanReading>,
}

impl CompositeSentiment {
    /// Combine per-provider outcomes, preserving provider order.
    pub fn combine(outcomes: Vec<(String, Result<SentimentReading, FetchError>)>) -> Self {
        let mut readings = Vec::new();
        let mut unavailable = Vec::new();

        for (source, outcome) in outcomes {
            match outcome {
                Ok(reading) => readings.push(reading),
                Err(_) => unavailable.push(source),
            }
        }

        let mean = if unavailable.is_empty() && readings.len() >= 2 {
            let sum: u32 = readings.iter().map(|r| r.value as u32).sum();
            let value = (sum as f64 / readings.len() as f64).round().clamp(0.0, 100.0) as u8;
            Some(MeanReading {
                value,
                classification: Classification::from_value(value),
            })
        } else {
            None
        };

        Self {
            readings,
            unavailable,
            mean,
        }
    }

    /// Value that drives the suggestion text: the mean when present, else the
    /// first available reading.
    pub fn headline_value(&self) -> Option<u8> {
        self.mean
            .as_ref()
            .map(|m| m.value)
            .or_else(|| self.readings.first().map(|r| r.value))
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Parse a provider's value field (string or number) into 0–100.
pub(crate) fn parse_index_value(
    provider: &'static str,
    raw: &serde_json::Value,
) -> Result<u8, FetchError> {
    let value = if let Some(s) = raw.as_str() {
        s.trim()
            .parse::<f64>()
            .map_err(|e| FetchError::malformed(provider, format!("value '{s}': {e}")))?
    } else if let Some(n) = raw.as_f64() {
        n
    } else {
        return Err(FetchError::malformed(provider, format!("value field missing: {raw}")));
    };

    if !(0.0..=100.0).contains(&value) {
        return Err(FetchError::malformed(provider, format!("value {value} outside 0-100")));
    }
    Ok(value.round() as u8)
}
