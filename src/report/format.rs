// =============================================================================
// Report Formatter — ReportData -> chat text
// =============================================================================
//
// Pure: no clock, no I/O. Sections appear in a fixed order (price, sentiment,
// RSI, EMA, premium) and only when the report kind includes them. Every slot
// is printed even when its value is missing, as the literal `N/A`, so the
// layout is identical from one cycle to the next.
//
// Markers:
//   RSI            > 70 🔴 overbought   < 30 🟢 oversold   else 🟡
//   EMA distance   > 0  🟢 bullish      < 0  🔴 bearish    = 0  🟡
//
// Output uses Telegram's legacy Markdown (`*bold*`, `_italic_`).
// =============================================================================

use std::fmt::Write as _;

use crate::error::ReportError;
use crate::report::{ReportData, SymbolEma, SymbolRsi};
use crate::sentiment::{Classification, MoodBand};
use crate::types::{ReportKind, Timeframe};

pub const NOT_AVAILABLE: &str = "N/A";

const RSI_OVERBOUGHT: f64 = 70.0;
const RSI_OVERSOLD: f64 = 30.0;
const TREND_DISTANCE_PCT: f64 = 5.0;

/// Render the full report for `kind`.
pub fn render(kind: ReportKind, data: &ReportData) -> String {
    let mut sections = vec![header(kind, data)];

    if kind.needs_prices() {
        sections.push(price_section(data));
    }
    if kind.needs_sentiment() {
        sections.push(sentiment_section(data));
    }
    if kind.needs_rsi() {
        sections.push(rsi_section(data));
    }
    if kind.needs_ema() {
        sections.push(ema_section(data));
    }
    if kind.needs_premium() {
        sections.push(premium_section(data));
    }
    if kind == ReportKind::Comprehensive {
        sections.push(trend_section(data));
        sections.push("_For reference only. This is not investment advice._".to_string());
    }

    sections.join("\n\n")
}

/// One-line message sent instead of a report when the request itself failed.
///
/// The error text can carry user input (`/rsi 4h_`), so it is escaped for
/// legacy Markdown before it reaches the chat.
pub fn failure_message(err: &ReportError) -> String {
    match err {
        ReportError::UnsupportedTimeframe(tf) => {
            let supported: Vec<&str> = Timeframe::ALL.iter().map(|t| t.as_str()).collect();
            format!(
                "⚠️ Report generation failed: unsupported timeframe {} (supported: {})",
                escape_markdown(tf),
                supported.join(", ")
            )
        }
        other => format!(
            "⚠️ Report generation failed: {}",
            escape_markdown(&other.to_string())
        ),
    }
}

/// Backslash-escape the entity characters of Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// -----------------------------------------------------------------------------
// Markers and numbers
// -----------------------------------------------------------------------------

pub fn rsi_marker(value: f64) -> &'static str {
    if value > RSI_OVERBOUGHT {
        "🔴"
    } else if value < RSI_OVERSOLD {
        "🟢"
    } else {
        "🟡"
    }
}

pub fn ema_marker(distance: f64) -> &'static str {
    if distance > 0.0 {
        "🟢"
    } else if distance < 0.0 {
        "🔴"
    } else {
        "🟡"
    }
}

fn num(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.decimals$}"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn signed_pct(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:+.decimals$}%"),
        _ => NOT_AVAILABLE.to_string(),
    }
}

// -----------------------------------------------------------------------------
// Sections
// -----------------------------------------------------------------------------

fn header(kind: ReportKind, data: &ReportData) -> String {
    let title = match kind {
        ReportKind::Rsi => "📈 *RSI Report*",
        ReportKind::Ema => "📉 *EMA Report*",
        ReportKind::Sentiment => "🧠 *Market Sentiment*",
        ReportKind::Premium => "💹 *Premium Report*",
        ReportKind::Comprehensive => "📊 *Comprehensive Market Analysis*",
    };
    format!(
        "{title}\n🕒 {}",
        data.generated_at.format("%Y-%m-%d %H:%M (UTC%:z)")
    )
}

fn price_section(data: &ReportData) -> String {
    let mut out = String::from("💰 *Prices*");
    for p in &data.prices {
        let _ = write!(out, "\n{}: {}", p.symbol, num(p.price, 2));
    }
    out
}

fn sentiment_section(data: &ReportData) -> String {
    let s = &data.sentiment;
    let headline = s.headline_value();
    let emoji = headline.map(|v| MoodBand::from_value(v).emoji()).unwrap_or("❓");

    let mut out = format!("{emoji} *Fear & Greed Index*");
    for r in &s.readings {
        let _ = write!(out, "\n{}: {} ({})", r.source, r.value, r.classification);
    }
    for name in &s.unavailable {
        let _ = write!(out, "\n{name}: {NOT_AVAILABLE}");
    }
    match &s.mean {
        Some(mean) => {
            let _ = write!(out, "\nAverage: {} ({})", mean.value, mean.classification);
        }
        None => {
            let _ = write!(out, "\nAverage: {NOT_AVAILABLE}");
        }
    }

    match headline {
        Some(v) => {
            let _ = write!(out, "\n💡 {}", Classification::from_value(v).suggestion());
        }
        None => out.push_str("\n💡 No sentiment data this cycle."),
    }

    out.push_str("\nRanges: 0-20 Extreme Fear | 21-40 Fear | 41-60 Neutral");
    out.push_str(" | 61-80 Greed | 81-100 Extreme Greed");
    let sources: Vec<&str> = s.readings.iter().map(|r| r.source.as_str()).collect();
    if sources.is_empty() {
        let _ = write!(out, "\nSources: {NOT_AVAILABLE}");
    } else {
        let _ = write!(out, "\nSources: {}", sources.join(", "));
    }
    out
}

fn rsi_section(data: &ReportData) -> String {
    let mut out = String::from("📈 *RSI*");
    for symbol in &data.rsi {
        let _ = write!(out, "\n*{}*", symbol.symbol);
        for row in &symbol.rows {
            let _ = write!(out, "\n{}:", row.timeframe);
            for pv in &row.values {
                match pv.value {
                    Some(v) => {
                        let _ = write!(out, " RSI{} {} {v:.2}", pv.period, rsi_marker(v));
                    }
                    None => {
                        let _ = write!(out, " RSI{} {NOT_AVAILABLE}", pv.period);
                    }
                }
            }
        }
    }
    out.push_str("\nLegend: 🔴 >70 overbought | 🟢 <30 oversold | 🟡 neutral");
    out
}

fn ema_section(data: &ReportData) -> String {
    let timeframe = data.ema.first().map(|e| e.timeframe.as_str()).unwrap_or("");
    let mut out = format!("📉 *EMA {timeframe}*");
    for symbol in &data.ema {
        let _ = write!(out, "\n*{}* close {}", symbol.symbol, num(symbol.last_close, 2));
        for d in &symbol.distances {
            match (d.ema, d.distance) {
                (Some(ema), Some(dist)) => {
                    let _ = write!(
                        out,
                        "\nEMA{}: {ema:.2} {} {}",
                        d.period,
                        ema_marker(dist),
                        signed_pct(Some(dist), 2)
                    );
                }
                (Some(ema), None) => {
                    let _ = write!(out, "\nEMA{}: {ema:.2} ({NOT_AVAILABLE})", d.period);
                }
                _ => {
                    let _ = write!(out, "\nEMA{}: {NOT_AVAILABLE}", d.period);
                }
            }
        }
    }
    out.push_str("\nLegend: 🟢 above EMA | 🔴 below EMA | 🟡 at EMA");
    out
}

fn premium_section(data: &ReportData) -> String {
    let mut out = String::from("💹 *Spot Premium*");
    for p in &data.premiums {
        let _ = write!(
            out,
            "\n{}: spot {} | contract {} | premium {}",
            p.symbol,
            num(p.spot, 2),
            num(p.contract, 2),
            signed_pct(p.premium, 3)
        );
    }
    out.push_str("\nPositive premium: contract trades above spot.");
    out
}

// -----------------------------------------------------------------------------
// Trend analysis (comprehensive report only)
// -----------------------------------------------------------------------------

/// Qualitative read of one symbol from RSI on 1h/4h and the shortest EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendCall {
    Overbought,
    Oversold,
    StrongUptrend,
    WeakDowntrend,
    Ranging,
    InsufficientData,
}

impl TrendCall {
    fn describe(&self) -> &'static str {
        match self {
            Self::Overbought => "🔴 Overbought on 1h and 4h, watch for a pullback",
            Self::Oversold => "🟢 Oversold on 1h and 4h, a rebound is possible",
            Self::StrongUptrend => "🟢 Strong uptrend, price well above its EMA",
            Self::WeakDowntrend => "🔴 Weak, price well below its EMA",
            Self::Ranging => "🟡 Ranging, no clear direction",
            Self::InsufficientData => "❓ Insufficient data",
        }
    }
}

/// Rules apply in order: overbought, oversold, strong uptrend, weak downtrend,
/// ranging. A call is made only once every earlier rule is known not to fire;
/// a missing input that could still change the outcome yields
/// `InsufficientData`, and `Ranging` needs all three inputs.
pub fn trend_call(rsi_1h: Option<f64>, rsi_4h: Option<f64>, distance: Option<f64>) -> TrendCall {
    match both(rsi_1h, rsi_4h, |v| v > RSI_OVERBOUGHT) {
        Some(true) => return TrendCall::Overbought,
        Some(false) => {}
        None => return TrendCall::InsufficientData,
    }
    match both(rsi_1h, rsi_4h, |v| v < RSI_OVERSOLD) {
        Some(true) => return TrendCall::Oversold,
        Some(false) => {}
        None => return TrendCall::InsufficientData,
    }

    let Some(d) = distance else {
        return TrendCall::InsufficientData;
    };
    if d > TREND_DISTANCE_PCT {
        TrendCall::StrongUptrend
    } else if d < -TREND_DISTANCE_PCT {
        TrendCall::WeakDowntrend
    } else if rsi_1h.is_some() && rsi_4h.is_some() {
        TrendCall::Ranging
    } else {
        TrendCall::InsufficientData
    }
}

/// Whether `cond` holds for both readings: `Some(false)` as soon as one known
/// reading fails it, `None` when a missing reading leaves it open.
fn both(a: Option<f64>, b: Option<f64>, cond: impl Fn(f64) -> bool) -> Option<bool> {
    match (a.map(&cond), b.map(&cond)) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// Longest-period RSI on `timeframe`.
fn long_rsi(symbol: &SymbolRsi, timeframe: Timeframe) -> Option<f64> {
    symbol
        .rows
        .iter()
        .find(|r| r.timeframe == timeframe)
        .and_then(|r| r.values.iter().max_by_key(|v| v.period))
        .and_then(|v| v.value)
}

/// Distance to the shortest-period EMA.
fn short_ema_distance(symbol: &SymbolEma) -> Option<f64> {
    symbol
        .distances
        .iter()
        .min_by_key(|d| d.period)
        .and_then(|d| d.distance)
}

fn trend_section(data: &ReportData) -> String {
    let mut out = String::from("🧭 *Trend Analysis*");
    for symbol in &data.rsi {
        let distance = data
            .ema
            .iter()
            .find(|e| e.symbol == symbol.symbol)
            .and_then(short_ema_distance);
        let call = trend_call(
            long_rsi(symbol, Timeframe::H1),
            long_rsi(symbol, Timeframe::H4),
            distance,
        );
        let _ = write!(out, "\n{}: {}", symbol.symbol, call.describe());
    }
    out
}
