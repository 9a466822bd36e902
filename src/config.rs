// =============================================================================
// Application Configuration — typed settings built once at startup
// =============================================================================
//
// Every tunable of the indicator bot lives here: the request matrix (symbols,
// timeframes, periods), which upstream provider serves each data kind, the
// schedule, and the chat/API credentials.
//
// Layering: defaults -> optional JSON file -> environment overrides. All
// fields carry a serde default so a partial (or empty) JSON file loads. After
// `main` finishes building the config nothing reads the environment again.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::types::{ReportKind, Symbol, Timeframe};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_symbols() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string()]
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_rsi_timeframes() -> Vec<Timeframe> {
    vec![Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1]
}

fn default_rsi_periods() -> Vec<usize> {
    vec![6, 14]
}

fn default_rsi_candle_limit() -> u32 {
    200
}

fn default_ema_timeframe() -> Timeframe {
    Timeframe::H1
}

fn default_ema_periods() -> Vec<usize> {
    vec![50, 100, 200]
}

fn default_ema_candle_limit() -> u32 {
    300
}

fn default_sentiment_sources() -> Vec<SentimentSource> {
    vec![SentimentSource::AlternativeMe, SentimentSource::CoinMarketCap]
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_utc_offset_hours() -> i32 {
    8
}

fn default_schedule() -> Vec<ScheduledJob> {
    vec![
        ScheduledJob::new(ReportKind::Rsi, 15 * 60),
        ScheduledJob::new(ReportKind::Ema, 60 * 60),
        ScheduledJob::new(ReportKind::Sentiment, 60 * 60),
        ScheduledJob::new(ReportKind::Comprehensive, 60 * 60),
    ]
}

fn default_activation_path() -> String {
    "bot_state.json".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_cmc_base_url() -> String {
    crate::coinmarketcap::client::BASE_URL.to_string()
}

fn default_binance_spot_url() -> String {
    crate::binance::client::SPOT_BASE_URL.to_string()
}

fn default_binance_futures_url() -> String {
    crate::binance::client::FUTURES_BASE_URL.to_string()
}

fn default_okx_url() -> String {
    crate::okx::client::BASE_URL.to_string()
}

fn default_alternative_me_url() -> String {
    "https://api.alternative.me".to_string()
}

// =============================================================================
// Source selection
// =============================================================================

/// Provider of the kline series behind RSI and EMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSource {
    #[default]
    Binance,
    Okx,
}

impl SeriesSource {
    /// OKX publishes no 8h bar.
    pub fn supports(&self, timeframe: Timeframe) -> bool {
        match self {
            Self::Binance => true,
            Self::Okx => crate::okx::OkxClient::bar(timeframe).is_ok(),
        }
    }
}

/// Provider of the spot price shown in the price block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    #[default]
    Binance,
    #[serde(rename = "coinmarketcap")]
    CoinMarketCap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentSource {
    AlternativeMe,
    #[serde(rename = "coinmarketcap")]
    CoinMarketCap,
}

// =============================================================================
// Nested sections
// =============================================================================

/// One recurring report push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub kind: ReportKind,
    pub every_secs: u64,
}

impl ScheduledJob {
    pub fn new(kind: ReportKind, every_secs: u64) -> Self {
        Self { kind, every_secs }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.every_secs)
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,

    /// The single chat that receives pushes and may issue commands.
    #[serde(default)]
    pub chat_id: String,

    /// Expected `X-Telegram-Bot-Api-Secret-Token` header on webhook calls.
    #[serde(default)]
    pub secret_token: Option<String>,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            secret_token: None,
            api_base: default_telegram_api_base(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("secret_token", &self.secret_token.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct CoinMarketCapConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_cmc_base_url")]
    pub base_url: String,
}

impl Default for CoinMarketCapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_cmc_base_url(),
        }
    }
}

impl std::fmt::Debug for CoinMarketCapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinMarketCapConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Base URLs of the keyless providers; overridable for proxies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_binance_spot_url")]
    pub binance_spot: String,
    #[serde(default = "default_binance_futures_url")]
    pub binance_futures: String,
    #[serde(default = "default_okx_url")]
    pub okx: String,
    #[serde(default = "default_alternative_me_url")]
    pub alternative_me: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            binance_spot: default_binance_spot_url(),
            binance_futures: default_binance_futures_url(),
            okx: default_okx_url(),
            alternative_me: default_alternative_me_url(),
        }
    }
}

// =============================================================================
// AppConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // --- Request matrix ------------------------------------------------------

    /// Base assets covered by every report.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    #[serde(default = "default_rsi_timeframes")]
    pub rsi_timeframes: Vec<Timeframe>,

    /// Short period first, long period last.
    #[serde(default = "default_rsi_periods")]
    pub rsi_periods: Vec<usize>,

    #[serde(default = "default_rsi_candle_limit")]
    pub rsi_candle_limit: u32,

    #[serde(default = "default_ema_timeframe")]
    pub ema_timeframe: Timeframe,

    #[serde(default = "default_ema_periods")]
    pub ema_periods: Vec<usize>,

    #[serde(default = "default_ema_candle_limit")]
    pub ema_candle_limit: u32,

    // --- Sources -------------------------------------------------------------

    #[serde(default)]
    pub series_source: SeriesSource,

    #[serde(default)]
    pub price_source: PriceSource,

    #[serde(default = "default_sentiment_sources")]
    pub sentiment_sources: Vec<SentimentSource>,

    /// Fetch the USDⓈ-M futures price and render the premium block.
    #[serde(default = "default_true")]
    pub premium_enabled: bool,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    #[serde(default)]
    pub endpoints: Endpoints,

    // --- Output & scheduling -------------------------------------------------

    /// Fixed UTC offset for report timestamps.
    #[serde(default = "default_utc_offset_hours")]
    pub report_utc_offset_hours: i32,

    #[serde(default = "default_schedule")]
    pub schedule: Vec<ScheduledJob>,

    // --- Collaborators -------------------------------------------------------

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub coinmarketcap: CoinMarketCapConfig,

    #[serde(default = "default_activation_path")]
    pub activation_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            quote_asset: default_quote_asset(),
            rsi_timeframes: default_rsi_timeframes(),
            rsi_periods: default_rsi_periods(),
            rsi_candle_limit: default_rsi_candle_limit(),
            ema_timeframe: default_ema_timeframe(),
            ema_periods: default_ema_periods(),
            ema_candle_limit: default_ema_candle_limit(),
            series_source: SeriesSource::default(),
            price_source: PriceSource::default(),
            sentiment_sources: default_sentiment_sources(),
            premium_enabled: true,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            endpoints: Endpoints::default(),
            report_utc_offset_hours: default_utc_offset_hours(),
            schedule: default_schedule(),
            telegram: TelegramConfig::default(),
            coinmarketcap: CoinMarketCapConfig::default(),
            activation_path: default_activation_path(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            series_source = ?config.series_source,
            "config loaded"
        );

        Ok(config)
    }

    /// Like `load`, but a missing file falls back to defaults with a warning.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup. Empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = get("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = chat_id.trim().to_string();
        }
        if let Some(secret) = get("TELEGRAM_SECRET_TOKEN") {
            self.telegram.secret_token = Some(secret);
        }
        if let Some(key) = get("COINMARKETCAP_API_KEY") {
            self.coinmarketcap.api_key = Some(key);
        }
        if let Some(list) = get("BOT_SYMBOLS") {
            self.symbols = list
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(addr) = get("BOT_BIND_ADDR") {
            self.bind_addr = addr.trim().to_string();
        }
    }

    /// Reject configurations no report cycle could satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::Invalid("no symbols configured".into()));
        }
        if self.quote_asset.trim().is_empty() {
            return Err(ConfigError::Invalid("quote_asset is empty".into()));
        }
        if self.rsi_timeframes.is_empty() {
            return Err(ConfigError::Invalid("no RSI timeframes configured".into()));
        }
        if self.rsi_periods.is_empty() || self.ema_periods.is_empty() {
            return Err(ConfigError::Invalid("RSI and EMA periods must not be empty".into()));
        }
        if self.rsi_periods.iter().chain(&self.ema_periods).any(|p| *p == 0) {
            return Err(ConfigError::Invalid("indicator periods must be positive".into()));
        }
        if self.rsi_candle_limit == 0 || self.ema_candle_limit == 0 {
            return Err(ConfigError::Invalid("candle limits must be positive".into()));
        }
        if self.sentiment_sources.is_empty() {
            return Err(ConfigError::Invalid("no sentiment sources configured".into()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".into()));
        }
        if self.utc_offset().is_none() {
            return Err(ConfigError::Invalid(format!(
                "report_utc_offset_hours {} out of range",
                self.report_utc_offset_hours
            )));
        }
        if let Some(job) = self.schedule.iter().find(|j| j.every_secs == 0) {
            return Err(ConfigError::Invalid(format!(
                "schedule entry for {} has every_secs = 0",
                job.kind
            )));
        }

        let needs_cmc = self.price_source == PriceSource::CoinMarketCap
            || self.sentiment_sources.contains(&SentimentSource::CoinMarketCap);
        let has_key = self
            .coinmarketcap
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if needs_cmc && !has_key {
            return Err(ConfigError::Invalid(
                "CoinMarketCap source selected but COINMARKETCAP_API_KEY is not set".into(),
            ));
        }

        for tf in self.rsi_timeframes.iter().chain(std::iter::once(&self.ema_timeframe)) {
            if !self.series_source.supports(*tf) {
                return Err(ConfigError::UnsupportedTimeframe(format!(
                    "{tf} is not offered by {:?}",
                    self.series_source
                )));
            }
        }

        Ok(())
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Symbol::new(s.as_str(), self.quote_asset.as_str()))
            .collect()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn utc_offset(&self) -> Option<FixedOffset> {
        if !(-12..=14).contains(&self.report_utc_offset_hours) {
            return None;
        }
        FixedOffset::east_opt(self.report_utc_offset_hours * 3600)
    }
}
