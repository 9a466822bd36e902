// =============================================================================
// Crypto Indicator Bot — Main Entry Point
// =============================================================================
//
// Scheduled pushes start disabled unless the persisted activation flag says
// otherwise; the authorised chat turns them on with /start.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod activation;
mod aggregator;
mod api;
mod app_state;
mod binance;
mod coinmarketcap;
mod config;
mod error;
mod http;
mod indicators;
mod market_data;
mod okx;
mod providers;
mod report;
mod scheduler;
mod sentiment;
mod service;
mod telegram;
#[cfg(test)]
mod testing;
mod types;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::activation::ActivationStore;
use crate::aggregator::{Aggregator, RequestMatrix};
use crate::app_state::AppState;
use crate::binance::{BinanceClient, BinanceMarket};
use crate::coinmarketcap::CoinMarketCapClient;
use crate::config::{AppConfig, PriceSource, SentimentSource, SeriesSource};
use crate::okx::OkxClient;
use crate::providers::{PriceProvider, SentimentProvider, SeriesProvider};
use crate::scheduler::Scheduler;
use crate::sentiment::AlternativeMeClient;
use crate::service::ReportService;
use crate::telegram::{MessageSink, TelegramSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Crypto Indicator Bot — Starting Up                ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("BOT_CONFIG_PATH").unwrap_or_else(|_| "bot_config.json".into());
    let mut config = AppConfig::load_or_default(&config_path)?;
    config.apply_env();
    config.validate().context("invalid configuration")?;

    if config.telegram.bot_token.is_empty() || config.telegram.chat_id.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, reports cannot be delivered");
    }
    info!(
        symbols = ?config.symbols,
        series_source = ?config.series_source,
        price_source = ?config.price_source,
        sentiment_sources = ?config.sentiment_sources,
        "Configured request matrix"
    );

    let config = Arc::new(config);
    let timeout = config.fetch_timeout();
    let offset = config
        .utc_offset()
        .context("report_utc_offset_hours out of range")?;

    // ── 2. Upstream providers ────────────────────────────────────────────
    let client = http::build_client(timeout).context("failed to build HTTP client")?;
    let endpoints = &config.endpoints;

    let binance_spot = Arc::new(BinanceClient::new(
        client.clone(),
        endpoints.binance_spot.as_str(),
        BinanceMarket::Spot,
        timeout,
    ));

    let cmc = config.coinmarketcap.api_key.as_ref().map(|key| {
        Arc::new(CoinMarketCapClient::new(
            client.clone(),
            config.coinmarketcap.base_url.as_str(),
            key.as_str(),
            timeout,
        ))
    });

    let series: Arc<dyn SeriesProvider> = match config.series_source {
        SeriesSource::Binance => binance_spot.clone(),
        SeriesSource::Okx => {
            Arc::new(OkxClient::new(client.clone(), endpoints.okx.as_str(), timeout))
        }
    };

    let spot: Arc<dyn PriceProvider> = match (config.price_source, &cmc) {
        (PriceSource::Binance, _) => binance_spot.clone(),
        (PriceSource::CoinMarketCap, Some(cmc)) => cmc.clone(),
        (PriceSource::CoinMarketCap, None) => {
            anyhow::bail!("CoinMarketCap price source needs an API key")
        }
    };

    let contract: Option<Arc<dyn PriceProvider>> = if config.premium_enabled {
        Some(Arc::new(BinanceClient::new(
            client.clone(),
            endpoints.binance_futures.as_str(),
            BinanceMarket::UsdFutures,
            timeout,
        )))
    } else {
        None
    };

    let mut sentiment: Vec<Arc<dyn SentimentProvider>> = Vec::new();
    for source in &config.sentiment_sources {
        match (source, &cmc) {
            (SentimentSource::AlternativeMe, _) => sentiment.push(Arc::new(AlternativeMeClient::new(
                client.clone(),
                endpoints.alternative_me.as_str(),
                timeout,
            ))),
            (SentimentSource::CoinMarketCap, Some(cmc)) => sentiment.push(cmc.clone()),
            (SentimentSource::CoinMarketCap, None) => {
                anyhow::bail!("CoinMarketCap sentiment source needs an API key")
            }
        }
    }

    // ── 3. Report pipeline ───────────────────────────────────────────────
    let aggregator = Aggregator::new(
        series,
        spot,
        contract,
        sentiment,
        RequestMatrix::from_config(&config),
        timeout,
    );
    let service = Arc::new(ReportService::new(aggregator, offset));
    let sink: Arc<dyn MessageSink> =
        Arc::new(TelegramSink::new(client.clone(), &config.telegram, timeout));
    let activation = Arc::new(ActivationStore::load(&config.activation_path));

    // ── 4. Scheduler ─────────────────────────────────────────────────────
    let scheduler = Scheduler::new(
        config.schedule.clone(),
        service.clone(),
        sink.clone(),
        activation.clone(),
    );
    let mut tasks = scheduler.start();
    info!(jobs = tasks.len(), active = activation.is_active(), "Scheduler started");

    // ── 5. Webhook server ────────────────────────────────────────────────
    let state = Arc::new(AppState::new(config.clone(), service, sink, activation));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind webhook server on {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "Webhook server listening");

    let app = api::router(state);
    tasks.push(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Webhook server failed");
        }
    }));

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping gracefully");

    for task in &tasks {
        task.abort();
    }

    info!("Crypto Indicator Bot shut down complete.");
    Ok(())
}
