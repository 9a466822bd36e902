// =============================================================================
// Webhook API — Axum 0.7
// =============================================================================
//
//   GET  /api/v1/health             public liveness probe
//   POST /api/v1/telegram/webhook   Telegram updates (secret header checked)
//
// Only the configured chat is served; updates from any other chat are
// acknowledged and dropped. Telegram is answered immediately; report work runs
// on its own task and replies through the message sink.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::api::auth::WebhookSecret;
use crate::app_state::AppState;
use crate::error::ReportError;
use crate::report::failure_message;
use crate::telegram::commands::{help_text, Command};
use crate::types::Timeframe;

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/telegram/webhook", post(telegram_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    active: bool,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        active: state.activation.is_active(),
        uptime_secs: state.uptime_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Telegram webhook
// =============================================================================

/// The subset of a Telegram `Update` the bot reads.
#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    update_id: i64,
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

async fn telegram_webhook(
    _secret: WebhookSecret,
    State(state): State<Arc<AppState>>,
    Json(update): Json<Update>,
) -> impl IntoResponse {
    let ack = Json(serde_json::json!({ "ok": true }));

    let Some(message) = update.message else {
        return ack;
    };
    if message.chat.id.to_string() != state.config.telegram.chat_id {
        warn!(
            chat_id = message.chat.id,
            update_id = update.update_id,
            "update from unauthorised chat ignored"
        );
        return ack;
    }
    let Some(text) = message.text else {
        return ack;
    };

    let command = Command::parse(&text);
    info!(?command, update_id = update.update_id, "chat command received");
    tokio::spawn(handle_command(state, command));
    ack
}

/// Carry out one command and answer through the sink.
pub async fn handle_command(state: Arc<AppState>, command: Command) {
    let sink = state.sink.as_ref();
    let reply = match command {
        Command::Start => toggle(&state, true),
        Command::Stop => toggle(&state, false),
        Command::Status => status_text(&state),
        Command::Help => help_text().to_string(),
        Command::Report(kind) => {
            state.service.run_cycle(kind, sink).await;
            return;
        }
        Command::Rsi(None) => {
            state.service.run_cycle(crate::types::ReportKind::Rsi, sink).await;
            return;
        }
        Command::Rsi(Some(raw)) => match raw.parse::<Timeframe>() {
            Ok(tf) => {
                state.service.run_rsi_cycle(&[tf], sink).await;
                return;
            }
            Err(e) => failure_message(&ReportError::from(e)),
        },
    };

    if let Err(e) = sink.deliver(&reply).await {
        error!(error = %e, "command reply dispatch failed");
    }
}

fn toggle(state: &AppState, active: bool) -> String {
    match state.activation.set(active) {
        Ok(()) if active => "✅ Scheduled reports enabled.".to_string(),
        Ok(()) => "⏸ Scheduled reports disabled.".to_string(),
        Err(e) => {
            error!(error = %e, "failed to persist activation state");
            "⚠️ Could not save the activation state, please retry.".to_string()
        }
    }
}

fn status_text(state: &AppState) -> String {
    let config = &state.config;
    let schedule: Vec<String> = config
        .schedule
        .iter()
        .map(|job| format!("{} every {} min", job.kind, job.every_secs / 60))
        .collect();
    let timeframes: Vec<&str> = config.rsi_timeframes.iter().map(|t| t.as_str()).collect();

    format!(
        "ℹ️ *Status*\nScheduled reports: {}\nSymbols: {}\nRSI timeframes: {}\n\
         Schedule: {}\nUptime: {}s",
        if state.activation.is_active() { "on" } else { "off" },
        config.symbols.join(", "),
        timeframes.join(", "),
        schedule.join("; "),
        state.uptime_secs()
    )
}
