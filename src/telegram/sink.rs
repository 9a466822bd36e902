// =============================================================================
// Message delivery
// =============================================================================
//
// POST {api_base}/bot{token}/sendMessage
//
//   { "chat_id": "...", "text": "...", "parse_mode": "Markdown",
//     "disable_web_page_preview": true }
//
// Telegram answers `{ "ok": true, ... }` or
// `{ "ok": false, "error_code": 400, "description": "..." }`.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::TelegramConfig;
use crate::error::SinkError;

/// Final step of the report pipeline: hand the text to the chat endpoint.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<(), SinkError>;
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
    timeout: Duration,
}

impl TelegramSink {
    pub fn new(client: reqwest::Client, config: &TelegramConfig, timeout: Duration) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token)
    }

    fn check_reply(status: u16, body: &serde_json::Value) -> Result<(), SinkError> {
        if body["ok"].as_bool() == Some(true) {
            return Ok(());
        }
        Err(SinkError::Rejected {
            status: body["error_code"]
                .as_u64()
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(status),
            description: body["description"]
                .as_str()
                .unwrap_or("no description")
                .to_string(),
        })
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    #[instrument(
        skip(self, text),
        fields(chars = text.chars().count()),
        name = "telegram::send_message"
    )]
    async fn deliver(&self, text: &str) -> Result<(), SinkError> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        // reqwest errors carry the URL, which contains the token.
        let resp = self
            .client
            .post(self.endpoint())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                if e.is_timeout() {
                    SinkError::Transport(format!("timed out after {}s", self.timeout.as_secs()))
                } else {
                    SinkError::Transport(e.to_string())
                }
            })?;

        let status = resp.status().as_u16();
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| SinkError::Transport(e.without_url().to_string()))?;

        Self::check_reply(status, &body)?;
        debug!("message delivered");
        Ok(())
    }
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> TelegramSink {
        let config = TelegramConfig {
            bot_token: "123:secret".into(),
            chat_id: "42".into(),
            secret_token: None,
            api_base: "https://api.telegram.org/".into(),
        };
        TelegramSink::new(reqwest::Client::new(), &config, Duration::from_secs(1))
    }

    #[test]
    fn endpoint_embeds_token() {
        assert_eq!(
            sink().endpoint(),
            "https://api.telegram.org/bot123:secret/sendMessage"
        );
    }

    #[test]
    fn ok_false_is_rejected() {
        let body = serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: can't parse entities"
        });
        match TelegramSink::check_reply(400, &body) {
            Err(SinkError::Rejected { status, description }) => {
                assert_eq!(status, 400);
                assert!(description.contains("parse entities"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(TelegramSink::check_reply(200, &serde_json::json!({ "ok": true })).is_ok());
    }

    #[test]
    fn payload_shape() {
        let payload = SendMessage {
            chat_id: "42",
            text: "*hi*",
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["chat_id"], "42");
        assert_eq!(json["parse_mode"], "Markdown");
        assert_eq!(json["disable_web_page_preview"], true);
    }

    #[test]
    fn debug_redacts_token() {
        assert!(!format!("{:?}", sink()).contains("secret"));
    }
}
