// =============================================================================
// Webhook Secret Verification — Axum Extractor
// =============================================================================
//
// Telegram echoes the `secret_token` given to `setWebhook` in the
// `X-Telegram-Bot-Api-Secret-Token` header of every update. When a secret is
// configured, updates without a matching header are rejected with 403 before
// the handler body runs. Comparison is constant time.
//
// Usage:
//
//   async fn handler(_secret: WebhookSecret, ...) { ... }
// =============================================================================

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

// =============================================================================
// Constant-time comparison
// =============================================================================

/// Compare two byte slices in constant time for equal lengths. A length
/// mismatch returns early; the expected length is not attacker-controlled.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Whether `presented` satisfies the configured secret. No secret configured
/// means every request passes.
pub fn secret_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected.filter(|s| !s.is_empty()), presented) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(expected), Some(presented)) => {
            constant_time_eq(presented.as_bytes(), expected.as_bytes())
        }
    }
}

// =============================================================================
// Extractor
// =============================================================================

pub struct WebhookSecret;

/// Rejection type returned when verification fails.
pub struct SecretRejection;

impl IntoResponse for SecretRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": "invalid webhook secret" });
        (StatusCode::FORBIDDEN, axum::Json(body)).into_response()
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for WebhookSecret {
    type Rejection = SecretRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        if secret_matches(state.config.telegram.secret_token.as_deref(), presented) {
            Ok(WebhookSecret)
        } else {
            warn!(header_present = presented.is_some(), "webhook secret mismatch");
            Err(SecretRejection)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
