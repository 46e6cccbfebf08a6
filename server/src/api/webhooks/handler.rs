//! Webhook API Handlers

use axum::{Json, body::Bytes, extract::State, http::HeaderMap};
use serde::Serialize;

use shared::{AppError, AppResponse, AppResult, ok};

use crate::core::ServerState;

/// Header carrying the gateway's HMAC signature
const SIGNATURE_HEADER: &str = "signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Payment gateway webhook endpoint
///
/// Takes the raw body so the signature is checked over the exact bytes
/// the gateway signed. Responds 200 to everything except a signature
/// failure; the processor owns all recovery semantics.
pub async fn payment_webhook(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<AppResponse<WebhookAck>>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("Missing signature header"))?;

    let outcome = state.webhook.handle(&body, signature).await?;
    for warning in &outcome.warnings {
        tracing::warn!(target: "webhook", warning, "webhook processed with warning");
    }

    Ok(ok(WebhookAck { received: true }))
}
