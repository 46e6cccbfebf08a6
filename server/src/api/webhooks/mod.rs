//! Webhook API Module
//!
//! Receiving end of the payment gateway's event stream.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Webhook router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/webhooks/payment", post(handler::payment_webhook))
}
