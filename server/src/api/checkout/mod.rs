//! Checkout API Module
//!
//! Opens payment-gateway checkout sessions for menu carts. The webhook
//! processor finishes the flow when the gateway reports payment.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Checkout router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/checkout", post(handler::create_checkout))
}
