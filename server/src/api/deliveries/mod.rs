//! Delivery API Module

mod handler;

use axum::{
    Router,
    routing::{post, put},
};

use crate::core::ServerState;

/// Delivery router
pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/deliveries/estimate", post(handler::estimate))
        .route("/api/deliveries", post(handler::create))
        .route("/api/deliveries/{id}/status", put(handler::transition))
        .route("/api/deliveries/{id}/accept", post(handler::accept))
}
