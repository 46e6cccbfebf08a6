//! Screenshot Order API Module
//!
//! Public intake (multipart with the order screenshot) plus the operator
//! review/transition surface.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Screenshot order router
pub fn router() -> Router<ServerState> {
    Router::new().route(
        "/api/orders/screenshot",
        post(handler::submit)
            .get(handler::list)
            .put(handler::transition),
    )
}
