//! Menu Admin API Module

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Menu admin router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/admin/menu/bulk", post(handler::bulk))
}
