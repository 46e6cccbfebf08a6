//! Router assembly
//!
//! All API routers merged, wrapped in the shared middleware stack. The
//! rate limiter sits outside the handlers so denials never reach them
//! and every response carries the limit headers.

use axum::Router;
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::api;
use crate::core::ServerState;
use crate::ratelimit::rate_limit_middleware;

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the application with all routes, middleware and state
pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .merge(api::checkout::router())
        .merge(api::webhooks::router())
        .merge(api::screenshot_orders::router())
        .merge(api::deliveries::router())
        .merge(api::menu::router())
        .merge(api::health::router())
        // ========== Middleware ==========
        // Rate limiting - closest to the routes, keyed per caller
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}
