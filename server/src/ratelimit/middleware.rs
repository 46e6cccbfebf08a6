//! Rate limit middleware
//!
//! Every API response carries the `X-RateLimit-*` headers; denials get a
//! 429 with `Retry-After`. The client key is the authenticated caller id
//! when a valid bearer token is present, else the forwarded peer address.

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use shared::AppError;

use super::{Decision, RouteClass};
use crate::auth::JwtService;
use crate::core::ServerState;

fn client_key(state: &ServerState, request: &Request) -> String {
    // Prefer the caller identity from a valid token
    if let Some(token) = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(JwtService::extract_from_header)
        && let Ok(claims) = state.jwt_service.validate_token(token)
    {
        return claims.sub;
    }

    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

fn set_limit_headers(response: &mut Response, limit: u32, remaining: u32, reset: u64) {
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&limit.to_string()) {
        headers.insert("x-ratelimit-limit", v);
    }
    if let Ok(v) = HeaderValue::from_str(&remaining.to_string()) {
        headers.insert("x-ratelimit-remaining", v);
    }
    if let Ok(v) = HeaderValue::from_str(&reset.to_string()) {
        headers.insert("x-ratelimit-reset", v);
    }
}

/// Axum middleware wrapping every API route
pub async fn rate_limit_middleware(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let class = RouteClass::from_path(request.uri().path());
    let key = client_key(&state, &request);

    match state.rate_limiter.check(&key, class) {
        Decision::Allow {
            limit,
            remaining,
            reset_epoch_secs,
        } => {
            let mut response = next.run(request).await;
            set_limit_headers(&mut response, limit, remaining, reset_epoch_secs);
            response
        }
        Decision::Deny {
            limit,
            retry_after_secs,
            reset_epoch_secs,
        } => {
            tracing::warn!(
                target: "ratelimit",
                key = %key,
                class = ?class,
                retry_after_secs,
                "request rate limited"
            );
            let mut response = AppError::RateLimited { retry_after_secs }.into_response();
            set_limit_headers(&mut response, limit, 0, reset_epoch_secs);
            response
        }
    }
}
