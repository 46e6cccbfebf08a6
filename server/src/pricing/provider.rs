//! Geocode / route provider boundary
//!
//! The route provider is an external collaborator; the estimator only
//! consumes this trait. The HTTP implementation bounds every call with a
//! client timeout so a slow provider fails the estimate fast instead of
//! holding the request open.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use shared::{Address, AppError};

/// Resolved coordinate pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Routed leg between two resolved points
#[derive(Debug, Clone)]
pub struct Route {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub polyline: String,
}

/// Provider failure taxonomy
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Geocoding failed for '{address}': {reason}")]
    Geocode { address: String, reason: String },

    #[error("No route between resolved points: {0}")]
    Route(String),

    #[error("Route provider unreachable: {0}")]
    Transport(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::upstream(err.to_string())
    }
}

/// Narrow interface over the geocode/route provider
#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Resolve an address to coordinates
    async fn geocode(&self, address: &Address) -> Result<GeoPoint, ProviderError>;

    /// Route between two resolved points
    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Route, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    distance_meters: u64,
    duration_seconds: u64,
    polyline: String,
}

/// HTTP route provider client
pub struct HttpRouteProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRouteProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RouteProvider for HttpRouteProvider {
    async fn geocode(&self, address: &Address) -> Result<GeoPoint, ProviderError> {
        let line = address.to_line();
        let response = self
            .client
            .get(format!("{}/geocode", self.base_url))
            .query(&[("q", line.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Geocode {
                address: line,
                reason: format!("provider returned {}", response.status()),
            });
        }

        let body: GeocodeResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::Geocode {
                    address: line,
                    reason: e.to_string(),
                })?;

        Ok(GeoPoint {
            lat: body.lat,
            lng: body.lng,
        })
    }

    async fn route(&self, from: GeoPoint, to: GeoPoint) -> Result<Route, ProviderError> {
        let response = self
            .client
            .get(format!("{}/route", self.base_url))
            .query(&[
                ("from_lat", from.lat),
                ("from_lng", from.lng),
                ("to_lat", to.lat),
                ("to_lng", to.lng),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Route(format!(
                "provider returned {}",
                response.status()
            )));
        }

        let body: RouteResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Route(e.to_string()))?;

        Ok(Route {
            distance_meters: body.distance_meters,
            duration_seconds: body.duration_seconds,
            polyline: body.polyline,
        })
    }
}
