//! Fee estimation
//!
//! Distance- and priority-based delivery pricing. The fee math is a pure
//! calculator over the routed distance; the estimator service wires it to
//! the geocode/route provider. No caching: a caller needing a frozen
//! price persists the returned estimate on the request record before
//! payment.

pub mod provider;

pub use provider::{GeoPoint, HttpRouteProvider, ProviderError, Route, RouteProvider};

use rust_decimal::Decimal;
use std::sync::Arc;

use shared::models::FeeEstimate;
use shared::{Address, PriorityTier, round_money};

/// Base fee in currency unit
pub const BASE_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2); // 5.00

/// Per-mile rate in currency unit
pub const PER_MILE_RATE: Decimal = Decimal::from_parts(150, 0, 0, false, 2); // 1.50

/// Meters per mile, to 2 dp
const METERS_PER_MILE: Decimal = Decimal::from_parts(160_934, 0, 0, false, 2); // 1609.34

/// Pure fee calculation: `(BASE + miles * RATE) * multiplier`, 2-dp half-up
pub fn calculate_fee(distance_meters: u64, tier: PriorityTier) -> Decimal {
    let miles = Decimal::from(distance_meters) / METERS_PER_MILE;
    round_money((BASE_FEE + miles * PER_MILE_RATE) * tier.multiplier())
}

/// Fee estimator service
#[derive(Clone)]
pub struct FeeEstimator {
    provider: Arc<dyn RouteProvider>,
}

impl FeeEstimator {
    pub fn new(provider: Arc<dyn RouteProvider>) -> Self {
        Self { provider }
    }

    /// Geocode both ends, route between them and price the leg
    ///
    /// The two geocode calls run concurrently. Fails with the provider's
    /// error if either address cannot be resolved or no route exists.
    pub async fn estimate(
        &self,
        pickup: &Address,
        dropoff: &Address,
        tier: PriorityTier,
    ) -> Result<FeeEstimate, ProviderError> {
        let (from, to) = tokio::try_join!(
            self.provider.geocode(pickup),
            self.provider.geocode(dropoff)
        )?;

        let route = self.provider.route(from, to).await?;
        let fee = calculate_fee(route.distance_meters, tier);

        tracing::debug!(
            distance_meters = route.distance_meters,
            duration_seconds = route.duration_seconds,
            tier = tier.as_str(),
            fee = %fee,
            "fee estimated"
        );

        Ok(FeeEstimate {
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
            fee,
            route_polyline: route.polyline,
        })
    }
}
