//! Delivery Request Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Address, PriorityTier};

use super::status::FulfillmentStatus;

/// Priced route between two resolved addresses
///
/// Recomputed at request time and frozen on the record once payment
/// succeeds (the quote the customer paid is the quote that stands).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    /// Fee in currency unit, rounded to 2 dp
    #[serde(with = "rust_decimal::serde::float")]
    pub fee: Decimal,
    /// Encoded route polyline from the route provider
    pub route_polyline: String,
}

/// On-the-way delivery request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub id: String,
    pub user_id: String,
    pub pickup: Address,
    pub dropoff: Address,
    /// What is being carried
    pub items: Vec<String>,
    pub priority: PriorityTier,
    pub estimate: FeeEstimate,
    pub status: FulfillmentStatus,
    /// Payment gateway reference (checkout session)
    pub payment_ref: Option<String>,
    /// Assigned driver, set on paid -> assigned
    pub driver_id: Option<String>,
    pub contact_phone: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}
