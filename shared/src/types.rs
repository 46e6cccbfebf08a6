//! Shared value types
//!
//! Addresses, priority tiers and money rounding used across the
//! fulfillment core.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Structured street address
///
/// Coordinates are optional: they are filled in by the geocode provider
/// when an estimate is computed and carried on the delivery record so the
/// route does not need to be re-resolved later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl Address {
    /// Single-line form sent to the geocode provider
    pub fn to_line(&self) -> String {
        format!("{}, {}, {} {}", self.street, self.city, self.state, self.zip)
    }

    /// Whether the address carries resolved coordinates
    pub fn is_geocoded(&self) -> bool {
        self.lat.is_some() && self.lng.is_some()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_line())
    }
}

/// Service speed class multiplying the base delivery fee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    #[default]
    Standard,
    Express,
    Rush,
}

impl PriorityTier {
    /// Fee multiplier for this tier
    pub fn multiplier(&self) -> Decimal {
        match self {
            Self::Standard => Decimal::new(10, 1), // 1.0
            Self::Express => Decimal::new(15, 1),  // 1.5
            Self::Rush => Decimal::new(20, 1),     // 2.0
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
            Self::Rush => "rush",
        }
    }
}

impl std::str::FromStr for PriorityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            "rush" => Ok(Self::Rush),
            other => Err(format!("unknown priority tier: {other}")),
        }
    }
}

/// Round a money amount to 2 decimal places, half away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
