//! Fulfillment status types
//!
//! The status fields on orders, delivery requests and screenshot orders
//! are tagged enums, not free strings: unknown values are rejected at
//! parse time and every mutation goes through the single transition entry
//! point in the server's fulfillment service.
//!
//! The tables here are strict forward-only. Backward moves are reserved
//! for the `force` escape hatch (admin role), and terminal states are
//! never exited, forced or not.

use serde::{Deserialize, Serialize};

/// Status shared by orders and delivery requests
///
/// Orders skip `assigned`/`in_transit` in practice but live on the same
/// scale; skipping forward is allowed at the data layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    PendingPayment,
    Paid,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
    Refunded,
}

impl FulfillmentStatus {
    /// Position on the forward progress scale; terminal aborts have none
    fn rank(&self) -> Option<u8> {
        match self {
            Self::PendingPayment => Some(0),
            Self::Paid => Some(1),
            Self::Assigned => Some(2),
            Self::PickedUp => Some(3),
            Self::InTransit => Some(4),
            Self::Delivered => Some(5),
            Self::Cancelled | Self::Refunded => None,
        }
    }

    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Whether a normal (non-forced) transition to `target` is legal
    ///
    /// Self-transition is legal; callers treat it as a no-op.
    pub fn can_transition_to(&self, target: Self) -> bool {
        if *self == target {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        // Abort states are reachable from any non-terminal state
        if matches!(target, Self::Cancelled | Self::Refunded) {
            return true;
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Assigned => "assigned",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(Self::PendingPayment),
            "paid" => Ok(Self::Paid),
            "assigned" => Ok(Self::Assigned),
            "picked_up" => Ok(Self::PickedUp),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Screenshot order workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotStatus {
    #[default]
    PendingReview,
    Confirmed,
    OrderPlaced,
    PickedUp,
    Delivered,
    Cancelled,
}

impl ScreenshotStatus {
    fn rank(&self) -> Option<u8> {
        match self {
            Self::PendingReview => Some(0),
            Self::Confirmed => Some(1),
            Self::OrderPlaced => Some(2),
            Self::PickedUp => Some(3),
            Self::Delivered => Some(4),
            Self::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether a normal (non-forced) transition to `target` is legal
    pub fn can_transition_to(&self, target: Self) -> bool {
        if *self == target {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        if target == Self::Cancelled {
            return true;
        }
        match (self.rank(), target.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::Confirmed => "confirmed",
            Self::OrderPlaced => "order_placed",
            Self::PickedUp => "picked_up",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ScreenshotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(Self::PendingReview),
            "confirmed" => Ok(Self::Confirmed),
            "order_placed" => Ok(Self::OrderPlaced),
            "picked_up" => Ok(Self::PickedUp),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl std::fmt::Display for ScreenshotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
