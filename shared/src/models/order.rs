//! Order Model

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::FulfillmentStatus;

/// A priced order line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Unit price in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Line subtotal (unit price x quantity)
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Marketplace order, created at checkout-session completion
///
/// Immutable once `paid` except through the transition entry point.
/// Never deleted; terminated via `cancelled`/`refunded`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Owning user reference
    pub user_id: String,
    pub items: Vec<LineItem>,
    /// Total in currency unit; equals the sum of line subtotals at creation
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub status: FulfillmentStatus,
    /// Payment gateway reference (checkout session / payment intent)
    pub payment_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of line-item subtotals
    pub fn computed_total(items: &[LineItem]) -> Decimal {
        items.iter().map(LineItem::subtotal).sum()
    }
}
