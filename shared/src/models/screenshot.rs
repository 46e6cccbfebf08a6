//! Screenshot Order Model
//!
//! Public intake orders where the customer uploads a screenshot of a
//! restaurant order instead of a structured cart.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::ScreenshotStatus;

/// Workflow phase flags
///
/// Monotonic: once a phase flag is set it is never cleared by a normal
/// transition. Each flag is flipped when the matching status is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowFlags {
    pub review_required: bool,
    pub confirmation_called: bool,
    pub order_placed: bool,
    pub picked_up: bool,
    pub delivered: bool,
}

impl WorkflowFlags {
    /// Flip the flag matching a reached status; other flags untouched
    pub fn mark(&mut self, status: ScreenshotStatus) {
        match status {
            ScreenshotStatus::Confirmed => self.confirmation_called = true,
            ScreenshotStatus::OrderPlaced => self.order_placed = true,
            ScreenshotStatus::PickedUp => self.picked_up = true,
            ScreenshotStatus::Delivered => self.delivered = true,
            ScreenshotStatus::PendingReview | ScreenshotStatus::Cancelled => {}
        }
    }
}

/// Screenshot order record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotOrder {
    pub id: String,
    /// Human-facing order code (SO-XXXXXX)
    pub order_code: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub restaurant_name: String,
    pub pickup_location: String,
    /// Customer-declared estimate in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub estimated_total: Decimal,
    /// Stored screenshot image reference
    pub screenshot_ref: String,
    pub special_instructions: Option<String>,
    pub status: ScreenshotStatus,
    pub workflow: WorkflowFlags,
    pub admin_notes: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
