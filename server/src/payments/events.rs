//! Webhook event payload types
//!
//! The gateway's envelope: `{id, type, data: {object}}`. Only the fields
//! the processor routes on are modeled; everything else is ignored.

use serde::Deserialize;
use std::collections::HashMap;

use shared::models::LineItem;

/// Event type: completed checkout session
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
/// Event type: failed payment intent
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";
/// Event type: refunded charge
pub const CHARGE_REFUNDED: &str = "charge.refunded";

/// Metadata kind tag marking a delivery payment
pub const KIND_DELIVERY: &str = "delivery";

/// Webhook envelope
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: EventObject,
}

/// The session / intent / charge the event describes
#[derive(Debug, Deserialize)]
pub struct EventObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Present on checkout sessions for regular orders
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl EventObject {
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Whether the session is tagged as a delivery payment
    pub fn is_delivery(&self) -> bool {
        self.meta("kind") == Some(KIND_DELIVERY)
    }
}
