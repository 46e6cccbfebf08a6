//! Driver Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fleet driver
///
/// `active` is the account switch (set by an admin); `available` is the
/// driver's own duty toggle. Fanout targets drivers with both set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub available: bool,
    pub active: bool,
    /// Delivery currently being carried, if any
    pub current_delivery_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Driver {
    /// Eligible to be notified of a new paid delivery
    pub fn is_eligible(&self) -> bool {
        self.available && self.active
    }
}
