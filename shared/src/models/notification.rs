//! Notification Record Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Write-only fanout artifact delivered to one driver
///
/// Carries the minimum a driver needs to accept a job; no further
/// lifecycle after the batch write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    /// Recipient driver reference
    pub driver_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
