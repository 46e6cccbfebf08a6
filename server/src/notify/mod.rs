//! Driver notification fanout
//!
//! Broadcasts a paid delivery to every eligible driver as independent
//! notification records, persisted in one atomic batch. Fire-and-forget
//! relative to the payment transition that triggers it: a failed fanout
//! never unwinds the transition, and a failed batch leaves no partial
//! notification set behind.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use shared::models::{DeliveryRequest, NotificationRecord};
use shared::{AppError, AppResult};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::db::StoreHandle;
use crate::db::repository::{DriverRepository, NotificationRepository};

/// Event type carried on fanout records
pub const EVENT_DELIVERY_AVAILABLE: &str = "delivery_available";

/// Notification fanout service
#[derive(Clone)]
pub struct NotificationFanout {
    drivers: DriverRepository,
    notifications: NotificationRepository,
    audit: Arc<dyn AuditSink>,
}

impl NotificationFanout {
    pub fn new(store: StoreHandle, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            drivers: DriverRepository::new(store.clone()),
            notifications: NotificationRepository::new(store),
            audit,
        }
    }

    /// Notify every available+active driver about a paid delivery
    ///
    /// Returns how many drivers were notified. Zero eligible drivers is
    /// a success with no store write.
    pub async fn notify_available_drivers(&self, delivery: &DeliveryRequest) -> AppResult<usize> {
        let eligible = self.drivers.find_eligible().await?;
        if eligible.is_empty() {
            tracing::info!(delivery_id = %delivery.id, "no eligible drivers to notify");
            return Ok(0);
        }

        let now = Utc::now();
        let payload = json!({
            "delivery_id": delivery.id,
            "pickup": delivery.pickup,
            "dropoff": delivery.dropoff,
            "fee": delivery.estimate.fee,
        });

        let records: Vec<NotificationRecord> = eligible
            .iter()
            .map(|driver| NotificationRecord {
                id: format!("ntf_{}", Uuid::new_v4().simple()),
                driver_id: driver.id.clone(),
                event_type: EVENT_DELIVERY_AVAILABLE.to_string(),
                payload: payload.clone(),
                created_at: now,
            })
            .collect();

        self.notifications
            .create_batch(&records)
            .await
            .map_err(|e| AppError::database(format!("Notification fanout failed: {e}")))?;

        let notified = records.len();
        tracing::info!(delivery_id = %delivery.id, notified, "drivers notified");
        self.audit
            .record(
                AuditEntry::new(AuditAction::DriversNotified, "delivery", &delivery.id)
                    .with_details(json!({ "notified": notified })),
            )
            .await;
        Ok(notified)
    }
}
