//! Webhook event processor
//!
//! Verifies the gateway's HMAC signature, then maps events onto state
//! transitions. The gateway retries until it sees a 200, so everything
//! after signature verification is recover-locally: unmatched lookups
//! are logged and swallowed, and redelivered events must not double-apply
//! side effects. Idempotency comes from no-op self-transitions and from
//! order-creation dedup by session reference, not from the HTTP status.

use ring::hmac;
use serde_json::json;
use std::sync::Arc;

use shared::models::status::FulfillmentStatus;
use shared::{AppError, AppResult};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::db::StoreHandle;
use crate::db::repository::{DeliveryRepository, OrderRepository, UserRepository};
use crate::fulfillment::{FulfillmentService, TransitionMeta};
use crate::notify::NotificationFanout;

use super::events::{
    CHARGE_REFUNDED, CHECKOUT_COMPLETED, EventObject, PAYMENT_FAILED, WebhookEvent,
};

/// Note written on payment-failure cancellations
const PAYMENT_FAILED_NOTE: &str = "Payment failed";

/// Sign a payload the way the gateway does (tests, local development)
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hex::encode(hmac::sign(&key, payload).as_ref())
}

/// Outcome of processing one delivery of one event
///
/// `warnings` carries non-fatal side-effect failures (a fanout that did
/// not go through) so callers can observe them without changing control
/// flow.
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub handled: bool,
    pub warnings: Vec<String>,
}

impl ProcessOutcome {
    fn handled() -> Self {
        Self {
            handled: true,
            warnings: Vec::new(),
        }
    }

    fn skipped() -> Self {
        Self::default()
    }

    fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// Webhook event processor
#[derive(Clone)]
pub struct WebhookProcessor {
    secret: String,
    fulfillment: FulfillmentService,
    fanout: NotificationFanout,
    orders: OrderRepository,
    deliveries: DeliveryRepository,
    users: UserRepository,
    audit: Arc<dyn AuditSink>,
}

impl WebhookProcessor {
    pub fn new(
        secret: String,
        store: StoreHandle,
        fulfillment: FulfillmentService,
        fanout: NotificationFanout,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            secret,
            fulfillment,
            fanout,
            orders: OrderRepository::new(store.clone()),
            deliveries: DeliveryRepository::new(store.clone()),
            users: UserRepository::new(store),
            audit,
        }
    }

    /// Verify the hex HMAC-SHA256 signature over the raw body
    ///
    /// Constant-time compare via `ring`. Callers must return 400 on
    /// failure and never parse the body.
    pub fn verify_signature(&self, payload: &[u8], signature: &str) -> AppResult<()> {
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.secret.as_bytes());
        let tag = hex::decode(signature)
            .map_err(|_| AppError::validation("Malformed webhook signature"))?;
        hmac::verify(&key, payload, &tag)
            .map_err(|_| AppError::validation("Invalid webhook signature"))
    }

    /// Verify and process one raw webhook delivery
    ///
    /// Only a signature failure surfaces as `Err`. Anything that goes
    /// wrong after verification is recorded on the outcome and answered
    /// 200, since the gateway's retry would only replay the same event.
    pub async fn handle(&self, payload: &[u8], signature: &str) -> AppResult<ProcessOutcome> {
        if let Err(e) = self.verify_signature(payload, signature) {
            self.audit
                .record(AuditEntry::new(
                    AuditAction::WebhookSignatureRejected,
                    "webhook",
                    "-",
                ))
                .await;
            return Err(e);
        }

        let event: WebhookEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(e) => {
                // Signed but unparseable: nothing to retry into, swallow
                tracing::error!(error = %e, "webhook payload failed to parse");
                return Ok(ProcessOutcome::skipped().warn("unparseable payload"));
            }
        };

        tracing::info!(event_id = %event.id, event_type = %event.event_type, "webhook received");

        let result = match event.event_type.as_str() {
            CHECKOUT_COMPLETED => self.on_checkout_completed(&event).await,
            PAYMENT_FAILED => self.on_payment_failed(&event).await,
            CHARGE_REFUNDED => self.on_charge_refunded(&event).await,
            other => {
                tracing::debug!(event_type = %other, "ignoring unhandled event type");
                Ok(ProcessOutcome::skipped())
            }
        };

        // Reordered deliveries land here: a completion arriving after a
        // cancellation hits the terminal-state guard. The record keeps
        // its state and the gateway still gets its 200.
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "webhook processing failed; swallowing"
                );
                ProcessOutcome::skipped().warn(format!("processing failed: {e}"))
            }
        };

        self.audit
            .record(
                AuditEntry::new(AuditAction::WebhookProcessed, "webhook", &event.id)
                    .with_details(json!({
                        "type": event.event_type,
                        "handled": outcome.handled,
                        "warnings": outcome.warnings,
                    })),
            )
            .await;

        Ok(outcome)
    }

    // ========== Event handlers ==========

    async fn on_checkout_completed(&self, event: &WebhookEvent) -> AppResult<ProcessOutcome> {
        let session = &event.data.object;
        if session.is_delivery() {
            self.complete_delivery_payment(event, session).await
        } else {
            self.complete_order_payment(event, session).await
        }
    }

    /// Delivery payment: transition to paid, then fan out to drivers
    async fn complete_delivery_payment(
        &self,
        event: &WebhookEvent,
        session: &EventObject,
    ) -> AppResult<ProcessOutcome> {
        // The session reference stored at checkout time is authoritative;
        // the metadata tag is the fallback for sessions opened elsewhere.
        let delivery = match self.deliveries.find_by_payment_ref(&session.id).await? {
            Some(d) => Some(d),
            None => match session.meta("delivery_id") {
                Some(id) => self.deliveries.find_by_id(id).await?,
                None => {
                    return self.ambiguous(event, "delivery payment without delivery_id").await;
                }
            },
        };

        let Some(delivery) = delivery else {
            tracing::warn!(
                event_id = %event.id,
                session_id = %session.id,
                "no delivery matches completed session; swallowing"
            );
            return Ok(ProcessOutcome::skipped());
        };

        if delivery.status == FulfillmentStatus::Paid {
            // Redelivered event: state already applied, skip the fanout too
            tracing::info!(delivery_id = %delivery.id, "duplicate payment event ignored");
            return Ok(ProcessOutcome::handled());
        }

        let paid = self
            .fulfillment
            .transition_delivery(&delivery.id, FulfillmentStatus::Paid, TransitionMeta::default())
            .await?;

        // Fire-and-forget: fanout failure never unwinds the paid transition
        match self.fanout.notify_available_drivers(&paid).await {
            Ok(notified) => {
                tracing::info!(delivery_id = %paid.id, notified, "delivery paid and broadcast");
                Ok(ProcessOutcome::handled())
            }
            Err(e) => {
                tracing::error!(delivery_id = %paid.id, error = %e, "driver fanout failed");
                Ok(ProcessOutcome::handled().warn(format!("fanout failed: {e}")))
            }
        }
    }

    /// Regular order: create the record and grant one loyalty spin
    async fn complete_order_payment(
        &self,
        event: &WebhookEvent,
        session: &EventObject,
    ) -> AppResult<ProcessOutcome> {
        // The order opened at checkout time carries the session reference.
        // A redelivered event finds it already paid and stops there, so
        // neither the order nor the spin is ever applied twice.
        let order = match self.orders.find_by_payment_ref(&session.id).await? {
            Some(order) => {
                if order.status == FulfillmentStatus::Paid {
                    tracing::info!(order_id = %order.id, "duplicate payment event ignored");
                    return Ok(ProcessOutcome::handled());
                }
                order
            }
            None => {
                // Session opened outside this service: build the order
                // from the session itself
                let Some(user_id) = session.meta("user_id") else {
                    return self.ambiguous(event, "checkout session without user_id").await;
                };
                if session.line_items.is_empty() {
                    return self
                        .ambiguous(event, "checkout session without line items")
                        .await;
                }
                self.fulfillment
                    .create_order(user_id, session.line_items.clone(), Some(session.id.clone()))
                    .await?
            }
        };

        let paid = self
            .fulfillment
            .transition_order(&order.id, FulfillmentStatus::Paid, TransitionMeta::default())
            .await?;
        let spins = self.users.increment_spins(&paid.user_id).await?;
        tracing::info!(order_id = %paid.id, user_id = %paid.user_id, spins, "order payment applied");
        Ok(ProcessOutcome::handled())
    }

    async fn on_payment_failed(&self, event: &WebhookEvent) -> AppResult<ProcessOutcome> {
        let object = &event.data.object;
        let meta = TransitionMeta::with_notes(PAYMENT_FAILED_NOTE);

        if let Some(delivery) = self.locate_delivery(object).await? {
            self.fulfillment
                .transition_delivery(&delivery.id, FulfillmentStatus::Cancelled, meta)
                .await?;
            return Ok(ProcessOutcome::handled());
        }
        if let Some(order) = self.locate_order(object).await? {
            self.fulfillment
                .transition_order(&order.id, FulfillmentStatus::Cancelled, meta)
                .await?;
            return Ok(ProcessOutcome::handled());
        }

        tracing::warn!(event_id = %event.id, "payment failure matches no record; swallowing");
        Ok(ProcessOutcome::skipped())
    }

    async fn on_charge_refunded(&self, event: &WebhookEvent) -> AppResult<ProcessOutcome> {
        let object = &event.data.object;

        // Refunds route purely on metadata; its absence is an escalation,
        // not a swallow (manual reconciliation needed)
        if let Some(order_id) = object.meta("order_id") {
            match self.orders.find_by_id(order_id).await? {
                Some(order) => {
                    self.fulfillment
                        .transition_order(
                            &order.id,
                            FulfillmentStatus::Refunded,
                            TransitionMeta::default(),
                        )
                        .await?;
                    return Ok(ProcessOutcome::handled());
                }
                None => {
                    tracing::warn!(order_id, "refund for unknown order; swallowing");
                    return Ok(ProcessOutcome::skipped());
                }
            }
        }
        if let Some(delivery_id) = object.meta("delivery_id") {
            match self.deliveries.find_by_id(delivery_id).await? {
                Some(delivery) => {
                    self.fulfillment
                        .transition_delivery(
                            &delivery.id,
                            FulfillmentStatus::Refunded,
                            TransitionMeta::default(),
                        )
                        .await?;
                    return Ok(ProcessOutcome::handled());
                }
                None => {
                    tracing::warn!(delivery_id, "refund for unknown delivery; swallowing");
                    return Ok(ProcessOutcome::skipped());
                }
            }
        }

        self.ambiguous(event, "refund without order_id or delivery_id").await
    }

    // ========== Routing helpers ==========

    async fn locate_delivery(
        &self,
        object: &EventObject,
    ) -> AppResult<Option<shared::models::DeliveryRequest>> {
        if let Some(id) = object.meta("delivery_id") {
            return Ok(self.deliveries.find_by_id(id).await?);
        }
        Ok(self.deliveries.find_by_payment_ref(&object.id).await?)
    }

    async fn locate_order(&self, object: &EventObject) -> AppResult<Option<shared::models::Order>> {
        if let Some(id) = object.meta("order_id") {
            return Ok(self.orders.find_by_id(id).await?);
        }
        Ok(self.orders.find_by_payment_ref(&object.id).await?)
    }

    /// Metadata needed for routing is absent: log + audit for manual
    /// reconciliation, still 200 to the gateway
    async fn ambiguous(&self, event: &WebhookEvent, reason: &str) -> AppResult<ProcessOutcome> {
        tracing::error!(
            event_id = %event.id,
            event_type = %event.event_type,
            reason,
            "ambiguous webhook event"
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::WebhookAmbiguous, "webhook", &event.id)
                    .with_details(json!({ "reason": reason, "type": event.event_type })),
            )
            .await;
        Ok(ProcessOutcome::skipped().warn(reason.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::RecordingAuditSink;
    use crate::db::MemoryStore;
    use crate::db::repository::DriverRepository;
    use crate::fulfillment::NewDelivery;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::models::{Driver, FeeEstimate};
    use shared::{Address, PriorityTier};

    const SECRET: &str = "whsec_test_secret";

    struct Fixture {
        store: Arc<MemoryStore>,
        processor: WebhookProcessor,
        fulfillment: FulfillmentService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let audit: Arc<dyn AuditSink> = Arc::new(RecordingAuditSink::default());
        let fulfillment = FulfillmentService::new(store.clone(), audit.clone());
        let fanout = NotificationFanout::new(store.clone(), audit.clone());
        let processor = WebhookProcessor::new(
            SECRET.to_string(),
            store.clone(),
            fulfillment.clone(),
            fanout,
            audit,
        );
        Fixture {
            store,
            processor,
            fulfillment,
        }
    }

    fn address(street: &str) -> Address {
        Address {
            street: street.to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            lat: None,
            lng: None,
        }
    }

    async fn seed_delivery(fx: &Fixture, payment_ref: &str) -> String {
        let delivery = fx
            .fulfillment
            .create_delivery(
                NewDelivery {
                    user_id: "u1".into(),
                    pickup: address("100 Main St"),
                    dropoff: address("5 Oak Ave"),
                    items: vec!["envelope".into()],
                    priority: PriorityTier::Standard,
                    contact_phone: "555-0100".into(),
                    notes: None,
                },
                FeeEstimate {
                    distance_meters: 3219,
                    duration_seconds: 600,
                    fee: Decimal::new(800, 2),
                    route_polyline: "p".into(),
                },
            )
            .await
            .unwrap();
        // Stamp the session reference the way checkout creation does
        let mut with_ref = delivery.clone();
        with_ref.payment_ref = Some(payment_ref.to_string());
        DeliveryRepository::new(fx.store.clone())
            .save(&with_ref)
            .await
            .unwrap();
        delivery.id
    }

    async fn seed_driver(fx: &Fixture, id: &str) {
        DriverRepository::new(fx.store.clone())
            .save(&Driver {
                id: id.to_string(),
                name: "D".into(),
                phone: "555-0199".into(),
                available: true,
                active: true,
                current_delivery_id: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    fn delivery_checkout_event(session_id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": CHECKOUT_COMPLETED,
            "data": { "object": {
                "id": session_id,
                "metadata": { "kind": "delivery" },
            }}
        }))
        .unwrap()
    }

    fn order_checkout_event(session_id: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": CHECKOUT_COMPLETED,
            "data": { "object": {
                "id": session_id,
                "metadata": { "user_id": "u9" },
                "line_items": [
                    { "name": "Burger", "unit_price": 9.99, "quantity": 2 }
                ],
            }}
        }))
        .unwrap()
    }

    async fn handle(fx: &Fixture, payload: &[u8]) -> ProcessOutcome {
        let sig = sign_payload(SECRET, payload);
        fx.processor.handle(payload, &sig).await.unwrap()
    }

    #[tokio::test]
    async fn bad_signature_rejected_before_parsing() {
        let fx = fixture();
        let payload = delivery_checkout_event("cs_1");
        let err = fx.processor.handle(&payload, "deadbeef").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn delivery_checkout_pays_and_fans_out() {
        let fx = fixture();
        let delivery_id = seed_delivery(&fx, "cs_1").await;
        seed_driver(&fx, "d1").await;

        let outcome = handle(&fx, &delivery_checkout_event("cs_1")).await;
        assert!(outcome.handled);
        assert!(outcome.warnings.is_empty());

        let delivery = DeliveryRepository::new(fx.store.clone())
            .find_by_id(&delivery_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.status, FulfillmentStatus::Paid);

        let notifications = crate::db::repository::NotificationRepository::new(fx.store.clone())
            .find_by_driver("d1")
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
    }

    #[tokio::test]
    async fn redelivered_delivery_event_does_not_refan_out() {
        let fx = fixture();
        seed_delivery(&fx, "cs_1").await;
        seed_driver(&fx, "d1").await;

        handle(&fx, &delivery_checkout_event("cs_1")).await;
        handle(&fx, &delivery_checkout_event("cs_1")).await;

        let notifications = crate::db::repository::NotificationRepository::new(fx.store.clone())
            .find_by_driver("d1")
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1, "duplicate event must not re-notify");
    }

    #[tokio::test]
    async fn order_checkout_creates_order_and_grants_one_spin() {
        let fx = fixture();
        let users = UserRepository::new(fx.store.clone());

        let outcome = handle(&fx, &order_checkout_event("cs_9")).await;
        assert!(outcome.handled);

        let order = OrderRepository::new(fx.store.clone())
            .find_by_payment_ref("cs_9")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, FulfillmentStatus::Paid);
        assert_eq!(order.total, Decimal::new(1998, 2));
        assert_eq!(users.get_spins("u9").await.unwrap(), 1);

        // Redelivery: no second order, no second spin
        handle(&fx, &order_checkout_event("cs_9")).await;
        assert_eq!(users.get_spins("u9").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn payment_failure_cancels_with_note() {
        let fx = fixture();
        let delivery_id = seed_delivery(&fx, "pi_1").await;

        let payload = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": PAYMENT_FAILED,
            "data": { "object": {
                "id": "pi_1",
                "metadata": { "delivery_id": delivery_id },
            }}
        }))
        .unwrap();
        let outcome = handle(&fx, &payload).await;
        assert!(outcome.handled);

        let delivery = DeliveryRepository::new(fx.store.clone())
            .find_by_id(&delivery_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.status, FulfillmentStatus::Cancelled);
        assert_eq!(delivery.notes.as_deref(), Some(PAYMENT_FAILED_NOTE));
    }

    #[tokio::test]
    async fn refund_without_metadata_is_ambiguous_but_ok() {
        let fx = fixture();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_4",
            "type": CHARGE_REFUNDED,
            "data": { "object": { "id": "ch_1" } }
        }))
        .unwrap();
        let outcome = handle(&fx, &payload).await;
        assert!(!outcome.handled);
        assert!(!outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn refund_routes_by_metadata() {
        let fx = fixture();
        let delivery_id = seed_delivery(&fx, "cs_1").await;
        handle(&fx, &delivery_checkout_event("cs_1")).await;

        let payload = serde_json::to_vec(&json!({
            "id": "evt_5",
            "type": CHARGE_REFUNDED,
            "data": { "object": {
                "id": "ch_2",
                "metadata": { "delivery_id": delivery_id },
            }}
        }))
        .unwrap();
        let outcome = handle(&fx, &payload).await;
        assert!(outcome.handled);

        let delivery = DeliveryRepository::new(fx.store.clone())
            .find_by_id(&delivery_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.status, FulfillmentStatus::Refunded);
        assert!(delivery.refunded_at.is_some());
    }

    #[tokio::test]
    async fn late_completion_after_cancellation_is_swallowed() {
        let fx = fixture();
        let delivery_id = seed_delivery(&fx, "cs_1").await;

        let failure = serde_json::to_vec(&json!({
            "id": "evt_7",
            "type": PAYMENT_FAILED,
            "data": { "object": {
                "id": "pi_1",
                "metadata": { "delivery_id": delivery_id },
            }}
        }))
        .unwrap();
        handle(&fx, &failure).await;

        // The completion was in flight when the failure cancelled the
        // delivery; it must not bounce back to the gateway
        let outcome = handle(&fx, &delivery_checkout_event("cs_1")).await;
        assert!(!outcome.handled);
        assert!(!outcome.warnings.is_empty());

        let delivery = DeliveryRepository::new(fx.store.clone())
            .find_by_id(&delivery_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivery.status, FulfillmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped() {
        let fx = fixture();
        let payload = serde_json::to_vec(&json!({
            "id": "evt_6",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        }))
        .unwrap();
        let outcome = handle(&fx, &payload).await;
        assert!(!outcome.handled);
        assert!(outcome.warnings.is_empty());
    }
}
