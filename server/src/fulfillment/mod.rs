//! Order / delivery state machine
//!
//! Single mutation entry point for every status-bearing record. Handlers
//! and the webhook processor never set a status field directly; they go
//! through [`FulfillmentService::transition_*`], which owns the
//! transition table, the idempotent no-op rule and the timestamp/flag
//! side effects.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use shared::models::{
    DeliveryRequest, FeeEstimate, LineItem, Order, ScreenshotOrder, WorkflowFlags,
    status::{FulfillmentStatus, ScreenshotStatus},
};
use shared::{Address, AppError, AppResult, PriorityTier};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::db::StoreHandle;
use crate::db::repository::{DeliveryRepository, OrderRepository, ScreenshotOrderRepository};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_address, validate_optional_text,
    validate_required_text,
};

/// Transition side data
#[derive(Debug, Default, Clone)]
pub struct TransitionMeta {
    pub notes: Option<String>,
    /// Driver being assigned (required for `assigned`)
    pub driver_id: Option<String>,
    /// Operator performing the transition, for the audit trail
    pub operator_id: Option<String>,
    /// Admin escape hatch: allows backward moves, never exits terminal states
    pub force: bool,
}

impl TransitionMeta {
    pub fn with_notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Default::default()
        }
    }
}

/// New delivery request input, validated on create
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub user_id: String,
    pub pickup: Address,
    pub dropoff: Address,
    pub items: Vec<String>,
    pub priority: PriorityTier,
    pub contact_phone: String,
    pub notes: Option<String>,
}

/// New screenshot order intake, validated on create
#[derive(Debug, Clone)]
pub struct NewScreenshotOrder {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub restaurant_name: String,
    pub pickup_location: String,
    pub estimated_total: rust_decimal::Decimal,
    pub screenshot_ref: String,
    pub special_instructions: Option<String>,
}

/// Fulfillment state machine service
#[derive(Clone)]
pub struct FulfillmentService {
    orders: OrderRepository,
    deliveries: DeliveryRepository,
    screenshots: ScreenshotOrderRepository,
    audit: Arc<dyn AuditSink>,
}

impl FulfillmentService {
    pub fn new(store: StoreHandle, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            orders: OrderRepository::new(store.clone()),
            deliveries: DeliveryRepository::new(store.clone()),
            screenshots: ScreenshotOrderRepository::new(store),
            audit,
        }
    }

    // ========== Creation ==========

    /// Create an order from priced line items
    pub async fn create_order(
        &self,
        user_id: &str,
        items: Vec<LineItem>,
        payment_ref: Option<String>,
    ) -> AppResult<Order> {
        if items.is_empty() {
            return Err(AppError::validation("Order must contain at least one item"));
        }
        for item in &items {
            validate_required_text(&item.name, "item.name", MAX_NAME_LEN)?;
            if item.quantity == 0 {
                return Err(AppError::validation(format!(
                    "Item '{}' has zero quantity",
                    item.name
                )));
            }
            if item.unit_price.is_sign_negative() {
                return Err(AppError::validation(format!(
                    "Item '{}' has a negative price",
                    item.name
                )));
            }
        }

        let now = Utc::now();
        let order = Order {
            id: format!("ord_{}", Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            total: Order::computed_total(&items),
            items,
            status: FulfillmentStatus::PendingPayment,
            payment_ref,
            notes: None,
            created_at: now,
            updated_at: now,
            refunded_at: None,
        };
        self.orders.create(&order).await?;
        Ok(order)
    }

    /// Create a delivery request with its frozen fee estimate
    pub async fn create_delivery(
        &self,
        input: NewDelivery,
        estimate: FeeEstimate,
    ) -> AppResult<DeliveryRequest> {
        validate_address(&input.pickup, "pickup")?;
        validate_address(&input.dropoff, "dropoff")?;
        validate_required_text(&input.contact_phone, "contact_phone", MAX_SHORT_TEXT_LEN)?;
        validate_optional_text(&input.notes, "notes", MAX_NOTE_LEN)?;
        if input.items.is_empty() {
            return Err(AppError::validation("Delivery must carry at least one item"));
        }

        let now = Utc::now();
        let delivery = DeliveryRequest {
            id: format!("del_{}", Uuid::new_v4().simple()),
            user_id: input.user_id,
            pickup: input.pickup,
            dropoff: input.dropoff,
            items: input.items,
            priority: input.priority,
            estimate,
            status: FulfillmentStatus::PendingPayment,
            payment_ref: None,
            driver_id: None,
            contact_phone: input.contact_phone,
            notes: input.notes,
            created_at: now,
            updated_at: now,
            refunded_at: None,
        };
        self.deliveries.create(&delivery).await?;
        Ok(delivery)
    }

    /// Create a screenshot order from public intake
    pub async fn create_screenshot_order(
        &self,
        input: NewScreenshotOrder,
    ) -> AppResult<ScreenshotOrder> {
        validate_required_text(&input.customer_name, "customerName", MAX_NAME_LEN)?;
        validate_required_text(&input.customer_phone, "customerPhone", MAX_SHORT_TEXT_LEN)?;
        validate_required_text(&input.customer_email, "customerEmail", MAX_SHORT_TEXT_LEN)?;
        if !input.customer_email.validate_email() {
            return Err(AppError::validation("customerEmail is not a valid email address"));
        }
        validate_required_text(&input.restaurant_name, "restaurantName", MAX_NAME_LEN)?;
        validate_required_text(&input.pickup_location, "pickupLocation", MAX_NOTE_LEN)?;
        validate_optional_text(&input.special_instructions, "specialInstructions", MAX_NOTE_LEN)?;
        if input.estimated_total.is_sign_negative() {
            return Err(AppError::validation("estimatedTotal must not be negative"));
        }

        let now = Utc::now();
        let order = ScreenshotOrder {
            id: format!("so_{}", Uuid::new_v4().simple()),
            order_code: generate_order_code(),
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            customer_email: input.customer_email,
            restaurant_name: input.restaurant_name,
            pickup_location: input.pickup_location,
            estimated_total: input.estimated_total,
            screenshot_ref: input.screenshot_ref,
            special_instructions: input.special_instructions,
            status: ScreenshotStatus::PendingReview,
            workflow: WorkflowFlags {
                review_required: true,
                ..Default::default()
            },
            admin_notes: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        self.screenshots.create(&order).await?;
        Ok(order)
    }

    // ========== Transitions ==========

    /// Advance an order
    pub async fn transition_order(
        &self,
        id: &str,
        target: FulfillmentStatus,
        meta: TransitionMeta,
    ) -> AppResult<Order> {
        let mut order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {id}")))?;

        if order.status == target {
            return Ok(order); // idempotent no-op
        }
        check_transition("order", id, order.status, target, &meta)?;

        let from = order.status;
        order.status = target;
        order.updated_at = Utc::now();
        if let Some(notes) = &meta.notes {
            order.notes = Some(notes.clone());
        }
        if target == FulfillmentStatus::Refunded {
            order.refunded_at = Some(order.updated_at);
        }
        self.orders.save(&order).await?;
        self.audit_transition("order", id, from, target, &meta).await;
        Ok(order)
    }

    /// Advance a delivery request
    pub async fn transition_delivery(
        &self,
        id: &str,
        target: FulfillmentStatus,
        meta: TransitionMeta,
    ) -> AppResult<DeliveryRequest> {
        let mut delivery = self
            .deliveries
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Delivery {id}")))?;

        if delivery.status == target {
            return Ok(delivery);
        }
        check_transition("delivery", id, delivery.status, target, &meta)?;

        if target == FulfillmentStatus::Assigned {
            let driver_id = meta
                .driver_id
                .clone()
                .ok_or_else(|| AppError::validation("driver_id required for assignment"))?;
            delivery.driver_id = Some(driver_id);
        }

        let from = delivery.status;
        delivery.status = target;
        delivery.updated_at = Utc::now();
        if let Some(notes) = &meta.notes {
            delivery.notes = Some(notes.clone());
        }
        if target == FulfillmentStatus::Refunded {
            delivery.refunded_at = Some(delivery.updated_at);
        }
        self.deliveries.save(&delivery).await?;
        self.audit_transition("delivery", id, from, target, &meta).await;
        Ok(delivery)
    }

    /// Advance a screenshot order, flipping its monotonic workflow flag
    pub async fn transition_screenshot(
        &self,
        id: &str,
        target: ScreenshotStatus,
        meta: TransitionMeta,
    ) -> AppResult<ScreenshotOrder> {
        let mut order = self
            .screenshots
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("ScreenshotOrder {id}")))?;

        if order.status == target {
            return Ok(order);
        }
        if order.status.is_terminal() {
            return Err(AppError::invalid_transition(format!(
                "ScreenshotOrder {id} is terminal ({})",
                order.status
            )));
        }
        if !order.status.can_transition_to(target) && !meta.force {
            return Err(AppError::invalid_transition(format!(
                "Cannot move screenshot order {id} from {} to {target}",
                order.status
            )));
        }

        let from = order.status;
        order.status = target;
        order.workflow.mark(target);
        order.updated_at = Utc::now();
        if let Some(notes) = &meta.notes {
            order.admin_notes = Some(notes.clone());
        }
        order.updated_by = meta.operator_id.clone();
        self.screenshots.save(&order).await?;

        self.audit
            .record(
                AuditEntry::new(AuditAction::ScreenshotOrderUpdated, "screenshot_order", id)
                    .with_operator(meta.operator_id.unwrap_or_default())
                    .with_details(json!({ "from": from.as_str(), "to": target.as_str() })),
            )
            .await;
        Ok(order)
    }

    async fn audit_transition(
        &self,
        resource_type: &str,
        id: &str,
        from: FulfillmentStatus,
        to: FulfillmentStatus,
        meta: &TransitionMeta,
    ) {
        let action = if meta.force {
            AuditAction::ForcedTransition
        } else {
            AuditAction::StatusTransition
        };
        let mut entry = AuditEntry::new(action, resource_type, id)
            .with_details(json!({ "from": from.as_str(), "to": to.as_str() }));
        if let Some(op) = &meta.operator_id {
            entry = entry.with_operator(op.clone());
        }
        self.audit.record(entry).await;
    }
}

/// Shared transition guard for orders and deliveries
fn check_transition(
    resource: &str,
    id: &str,
    from: FulfillmentStatus,
    to: FulfillmentStatus,
    meta: &TransitionMeta,
) -> AppResult<()> {
    if from.is_terminal() {
        // Terminal states are never exited, forced or not
        return Err(AppError::invalid_transition(format!(
            "{resource} {id} is terminal ({from})"
        )));
    }
    if !from.can_transition_to(to) && !meta.force {
        return Err(AppError::invalid_transition(format!(
            "Cannot move {resource} {id} from {from} to {to}"
        )));
    }
    Ok(())
}

/// Human-facing order code: SO- followed by six uppercase alphanumerics
fn generate_order_code() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let code: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("SO-{code}")
}
