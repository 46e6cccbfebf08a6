//! Delivery API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use shared::models::{DeliveryRequest, FeeEstimate, LineItem, status::FulfillmentStatus};
use shared::{Address, AppError, AppResponse, AppResult, PriorityTier, ok};

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::repository::{DeliveryRepository, DriverRepository};
use crate::fulfillment::{NewDelivery, TransitionMeta};
use crate::payments::{CheckoutSessionRequest, KIND_DELIVERY};

fn parse_tier(tier: &str) -> AppResult<PriorityTier> {
    tier.parse()
        .map_err(|_| AppError::validation(format!("Unknown priority tier '{tier}'")))
}

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub pickup: Address,
    pub dropoff: Address,
    #[serde(default = "default_tier")]
    pub priority: String,
}

fn default_tier() -> String {
    "standard".to_string()
}

/// Quote a delivery fee without creating a record
pub async fn estimate(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(payload): Json<EstimateRequest>,
) -> AppResult<Json<AppResponse<FeeEstimate>>> {
    let tier = parse_tier(&payload.priority)?;
    let estimate = state
        .estimator
        .estimate(&payload.pickup, &payload.dropoff, tier)
        .await?;
    Ok(ok(estimate))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequest {
    pub pickup: Address,
    pub dropoff: Address,
    pub items: Vec<String>,
    #[serde(default = "default_tier")]
    pub priority: String,
    pub contact_phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResponse {
    pub delivery: DeliveryRequest,
    /// Present when the payment gateway is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

/// Create a delivery request with a frozen fee estimate
///
/// When the gateway is configured a checkout session tagged as a
/// delivery payment is opened in the same call, so the webhook can route
/// the completed payment back to this record.
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateRequest>,
) -> AppResult<Json<AppResponse<CreateResponse>>> {
    let tier = parse_tier(&payload.priority)?;
    let estimate = state
        .estimator
        .estimate(&payload.pickup, &payload.dropoff, tier)
        .await?;

    let mut delivery = state
        .fulfillment
        .create_delivery(
            NewDelivery {
                user_id: user.id.clone(),
                pickup: payload.pickup,
                dropoff: payload.dropoff,
                items: payload.items,
                priority: tier,
                contact_phone: payload.contact_phone,
                notes: payload.notes,
            },
            estimate,
        )
        .await?;

    let mut checkout_url = None;
    if let Some(gateway) = &state.gateway {
        let mut metadata = HashMap::new();
        metadata.insert("kind".to_string(), KIND_DELIVERY.to_string());
        metadata.insert("delivery_id".to_string(), delivery.id.clone());
        metadata.insert("user_id".to_string(), user.id.clone());

        let session = gateway
            .create_checkout_session(CheckoutSessionRequest {
                user_id: user.id.clone(),
                line_items: vec![LineItem {
                    name: "Delivery fee".to_string(),
                    unit_price: delivery.estimate.fee,
                    quantity: 1,
                }],
                metadata,
            })
            .await?;

        delivery.payment_ref = Some(session.id);
        DeliveryRepository::new(state.store.clone())
            .save(&delivery)
            .await?;
        checkout_url = Some(session.url);
    }

    tracing::info!(delivery_id = %delivery.id, fee = %delivery.estimate.fee, "delivery created");
    Ok(ok(CreateResponse {
        delivery,
        checkout_url,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: String,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Admin escape hatch for backward moves
    #[serde(default)]
    pub force: bool,
}

/// Operator transition endpoint
pub async fn transition(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<AppResponse<DeliveryRequest>>> {
    user.require_role(Role::Operator)?;
    if payload.force {
        user.require_role(Role::Admin)?;
    }

    let target: FulfillmentStatus = payload
        .status
        .parse()
        .map_err(|_| AppError::invalid_transition(format!("Unknown status '{}'", payload.status)))?;

    let delivery = state
        .fulfillment
        .transition_delivery(
            &id,
            target,
            TransitionMeta {
                notes: payload.notes,
                driver_id: payload.driver_id,
                operator_id: Some(user.id),
                force: payload.force,
            },
        )
        .await?;
    Ok(ok(delivery))
}

/// Driver self-assignment: paid -> assigned
///
/// Marks the driver unavailable so they drop out of subsequent fanouts
/// until this delivery is done.
pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<DeliveryRequest>>> {
    user.require_role(Role::Driver)?;

    let drivers = DriverRepository::new(state.store.clone());
    let mut driver = drivers
        .find_by_id(&user.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Driver profile {}", user.id)))?;
    if !driver.is_eligible() {
        return Err(AppError::conflict("Driver is not available for assignment"));
    }

    let delivery = state
        .fulfillment
        .transition_delivery(
            &id,
            FulfillmentStatus::Assigned,
            TransitionMeta {
                driver_id: Some(driver.id.clone()),
                operator_id: Some(user.id.clone()),
                ..Default::default()
            },
        )
        .await?;

    driver.available = false;
    driver.current_delivery_id = Some(delivery.id.clone());
    driver.updated_at = Utc::now();
    drivers.save(&driver).await?;

    tracing::info!(delivery_id = %delivery.id, driver_id = %driver.id, "delivery accepted");
    Ok(ok(delivery))
}
