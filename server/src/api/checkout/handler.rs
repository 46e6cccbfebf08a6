//! Checkout API Handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use shared::models::LineItem;
use shared::{AppError, AppResponse, AppResult, ok};

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::repository::{MenuItemRepository, OrderRepository};
use crate::payments::CheckoutSessionRequest;

#[derive(Debug, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub cart_items: Vec<CartItem>,
    /// Defaults to the authenticated caller; differing values need
    /// operator privileges
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub order_id: String,
}

/// Validate the cart against the menu and open a checkout session
pub async fn create_checkout(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<AppResponse<CheckoutResponse>>> {
    let gateway = state
        .gateway
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("Payment gateway not configured"))?;

    if payload.cart_items.is_empty() {
        return Err(AppError::validation("Cart must not be empty"));
    }

    let user_id = match payload.user_id {
        Some(uid) if uid != user.id => {
            user.require_role(Role::Operator)?;
            uid
        }
        Some(uid) => uid,
        None => user.id.clone(),
    };

    let menu = MenuItemRepository::new(state.store.clone());
    let mut line_items = Vec::with_capacity(payload.cart_items.len());
    for cart_item in &payload.cart_items {
        if cart_item.quantity == 0 {
            return Err(AppError::validation(format!(
                "Item '{}' has zero quantity",
                cart_item.id
            )));
        }
        let item = menu
            .find_by_id(&cart_item.id)
            .await?
            .ok_or_else(|| AppError::validation(format!("Unknown menu item '{}'", cart_item.id)))?;
        if !item.available {
            return Err(AppError::validation(format!(
                "Menu item '{}' is not available",
                item.name
            )));
        }
        line_items.push(LineItem {
            name: item.name,
            unit_price: item.price,
            quantity: cart_item.quantity,
        });
    }

    let mut order = state
        .fulfillment
        .create_order(&user_id, line_items.clone(), None)
        .await?;

    let mut metadata = HashMap::new();
    metadata.insert("user_id".to_string(), user_id.clone());
    metadata.insert("order_id".to_string(), order.id.clone());

    let session = gateway
        .create_checkout_session(CheckoutSessionRequest {
            user_id,
            line_items,
            metadata,
        })
        .await?;

    // Stamp the session reference so webhook routing finds this order
    order.payment_ref = Some(session.id.clone());
    OrderRepository::new(state.store.clone()).save(&order).await?;

    tracing::info!(order_id = %order.id, session_id = %session.id, "checkout session opened");
    Ok(ok(CheckoutResponse {
        checkout_url: session.url,
        order_id: order.id,
    }))
}
