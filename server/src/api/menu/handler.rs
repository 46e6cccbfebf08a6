//! Menu Admin API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;

use shared::{AppResponse, AppResult, ok};

use crate::auth::{CurrentUser, Role};
use crate::bulk::{BulkItem, BulkOperation, BulkOperationResult};
use crate::core::ServerState;

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub operation: BulkOperation,
    pub items: Vec<BulkItem>,
}

/// Bulk update/delete over the menu collection (admin only)
pub async fn bulk(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<BulkRequest>,
) -> AppResult<Json<AppResponse<BulkOperationResult>>> {
    user.require_role(Role::Admin)?;
    let result = state
        .bulk
        .apply(payload.operation, payload.items, &user.id)
        .await?;
    Ok(ok(result))
}
