//! Screenshot Order API Handlers

use axum::{
    Json,
    extract::{Multipart, Query, State},
};
use image::DynamicImage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use shared::models::{ScreenshotOrder, status::ScreenshotStatus};
use shared::{AppError, AppResponse, AppResult, ok};

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::fulfillment::{NewScreenshotOrder, TransitionMeta};

/// Maximum screenshot size (5MB)
const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// JPEG quality for stored screenshots
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub order_id: String,
    pub order_code: String,
}

/// Decode-check the upload and re-encode it as JPEG
fn process_screenshot(data: &[u8]) -> AppResult<Vec<u8>> {
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::validation(format!(
            "Screenshot too large. Maximum size is {}MB",
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }
    let img: DynamicImage = image::load_from_memory(data)
        .map_err(|e| AppError::validation(format!("Screenshot is not a valid image: {e}")))?;

    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| AppError::internal(format!("Failed to encode screenshot: {e}")))?;
    }
    Ok(buffer)
}

/// Collected multipart fields
#[derive(Default)]
struct IntakeForm {
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    restaurant_name: Option<String>,
    pickup_location: Option<String>,
    estimated_total: Option<String>,
    special_instructions: Option<String>,
    screenshot: Option<Vec<u8>>,
}

fn required(value: Option<String>, field: &str) -> AppResult<String> {
    value.ok_or_else(|| AppError::validation(format!("Missing required field '{field}'")))
}

/// Public intake: submit a screenshot order
pub async fn submit(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> AppResult<Json<AppResponse<SubmitResponse>>> {
    let mut form = IntakeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart request: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "screenshot" => {
                // Cheap filename check first; the decode below is the
                // authoritative validation
                if let Some(filename) = field.file_name()
                    && let Some(mime) = mime_guess::from_path(filename).first()
                    && mime.type_() != mime_guess::mime::IMAGE
                {
                    return Err(AppError::validation(format!(
                        "screenshot must be an image, got '{mime}'"
                    )));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
                form.screenshot = Some(data.to_vec());
            }
            other => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?;
                match other {
                    "customerName" => form.customer_name = Some(text),
                    "customerPhone" => form.customer_phone = Some(text),
                    "customerEmail" => form.customer_email = Some(text),
                    "restaurantName" => form.restaurant_name = Some(text),
                    "pickupLocation" => form.pickup_location = Some(text),
                    "estimatedTotal" => form.estimated_total = Some(text),
                    "specialInstructions" => form.special_instructions = Some(text),
                    unknown => {
                        tracing::debug!(field = unknown, "ignoring unknown form field");
                    }
                }
            }
        }
    }

    let screenshot_data = form
        .screenshot
        .ok_or_else(|| AppError::validation("Missing required field 'screenshot'"))?;
    if screenshot_data.is_empty() {
        return Err(AppError::validation("Empty screenshot upload"));
    }
    let estimated_total: Decimal = required(form.estimated_total, "estimatedTotal")?
        .trim()
        .parse()
        .map_err(|_| AppError::validation("estimatedTotal must be a decimal amount"))?;

    let compressed = process_screenshot(&screenshot_data)?;

    // Persist under a content-hash name: duplicate uploads share one file
    let dir = PathBuf::from(&state.config.upload_dir).join("screenshots");
    fs::create_dir_all(&dir)
        .map_err(|e| AppError::internal(format!("Failed to create upload dir: {e}")))?;
    let hash = hex::encode(Sha256::digest(&compressed));
    let filename = format!("{hash}.jpg");
    let path = dir.join(&filename);
    if !path.exists() {
        fs::write(&path, &compressed)
            .map_err(|e| AppError::internal(format!("Failed to save screenshot: {e}")))?;
    }

    let order = state
        .fulfillment
        .create_screenshot_order(NewScreenshotOrder {
            customer_name: required(form.customer_name, "customerName")?,
            customer_phone: required(form.customer_phone, "customerPhone")?,
            customer_email: required(form.customer_email, "customerEmail")?,
            restaurant_name: required(form.restaurant_name, "restaurantName")?,
            pickup_location: required(form.pickup_location, "pickupLocation")?,
            estimated_total,
            screenshot_ref: filename,
            special_instructions: form.special_instructions,
        })
        .await?;

    tracing::info!(order_id = %order.id, order_code = %order.order_code, "screenshot order submitted");
    Ok(ok(SubmitResponse {
        order_id: order.id,
        order_code: order.order_code,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// List screenshot orders, newest first (operator view)
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<AppResponse<Vec<ScreenshotOrder>>>> {
    user.require_role(Role::Operator)?;

    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ScreenshotStatus>()
                .map_err(|_| AppError::validation(format!("Unknown status '{s}'")))
        })
        .transpose()?;

    let orders = crate::db::repository::ScreenshotOrderRepository::new(state.store.clone())
        .list(status, query.limit.min(500))
        .await?;
    Ok(ok(orders))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub admin_id: Option<String>,
}

/// Transition a screenshot order through its workflow
pub async fn transition(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<TransitionRequest>,
) -> AppResult<Json<AppResponse<ScreenshotOrder>>> {
    user.require_role(Role::Operator)?;

    let target: ScreenshotStatus = payload
        .status
        .parse()
        .map_err(|_| AppError::invalid_transition(format!("Unknown status '{}'", payload.status)))?;

    let meta = TransitionMeta {
        notes: payload.notes,
        operator_id: Some(payload.admin_id.unwrap_or_else(|| user.id.clone())),
        ..Default::default()
    };
    let order = state
        .fulfillment
        .transition_screenshot(&payload.order_id, target, meta)
        .await?;
    Ok(ok(order))
}
