//! Payment gateway boundary
//!
//! The gateway charges the customer and calls back through the webhook;
//! the core only asks it to open checkout sessions. Consumed through the
//! [`PaymentGateway`] trait so tests run against a fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use shared::AppError;
use shared::models::LineItem;

/// Checkout session creation input
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionRequest {
    pub user_id: String,
    pub line_items: Vec<LineItem>,
    /// Routing metadata echoed back on webhook events
    pub metadata: HashMap<String, String>,
}

/// Opened checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Narrow interface over the external payment gateway
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session for the given cart
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AppError>;
}

/// HTTP payment gateway client
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, AppError> {
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Payment gateway unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::upstream(format!(
                "Payment gateway returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Malformed gateway response: {e}")))
    }
}
