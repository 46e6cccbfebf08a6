//! Repository Module
//!
//! Typed access to the document-store collections. One repository per
//! collection; each holds a shared [`StoreHandle`] and maps between the
//! store's JSON documents and the `shared` model types.

// Fulfillment
pub mod delivery;
pub mod order;
pub mod screenshot;

// Fleet
pub mod driver;
pub mod notification;

// Catalog
pub mod menu_item;

// Loyalty
pub mod user;

// Re-exports
pub use delivery::DeliveryRepository;
pub use driver::DriverRepository;
pub use menu_item::MenuItemRepository;
pub use notification::NotificationRepository;
pub use order::OrderRepository;
pub use screenshot::ScreenshotOrderRepository;
pub use user::UserRepository;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use super::StoreError;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => RepoError::NotFound(msg),
            other => RepoError::Store(other.to_string()),
        }
    }
}

impl From<RepoError> for shared::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => shared::AppError::not_found(msg),
            RepoError::Duplicate(msg) => shared::AppError::conflict(msg),
            other => shared::AppError::database(other.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Serialize a model into a store document
pub(crate) fn to_doc<T: Serialize>(value: &T) -> RepoResult<Value> {
    serde_json::to_value(value).map_err(|e| RepoError::Serialization(e.to_string()))
}

/// Deserialize a store document into a model
pub(crate) fn from_doc<T: DeserializeOwned>(doc: Value) -> RepoResult<T> {
    serde_json::from_value(doc).map_err(|e| RepoError::Serialization(e.to_string()))
}
