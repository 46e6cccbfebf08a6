//! Document store boundary
//!
//! The durable store is an external collaborator; the core consumes it
//! through the narrow [`DocumentStore`] trait only. The in-process
//! [`MemoryStore`] backend ships with the server; a durable backend slots
//! in behind the same trait without touching call sites.
//!
//! Collections are flat id -> JSON document maps. Queries are top-level
//! field equality, which is all the core needs (eligible drivers, records
//! by payment reference, screenshot orders by status).

pub mod memory;
pub mod repository;

pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Collection names
pub mod collections {
    pub const ORDERS: &str = "orders";
    pub const DELIVERIES: &str = "deliveries";
    pub const SCREENSHOT_ORDERS: &str = "screenshot_orders";
    pub const DRIVERS: &str = "drivers";
    pub const MENU_ITEMS: &str = "menu_items";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const USERS: &str = "users";
}

/// Maximum number of writes the store accepts in one atomic batch
pub const MAX_BATCH_SIZE: usize = 500;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Batch too large: {0} ops (max {MAX_BATCH_SIZE})")]
    BatchTooLarge(usize),

    #[error("Batch commit failed: {0}")]
    BatchFailed(String),

    #[error("Store error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// One write inside an atomic batch
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put {
        collection: String,
        id: String,
        doc: Value,
    },
    Merge {
        collection: String,
        id: String,
        patch: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Top-level field equality filter
pub type Filter = Vec<(String, Value)>;

/// Narrow interface over the external document store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Create or replace a document
    async fn put(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()>;

    /// Shallow-merge a patch into an existing document (creates if absent)
    async fn merge(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()>;

    /// Delete a document; deleting a missing document is a no-op
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Whether a document exists
    async fn exists(&self, collection: &str, id: &str) -> StoreResult<bool> {
        Ok(self.get(collection, id).await?.is_some())
    }

    /// All documents whose top-level fields equal every filter entry
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Value>>;

    /// Commit a batch atomically: either every op applies or none does
    async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()>;

    /// The store's atomic batch-write limit
    fn max_batch_size(&self) -> usize {
        MAX_BATCH_SIZE
    }
}

/// Shared handle used throughout the server
pub type StoreHandle = Arc<dyn DocumentStore>;
