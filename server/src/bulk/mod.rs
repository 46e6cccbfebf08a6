//! Bulk menu mutations
//!
//! Admin-side chunked writes against the menu catalog. One call carries up
//! to [`MAX_BULK_ITEMS`] items; they are validated per item, committed in
//! chunks of the store's batch limit, and accounted for individually. A
//! bad item never blocks its chunk, it just lands in `failed`; a failed
//! chunk commit demotes that chunk's tentative successes the same way.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use shared::models::{MenuItem, MenuItemPatch};
use shared::{AppError, AppResult};

use crate::audit::{AuditAction, AuditEntry, AuditSink};
use crate::db::repository::MenuItemRepository;
use crate::db::{BatchOp, StoreHandle, collections};

/// Maximum items accepted in one bulk call
pub const MAX_BULK_ITEMS: usize = 1000;

/// Failure reason recorded when a chunk commit fails as a whole
const CHUNK_COMMIT_FAILED: &str = "Batch commit failed";

/// Bulk operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkOperation {
    Update,
    Delete,
}

/// One item inside a bulk request
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    pub id: String,
    /// Update payload; ignored for deletes
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkSuccess {
    pub id: String,
    /// Applied payload echoed back to the caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkFailure {
    pub id: String,
    pub error: String,
}

/// Per-call accounting: every requested id lands in exactly one list
#[derive(Debug, Default, Serialize)]
pub struct BulkOperationResult {
    pub success: Vec<BulkSuccess>,
    pub failed: Vec<BulkFailure>,
}

/// Bulk mutation processor
#[derive(Clone)]
pub struct BulkMutationProcessor {
    store: StoreHandle,
    menu_items: MenuItemRepository,
    audit: Arc<dyn AuditSink>,
}

impl BulkMutationProcessor {
    pub fn new(store: StoreHandle, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            menu_items: MenuItemRepository::new(store.clone()),
            store,
            audit,
        }
    }

    /// Apply one bulk operation over the menu catalog
    ///
    /// Per-item failures are reported, not raised; the call itself errors
    /// only when the request shape is invalid or when every single item
    /// failed.
    pub async fn apply(
        &self,
        operation: BulkOperation,
        items: Vec<BulkItem>,
        operator_id: &str,
    ) -> AppResult<BulkOperationResult> {
        if items.is_empty() {
            return Err(AppError::validation("items must not be empty"));
        }
        if items.len() > MAX_BULK_ITEMS {
            return Err(AppError::validation(format!(
                "Too many items: {} (max {MAX_BULK_ITEMS})",
                items.len()
            )));
        }

        let requested = items.len();
        let chunk_size = self.store.max_batch_size();
        let mut result = BulkOperationResult::default();

        for chunk in items.chunks(chunk_size) {
            self.apply_chunk(operation, chunk, &mut result).await;
        }

        tracing::info!(
            ?operation,
            requested,
            succeeded = result.success.len(),
            failed = result.failed.len(),
            "bulk mutation applied"
        );
        self.audit
            .record(
                AuditEntry::new(AuditAction::BulkMutation, "menu_item", "-")
                    .with_operator(operator_id)
                    .with_details(json!({
                        "operation": operation,
                        "requested": requested,
                        "succeeded": result.success.len(),
                        "failed": result.failed.len(),
                    })),
            )
            .await;

        if result.success.is_empty() {
            let sample: Vec<&str> = result.failed.iter().take(3).map(|f| f.error.as_str()).collect();
            return Err(AppError::validation(format!(
                "All {} operations failed (e.g. {})",
                result.failed.len(),
                sample.join("; ")
            )));
        }
        Ok(result)
    }

    /// Validate and commit one chunk
    ///
    /// Invalid items are excluded before the commit; the survivors commit
    /// atomically. A failed commit turns every survivor into a failure.
    async fn apply_chunk(
        &self,
        operation: BulkOperation,
        chunk: &[BulkItem],
        result: &mut BulkOperationResult,
    ) {
        let mut ops: Vec<BatchOp> = Vec::with_capacity(chunk.len());
        let mut tentative: Vec<BulkSuccess> = Vec::with_capacity(chunk.len());

        for item in chunk {
            match self.prepare(operation, item).await {
                Ok(op) => {
                    ops.push(op);
                    tentative.push(BulkSuccess {
                        id: item.id.clone(),
                        data: item.data.clone(),
                    });
                }
                Err(error) => result.failed.push(BulkFailure {
                    id: item.id.clone(),
                    error,
                }),
            }
        }

        if ops.is_empty() {
            return;
        }
        match self.store.commit_batch(ops).await {
            Ok(()) => result.success.append(&mut tentative),
            Err(e) => {
                tracing::error!(error = %e, demoted = tentative.len(), "bulk chunk commit failed");
                result.failed.extend(tentative.into_iter().map(|s| BulkFailure {
                    id: s.id,
                    error: CHUNK_COMMIT_FAILED.to_string(),
                }));
            }
        }
    }

    /// Turn one item into a batch op, or a per-item failure reason
    async fn prepare(&self, operation: BulkOperation, item: &BulkItem) -> Result<BatchOp, String> {
        if item.id.trim().is_empty() {
            return Err("Missing item id".to_string());
        }

        match operation {
            BulkOperation::Delete => {
                let exists = self
                    .menu_items
                    .exists(&item.id)
                    .await
                    .map_err(|e| e.to_string())?;
                if !exists {
                    return Err("Menu item not found".to_string());
                }
                Ok(BatchOp::Delete {
                    collection: collections::MENU_ITEMS.to_string(),
                    id: item.id.clone(),
                })
            }
            BulkOperation::Update => {
                let data = item
                    .data
                    .clone()
                    .ok_or_else(|| "Missing update payload".to_string())?;
                // deny_unknown_fields makes this the schema check
                let patch: MenuItemPatch = serde_json::from_value(data)
                    .map_err(|e| format!("Invalid update payload: {e}"))?;
                if patch.is_empty() {
                    return Err("Empty update payload".to_string());
                }
                if let Some(price) = patch.price
                    && price.is_sign_negative()
                {
                    return Err("price must not be negative".to_string());
                }
                if let Some(name) = &patch.name
                    && name.trim().is_empty()
                {
                    return Err("name must not be blank".to_string());
                }

                let mut current: MenuItem = self
                    .menu_items
                    .find_by_id(&item.id)
                    .await
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| "Menu item not found".to_string())?;
                patch.apply_to(&mut current);

                let doc = serde_json::to_value(&current)
                    .map_err(|e| format!("Serialization failed: {e}"))?;
                Ok(BatchOp::Put {
                    collection: collections::MENU_ITEMS.to_string(),
                    id: item.id.clone(),
                    doc,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::RecordingAuditSink;
    use crate::db::{DocumentStore, Filter, MemoryStore, StoreError, StoreResult};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn menu_item(id: &str) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            name: format!("Item {id}"),
            price: Decimal::new(999, 2),
            category: Some("mains".to_string()),
            available: true,
        }
    }

    async fn seeded(n: usize) -> (Arc<MemoryStore>, BulkMutationProcessor) {
        let store = Arc::new(MemoryStore::new());
        let repo = MenuItemRepository::new(store.clone());
        for i in 0..n {
            repo.save(&menu_item(&format!("m{i}"))).await.unwrap();
        }
        let processor =
            BulkMutationProcessor::new(store.clone(), Arc::new(RecordingAuditSink::default()));
        (store, processor)
    }

    #[tokio::test]
    async fn update_applies_patch_and_echoes_data() {
        let (store, processor) = seeded(2).await;
        let result = processor
            .apply(
                BulkOperation::Update,
                vec![BulkItem {
                    id: "m0".into(),
                    data: Some(json!({ "price": 12.5, "available": false })),
                }],
                "admin_1",
            )
            .await
            .unwrap();

        assert_eq!(result.success.len(), 1);
        assert!(result.failed.is_empty());
        assert_eq!(result.success[0].data, Some(json!({ "price": 12.5, "available": false })));

        let updated = MenuItemRepository::new(store)
            .find_by_id("m0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, Decimal::new(125, 1));
        assert!(!updated.available);
        assert_eq!(updated.name, "Item m0"); // untouched field survives
    }

    #[tokio::test]
    async fn malformed_item_fails_alone() {
        let (_, processor) = seeded(3).await;
        let result = processor
            .apply(
                BulkOperation::Update,
                vec![
                    BulkItem {
                        id: "m0".into(),
                        data: Some(json!({ "available": false })),
                    },
                    BulkItem {
                        id: "m1".into(),
                        data: Some(json!({ "pricee": 1.0 })), // unknown field
                    },
                    BulkItem {
                        id: "m2".into(),
                        data: None,
                    },
                ],
                "admin_1",
            )
            .await
            .unwrap();

        assert_eq!(result.success.len() + result.failed.len(), 3);
        assert_eq!(result.success.len(), 1);
        assert_eq!(result.success[0].id, "m0");
        let failed_ids: Vec<&str> = result.failed.iter().map(|f| f.id.as_str()).collect();
        assert!(failed_ids.contains(&"m1"));
        assert!(failed_ids.contains(&"m2"));
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_per_item_failure() {
        let (store, processor) = seeded(1).await;
        let result = processor
            .apply(
                BulkOperation::Delete,
                vec![
                    BulkItem { id: "m0".into(), data: None },
                    BulkItem { id: "ghost".into(), data: None },
                ],
                "admin_1",
            )
            .await
            .unwrap();

        assert_eq!(result.success.len(), 1);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].id, "ghost");
        assert_eq!(result.failed[0].error, "Menu item not found");
        assert!(
            !MenuItemRepository::new(store).exists("m0").await.unwrap(),
            "deleted item must be gone"
        );
    }

    #[tokio::test]
    async fn all_failures_turn_into_a_call_error() {
        let (_, processor) = seeded(0).await;
        let err = processor
            .apply(
                BulkOperation::Delete,
                vec![BulkItem { id: "ghost".into(), data: None }],
                "admin_1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn over_limit_request_is_rejected_up_front() {
        let (_, processor) = seeded(0).await;
        let items: Vec<BulkItem> = (0..=MAX_BULK_ITEMS)
            .map(|i| BulkItem { id: format!("m{i}"), data: None })
            .collect();
        let err = processor
            .apply(BulkOperation::Delete, items, "admin_1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    /// Store wrapper that counts batch commits
    struct CountingStore {
        inner: MemoryStore,
        commits: AtomicUsize,
        fail_all: bool,
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn get(&self, c: &str, id: &str) -> StoreResult<Option<Value>> {
            self.inner.get(c, id).await
        }
        async fn put(&self, c: &str, id: &str, doc: Value) -> StoreResult<()> {
            self.inner.put(c, id, doc).await
        }
        async fn merge(&self, c: &str, id: &str, patch: Value) -> StoreResult<()> {
            self.inner.merge(c, id, patch).await
        }
        async fn delete(&self, c: &str, id: &str) -> StoreResult<()> {
            self.inner.delete(c, id).await
        }
        async fn find(&self, c: &str, f: &Filter, l: Option<usize>) -> StoreResult<Vec<Value>> {
            self.inner.find(c, f, l).await
        }
        async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            if self.fail_all {
                return Err(StoreError::BatchFailed("injected".into()));
            }
            self.inner.commit_batch(ops).await
        }
    }

    #[tokio::test]
    async fn six_hundred_deletes_commit_in_two_chunks() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            commits: AtomicUsize::new(0),
            fail_all: false,
        });
        let repo = MenuItemRepository::new(store.clone());
        for i in 0..600 {
            repo.save(&menu_item(&format!("m{i}"))).await.unwrap();
        }

        let processor =
            BulkMutationProcessor::new(store.clone(), Arc::new(RecordingAuditSink::default()));
        let items: Vec<BulkItem> = (0..600)
            .map(|i| BulkItem { id: format!("m{i}"), data: None })
            .collect();
        let result = processor
            .apply(BulkOperation::Delete, items, "admin_1")
            .await
            .unwrap();

        assert_eq!(store.commits.load(Ordering::SeqCst), 2);
        assert_eq!(result.success.len(), 600);
        assert!(result.failed.is_empty());

        // every id exactly once
        let mut ids: Vec<&str> = result.success.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 600);
    }

    #[tokio::test]
    async fn failed_chunk_commit_demotes_its_successes() {
        let store = Arc::new(CountingStore {
            inner: MemoryStore::new(),
            commits: AtomicUsize::new(0),
            fail_all: true,
        });
        MenuItemRepository::new(store.clone())
            .save(&menu_item("m0"))
            .await
            .unwrap();

        let processor =
            BulkMutationProcessor::new(store.clone(), Arc::new(RecordingAuditSink::default()));
        let err = processor
            .apply(
                BulkOperation::Delete,
                vec![BulkItem { id: "m0".into(), data: None }],
                "admin_1",
            )
            .await
            .unwrap_err();
        // the only item was demoted, so the call as a whole fails
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn mixed_chunk_failure_keeps_other_chunk_successes() {
        let store = Arc::new(MemoryStore::new());
        let repo = MenuItemRepository::new(store.clone());
        repo.save(&menu_item("keep")).await.unwrap();

        let processor =
            BulkMutationProcessor::new(store.clone(), Arc::new(RecordingAuditSink::default()));
        let result = processor
            .apply(
                BulkOperation::Delete,
                vec![
                    BulkItem { id: "keep".into(), data: None },
                    BulkItem { id: "ghost".into(), data: None },
                ],
                "admin_1",
            )
            .await
            .unwrap();
        assert_eq!(result.success.len(), 1);
        assert_eq!(result.failed.len(), 1);
    }
}
