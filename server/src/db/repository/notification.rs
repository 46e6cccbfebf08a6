//! Notification Repository
//!
//! Write side of the driver fanout. Records for one fanout attempt go
//! through a single atomic batch so a failed attempt leaves nothing
//! behind.

use serde_json::json;
use shared::models::NotificationRecord;

use super::{RepoResult, from_doc, to_doc};
use crate::db::{BatchOp, StoreHandle, collections};

#[derive(Clone)]
pub struct NotificationRepository {
    store: StoreHandle,
}

impl NotificationRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Persist a fanout set atomically; empty sets skip the store call
    pub async fn create_batch(&self, records: &[NotificationRecord]) -> RepoResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let ops = records
            .iter()
            .map(|r| {
                Ok(BatchOp::Put {
                    collection: collections::NOTIFICATIONS.to_string(),
                    id: r.id.clone(),
                    doc: to_doc(r)?,
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;
        self.store.commit_batch(ops).await?;
        Ok(())
    }

    pub async fn find_by_driver(&self, driver_id: &str) -> RepoResult<Vec<NotificationRecord>> {
        let filter = vec![("driver_id".to_string(), json!(driver_id))];
        let docs = self
            .store
            .find(collections::NOTIFICATIONS, &filter, None)
            .await?;
        docs.into_iter().map(from_doc).collect()
    }
}
