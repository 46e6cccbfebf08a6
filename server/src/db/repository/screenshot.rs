//! Screenshot Order Repository

use serde_json::json;
use shared::models::{ScreenshotOrder, status::ScreenshotStatus};

use super::{RepoError, RepoResult, from_doc, to_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct ScreenshotOrderRepository {
    store: StoreHandle,
}

impl ScreenshotOrderRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn create(&self, order: &ScreenshotOrder) -> RepoResult<()> {
        if self
            .store
            .exists(collections::SCREENSHOT_ORDERS, &order.id)
            .await?
        {
            return Err(RepoError::Duplicate(format!("ScreenshotOrder {}", order.id)));
        }
        self.store
            .put(collections::SCREENSHOT_ORDERS, &order.id, to_doc(order)?)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<ScreenshotOrder>> {
        match self.store.get(collections::SCREENSHOT_ORDERS, id).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// List, newest first, optionally filtered by status
    pub async fn list(
        &self,
        status: Option<ScreenshotStatus>,
        limit: usize,
    ) -> RepoResult<Vec<ScreenshotOrder>> {
        let filter = match status {
            Some(s) => vec![("status".to_string(), json!(s.as_str()))],
            None => Vec::new(),
        };
        let docs = self
            .store
            .find(collections::SCREENSHOT_ORDERS, &filter, None)
            .await?;
        let mut orders: Vec<ScreenshotOrder> = docs
            .into_iter()
            .map(from_doc)
            .collect::<RepoResult<_>>()?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    pub async fn save(&self, order: &ScreenshotOrder) -> RepoResult<()> {
        self.store
            .put(collections::SCREENSHOT_ORDERS, &order.id, to_doc(order)?)
            .await?;
        Ok(())
    }
}
