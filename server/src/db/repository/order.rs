//! Order Repository

use serde_json::json;
use shared::models::Order;

use super::{RepoError, RepoResult, from_doc, to_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct OrderRepository {
    store: StoreHandle,
}

impl OrderRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn create(&self, order: &Order) -> RepoResult<()> {
        if self.store.exists(collections::ORDERS, &order.id).await? {
            return Err(RepoError::Duplicate(format!("Order {}", order.id)));
        }
        self.store
            .put(collections::ORDERS, &order.id, to_doc(order)?)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        match self.store.get(collections::ORDERS, id).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// Locate an order by its payment gateway reference
    ///
    /// Used by the webhook processor for routing and for create dedup.
    pub async fn find_by_payment_ref(&self, payment_ref: &str) -> RepoResult<Option<Order>> {
        let filter = vec![("payment_ref".to_string(), json!(payment_ref))];
        let docs = self
            .store
            .find(collections::ORDERS, &filter, Some(1))
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    pub async fn save(&self, order: &Order) -> RepoResult<()> {
        self.store
            .put(collections::ORDERS, &order.id, to_doc(order)?)
            .await?;
        Ok(())
    }
}
