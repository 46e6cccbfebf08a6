//! Delivery Request Repository

use serde_json::json;
use shared::models::DeliveryRequest;

use super::{RepoError, RepoResult, from_doc, to_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct DeliveryRepository {
    store: StoreHandle,
}

impl DeliveryRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn create(&self, delivery: &DeliveryRequest) -> RepoResult<()> {
        if self.store.exists(collections::DELIVERIES, &delivery.id).await? {
            return Err(RepoError::Duplicate(format!("Delivery {}", delivery.id)));
        }
        self.store
            .put(collections::DELIVERIES, &delivery.id, to_doc(delivery)?)
            .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<DeliveryRequest>> {
        match self.store.get(collections::DELIVERIES, id).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    /// Locate a delivery by its stored checkout-session reference
    pub async fn find_by_payment_ref(
        &self,
        payment_ref: &str,
    ) -> RepoResult<Option<DeliveryRequest>> {
        let filter = vec![("payment_ref".to_string(), json!(payment_ref))];
        let docs = self
            .store
            .find(collections::DELIVERIES, &filter, Some(1))
            .await?;
        docs.into_iter().next().map(from_doc).transpose()
    }

    pub async fn save(&self, delivery: &DeliveryRequest) -> RepoResult<()> {
        self.store
            .put(collections::DELIVERIES, &delivery.id, to_doc(delivery)?)
            .await?;
        Ok(())
    }
}
