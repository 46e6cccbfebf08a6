//! Driver Repository

use serde_json::json;
use shared::models::Driver;

use super::{RepoResult, from_doc, to_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct DriverRepository {
    store: StoreHandle,
}

impl DriverRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Drivers eligible for fanout: on duty and account active
    pub async fn find_eligible(&self) -> RepoResult<Vec<Driver>> {
        let filter = vec![
            ("available".to_string(), json!(true)),
            ("active".to_string(), json!(true)),
        ];
        let docs = self.store.find(collections::DRIVERS, &filter, None).await?;
        docs.into_iter().map(from_doc).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Driver>> {
        match self.store.get(collections::DRIVERS, id).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, driver: &Driver) -> RepoResult<()> {
        self.store
            .put(collections::DRIVERS, &driver.id, to_doc(driver)?)
            .await?;
        Ok(())
    }
}
