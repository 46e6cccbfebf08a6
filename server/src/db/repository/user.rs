//! User Loyalty Repository

use serde_json::json;
use shared::models::UserProfile;

use super::{RepoResult, from_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct UserRepository {
    store: StoreHandle,
}

impl UserRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    /// Grant one loyalty spin, increment-only merge
    ///
    /// Creates the profile on first grant. Counters only ever go up; the
    /// caller guards against double-granting via webhook idempotency.
    pub async fn increment_spins(&self, user_id: &str) -> RepoResult<u64> {
        let spins = self.get_spins(user_id).await? + 1;
        self.store
            .merge(
                collections::USERS,
                user_id,
                json!({ "id": user_id, "spins": spins }),
            )
            .await?;
        Ok(spins)
    }

    pub async fn get_spins(&self, user_id: &str) -> RepoResult<u64> {
        match self.store.get(collections::USERS, user_id).await? {
            Some(doc) => {
                let profile: UserProfile = from_doc(doc)?;
                Ok(profile.spins)
            }
            None => Ok(0),
        }
    }
}
