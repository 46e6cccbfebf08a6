//! Menu Item Repository

use shared::models::MenuItem;

use super::{RepoResult, from_doc, to_doc};
use crate::db::{StoreHandle, collections};

#[derive(Clone)]
pub struct MenuItemRepository {
    store: StoreHandle,
}

impl MenuItemRepository {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<MenuItem>> {
        match self.store.get(collections::MENU_ITEMS, id).await? {
            Some(doc) => Ok(Some(from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn exists(&self, id: &str) -> RepoResult<bool> {
        Ok(self.store.exists(collections::MENU_ITEMS, id).await?)
    }

    pub async fn save(&self, item: &MenuItem) -> RepoResult<()> {
        self.store
            .put(collections::MENU_ITEMS, &item.id, to_doc(item)?)
            .await?;
        Ok(())
    }
}
