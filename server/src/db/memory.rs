//! In-process document store backend
//!
//! Process-local storage for single-instance deployments and tests.
//! All mutations for one batch happen under a single write lock, which
//! gives the all-or-nothing guarantee the fanout and bulk components
//! rely on.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{BatchOp, DocumentStore, Filter, MAX_BATCH_SIZE, StoreError, StoreResult};

type Collection = HashMap<String, Value>;

/// In-memory document store
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(doc: &Value, filter: &Filter) -> bool {
    filter.iter().all(|(field, expected)| {
        doc.get(field).map(|actual| actual == expected).unwrap_or(false)
    })
}

fn shallow_merge(doc: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(fields)) = (doc, patch) {
        for (k, v) in fields {
            target.insert(k, v);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let data = self.data.read().await;
        Ok(data
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, doc: Value) -> StoreResult<()> {
        let mut data = self.data.write().await;
        data.entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()> {
        let mut data = self.data.write().await;
        let coll = data.entry(collection.to_string()).or_default();
        match coll.get_mut(id) {
            Some(doc) => shallow_merge(doc, patch),
            None => {
                coll.insert(id.to_string(), patch);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut data = self.data.write().await;
        if let Some(coll) = data.get_mut(collection) {
            coll.remove(id);
        }
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> StoreResult<Vec<Value>> {
        let data = self.data.read().await;
        let Some(coll) = data.get(collection) else {
            return Ok(Vec::new());
        };
        let mut results: Vec<Value> = coll
            .values()
            .filter(|doc| matches(doc, filter))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn commit_batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        if ops.len() > MAX_BATCH_SIZE {
            return Err(StoreError::BatchTooLarge(ops.len()));
        }
        // Single write lock for the whole batch: all-or-nothing
        let mut data = self.data.write().await;
        for op in ops {
            match op {
                BatchOp::Put { collection, id, doc } => {
                    data.entry(collection).or_default().insert(id, doc);
                }
                BatchOp::Merge { collection, id, patch } => {
                    let coll = data.entry(collection).or_default();
                    match coll.get_mut(&id) {
                        Some(doc) => shallow_merge(doc, patch),
                        None => {
                            coll.insert(id, patch);
                        }
                    }
                }
                BatchOp::Delete { collection, id } => {
                    if let Some(coll) = data.get_mut(&collection) {
                        coll.remove(&id);
                    }
                }
            }
        }
        Ok(())
    }
}
