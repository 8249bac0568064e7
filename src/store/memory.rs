//! In-memory document store
//!
//! Used when MongoDB is not configured in dev mode, and by tests. All
//! collections sit behind one lock so a batch is applied atomically.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    sort_documents, CollectionPath, DocPath, Document, DocumentStore, OrderBy, StoredDoc,
    WriteBatch, WriteOp,
};
use crate::types::Result;

type Collections = HashMap<CollectionPath, BTreeMap<String, Document>>;

/// Process-local [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in a collection
    pub async fn count(&self, collection: &CollectionPath) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

fn apply(collections: &mut Collections, op: WriteOp) {
    match op {
        WriteOp::Set { path, data, merge } => {
            let docs = collections.entry(path.collection().clone()).or_default();
            match docs.get_mut(path.id()) {
                Some(existing) if merge => {
                    for (key, value) in data {
                        existing.insert(key, value);
                    }
                }
                _ => {
                    docs.insert(path.id().to_string(), data);
                }
            }
        }
        WriteOp::Delete { path } => {
            if let Some(docs) = collections.get_mut(path.collection()) {
                docs.remove(path.id());
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(path.collection())
            .and_then(|docs| docs.get(path.id()))
            .cloned())
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDoc>> {
        let collections = self.collections.read().await;
        let mut docs: Vec<StoredDoc> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| StoredDoc {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            sort_documents(&mut docs, order);
        }
        Ok(docs)
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        let op_count = batch.len();
        let mut collections = self.collections.write().await;
        for op in batch.into_ops() {
            apply(&mut collections, op);
        }
        debug!(ops = op_count, "Committed batch to memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn body(value: Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let store = MemoryStore::new();
        let path = CollectionPath::root("pages").doc("home");
        assert!(store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_merge_keeps_existing_fields() {
        let store = MemoryStore::new();
        let path = CollectionPath::root("events").doc("e1");

        store
            .set(&path, body(json!({"title": "Gala", "time": "7pm"})), false)
            .await
            .unwrap();
        store.set(&path, body(json!({"order": 3})), true).await.unwrap();

        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(
            Value::Object(stored),
            json!({"title": "Gala", "time": "7pm", "order": 3})
        );
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces() {
        let store = MemoryStore::new();
        let path = CollectionPath::root("events").doc("e1");

        store.set(&path, body(json!({"title": "Gala"})), false).await.unwrap();
        store.set(&path, body(json!({"time": "7pm"})), false).await.unwrap();

        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(Value::Object(stored), json!({"time": "7pm"}));
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let store = MemoryStore::new();
        let path = CollectionPath::root("supporters").doc("ghost");
        store.delete(&path).await.unwrap();
        assert_eq!(store.count(path.collection()).await, 0);
    }

    #[tokio::test]
    async fn test_subcollections_are_separate() {
        let store = MemoryStore::new();
        let groups = CollectionPath::root("galleryGroups");
        let photos_a = CollectionPath::sub(&groups.doc("a"), "photos");
        let photos_b = CollectionPath::sub(&groups.doc("b"), "photos");

        let mut batch = WriteBatch::new();
        batch.set(photos_a.doc("p1"), body(json!({"order": 0})));
        batch.set(photos_b.doc("p2"), body(json!({"order": 0})));
        store.commit(batch).await.unwrap();

        assert_eq!(store.list(&photos_a, None).await.unwrap().len(), 1);
        assert_eq!(store.list(&photos_b, None).await.unwrap().len(), 1);
        assert!(store.list(&groups, None).await.unwrap().is_empty());
    }
}
