//! Document store for site content
//!
//! Content lives in collections of JSON documents addressed by path, e.g.
//! `events/{id}` or `galleryGroups/{id}/photos/{id}`. The [`DocumentStore`]
//! trait is the only way the rest of the crate touches persistence:
//!
//! - [`MemoryStore`]: process-local store used in dev mode and tests
//! - [`MongoStore`]: MongoDB-backed store, batches run in a transaction
//!
//! Writes are grouped in a [`WriteBatch`], which a store applies all-or-nothing.

pub mod batch;
pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

use crate::types::{Result, SiteError};

pub use batch::{WriteBatch, WriteOp};
pub use memory::MemoryStore;
pub use mongo::{MongoClient, MongoStore};

/// A stored document body (top-level JSON object)
pub type Document = serde_json::Map<String, Value>;

/// Path of a collection: `events`, or `galleryGroups/{id}/photos`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// A top-level collection
    pub fn root(name: &str) -> Self {
        Self(name.to_string())
    }

    /// A sub-collection owned by a document
    pub fn sub(parent: &DocPath, name: &str) -> Self {
        Self(format!("{}/{}", parent, name))
    }

    /// Path of the document `id` inside this collection
    pub fn doc(&self, id: &str) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leaf collection name (`photos` for `galleryGroups/g1/photos`)
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path of the owning document, if this is a sub-collection
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(parent, _)| parent)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document read back from a collection listing
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDoc {
    pub id: String,
    pub data: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Single-field sort for collection listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Desc,
        }
    }
}

/// Narrow interface to the remote content store
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document; `None` when it was never created
    async fn get(&self, path: &DocPath) -> Result<Option<Document>>;

    /// List every document of a collection, optionally sorted on one field
    async fn list(&self, collection: &CollectionPath, order: Option<&OrderBy>)
        -> Result<Vec<StoredDoc>>;

    /// Apply every operation of the batch atomically
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Write a single document (`merge` keeps fields not present in `data`)
    async fn set(&self, path: &DocPath, data: Document, merge: bool) -> Result<()> {
        let mut batch = WriteBatch::new();
        if merge {
            batch.merge(path.clone(), data);
        } else {
            batch.set(path.clone(), data);
        }
        self.commit(batch).await
    }

    /// Delete a single document; deleting a missing document succeeds
    async fn delete(&self, path: &DocPath) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.commit(batch).await
    }
}

/// Rank of a JSON value type in sort order (missing and null sort first)
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Compare two optional field values the way the stores sort them
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Sort listed documents in place; ties keep id order
pub fn sort_documents(docs: &mut [StoredDoc], order: &OrderBy) {
    docs.sort_by(|a, b| {
        let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field));
        let ord = match order.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        ord.then_with(|| a.id.cmp(&b.id))
    });
}

/// Decode a stored document into a typed value, injecting its id
pub fn decode_doc<T: serde::de::DeserializeOwned>(doc: &StoredDoc) -> Result<T> {
    let mut data = doc.data.clone();
    data.insert("id".to_string(), Value::String(doc.id.clone()));
    serde_json::from_value(Value::Object(data))
        .map_err(|e| SiteError::Store(format!("Malformed document {}: {}", doc.id, e)))
}

/// Encode a typed value into a document body, dropping its id and null fields
pub fn encode_doc<T: Serialize>(value: &T) -> Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            map.retain(|_, v| !v.is_null());
            Ok(map)
        }
        other => Err(SiteError::Internal(format!(
            "Expected a JSON object to store, got {}",
            other
        ))),
    }
}
