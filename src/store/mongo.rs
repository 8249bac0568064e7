//! MongoDB-backed document store
//!
//! Collection paths map onto MongoDB like this:
//!
//! - the leaf name becomes the MongoDB collection (`photos` for
//!   `galleryGroups/g1/photos`)
//! - `_id` holds the full document path, so ids never collide across parents
//! - `_parent` holds the owning document path (null for top-level collections)
//!
//! Batches run inside a multi-document transaction, which requires the
//! server to be a replica set (a single-node replica set is enough).

use async_trait::async_trait;
use bson::{doc, Bson, Document as BsonDocument};
use futures_util::TryStreamExt;
use mongodb::{options::IndexOptions, Client, ClientSession, Collection, IndexModel};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{
    CollectionPath, DocPath, Document, DocumentStore, Direction, OrderBy, StoredDoc, WriteBatch,
    WriteOp,
};
use crate::types::{Result, SiteError};

/// Leaf collections that get a `(_parent, order)` index at startup
const INDEXED_COLLECTIONS: &[&str] = &[
    "pages",
    "events",
    "staffMembers",
    "supporters",
    "testimonials",
    "galleryGroups",
    "photos",
];

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the connection with a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| SiteError::Store(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SiteError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    fn raw_collection(&self, name: &str) -> Collection<BsonDocument> {
        self.client.database(&self.db_name).collection(name)
    }
}

/// [`DocumentStore`] on top of a [`MongoClient`]
#[derive(Clone)]
pub struct MongoStore {
    mongo: MongoClient,
}

impl MongoStore {
    pub fn new(mongo: MongoClient) -> Self {
        Self { mongo }
    }

    /// Create the listing indexes used by every content collection
    pub async fn ensure_indexes(&self) -> Result<()> {
        for name in INDEXED_COLLECTIONS {
            let index = IndexModel::builder()
                .keys(doc! { "_parent": 1, "order": 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_parent_order", name))
                        .build(),
                )
                .build();

            self.mongo
                .raw_collection(name)
                .create_index(index)
                .await
                .map_err(|e| SiteError::Store(format!("Failed to create index on {}: {}", name, e)))?;
        }
        debug!(count = INDEXED_COLLECTIONS.len(), "MongoDB indexes ensured");
        Ok(())
    }

    fn collection_for(&self, path: &CollectionPath) -> Collection<BsonDocument> {
        self.mongo.raw_collection(path.name())
    }

    async fn apply_op(&self, session: &mut ClientSession, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::Set { path, data, merge } => {
                let coll = self.collection_for(path.collection());
                let filter = doc! { "_id": path.to_string() };
                let mut body = to_bson_document(&data)?;
                body.insert("_parent", parent_bson(path.collection()));

                if merge {
                    coll.update_one(filter, doc! { "$set": body })
                        .upsert(true)
                        .session(&mut *session)
                        .await
                        .map_err(|e| SiteError::Store(format!("Update of {} failed: {}", path, e)))?;
                } else {
                    coll.replace_one(filter, body)
                        .upsert(true)
                        .session(&mut *session)
                        .await
                        .map_err(|e| SiteError::Store(format!("Replace of {} failed: {}", path, e)))?;
                }
            }
            WriteOp::Delete { path } => {
                self.collection_for(path.collection())
                    .delete_one(doc! { "_id": path.to_string() })
                    .session(&mut *session)
                    .await
                    .map_err(|e| SiteError::Store(format!("Delete of {} failed: {}", path, e)))?;
            }
        }
        Ok(())
    }
}

fn parent_bson(collection: &CollectionPath) -> Bson {
    match collection.parent() {
        Some(parent) => Bson::String(parent.to_string()),
        None => Bson::Null,
    }
}

fn to_bson_document(data: &Document) -> Result<BsonDocument> {
    bson::to_document(data).map_err(|e| SiteError::Store(format!("BSON encoding failed: {}", e)))
}

/// Convert a raw MongoDB document back into a content document
fn from_bson_document(mut raw: BsonDocument) -> (String, Document) {
    let full_id = raw
        .remove("_id")
        .and_then(|id| id.as_str().map(str::to_string))
        .unwrap_or_default();
    raw.remove("_parent");

    let id = full_id.rsplit('/').next().unwrap_or(&full_id).to_string();
    let data = match Bson::Document(raw).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    (id, data)
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        let found = self
            .collection_for(path.collection())
            .find_one(doc! { "_id": path.to_string() })
            .await
            .map_err(|e| SiteError::Store(format!("Find of {} failed: {}", path, e)))?;

        Ok(found.map(|raw| from_bson_document(raw).1))
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDoc>> {
        let coll = self.collection_for(collection);
        let filter = doc! { "_parent": parent_bson(collection) };
        let mut find = coll.find(filter);
        if let Some(order) = order {
            let direction = match order.direction {
                Direction::Asc => 1,
                Direction::Desc => -1,
            };
            let mut sort = BsonDocument::new();
            sort.insert(order.field.clone(), direction);
            sort.insert("_id", 1);
            find = find.sort(sort);
        }

        let cursor = find
            .await
            .map_err(|e| SiteError::Store(format!("List of {} failed: {}", collection, e)))?;
        let raw_docs: Vec<BsonDocument> = cursor
            .try_collect()
            .await
            .map_err(|e| SiteError::Store(format!("Reading {} failed: {}", collection, e)))?;

        Ok(raw_docs
            .into_iter()
            .map(|raw| {
                let (id, data) = from_bson_document(raw);
                StoredDoc { id, data }
            })
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let op_count = batch.len();

        let mut session = self
            .mongo
            .inner()
            .start_session()
            .await
            .map_err(|e| SiteError::Store(format!("Failed to start session: {}", e)))?;
        session
            .start_transaction()
            .await
            .map_err(|e| SiteError::Store(format!("Failed to start transaction: {}", e)))?;

        for op in batch.into_ops() {
            if let Err(e) = self.apply_op(&mut session, op).await {
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort transaction: {}", abort_err);
                }
                return Err(e);
            }
        }

        session
            .commit_transaction()
            .await
            .map_err(|e| SiteError::Store(format!("Commit failed: {}", e)))?;

        debug!(ops = op_count, "Committed batch to MongoDB");
        Ok(())
    }
}
