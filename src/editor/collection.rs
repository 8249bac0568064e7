//! Ordered collection editor
//!
//! A [`CollectionEditor`] buffers edits to one entity collection until they
//! are committed. Items carry their position as `order`; a commit rewrites
//! every item with `order` equal to its index in a single atomic batch, then
//! deletes removed items one by one on a best-effort basis.
//!
//! Commit is split in three steps so that an editor behind a lock never holds
//! the lock across store I/O:
//!
//! 1. [`CollectionEditor::begin_commit`] captures the sequence as it is now
//! 2. [`CommitPlan::execute`] talks to the store
//! 3. [`CollectionEditor::finish_commit`] reconciles the buffer on success
//!
//! Edits made between steps 1 and 3 are kept and leave the editor dirty. An
//! item written by the commit but removed locally in the meantime is queued
//! for deletion, so the next commit brings the store back in line. A load
//! that lands mid-commit wins: its snapshot is kept as is.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::merge_patch;
use super::reorder::move_item;
use super::slots::SlotOp;
use crate::content::entities::OrderedEntity;
use crate::store::{decode_doc, encode_doc, DocumentStore, WriteBatch};
use crate::types::{Result, SiteError};

pub struct CollectionEditor<E: OrderedEntity> {
    items: Vec<E>,
    snapshot: String,
    selection: Option<String>,
    pending_deletes: Vec<String>,
    /// Ids known to exist remotely (loaded or committed)
    persisted: HashSet<String>,
    /// Bumped by every load
    generation: u64,
}

/// Serializable view of an editor for the admin client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorView<'a, E: OrderedEntity> {
    pub collection: &'static str,
    pub items: &'a [E],
    pub selection: Option<&'a str>,
    pub pending_deletes: &'a [String],
    pub dirty: bool,
}

/// What a commit wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitReport {
    pub written: usize,
    pub deleted: usize,
    pub failed_deletes: Vec<String>,
}

/// A commit captured from an editor, ready to be sent to the store
#[derive(Debug, Clone)]
pub struct CommitPlan<E: OrderedEntity> {
    items: Vec<E>,
    deletes: Vec<String>,
    /// Serialization of the editor's items when the plan was taken
    captured: String,
    generation: u64,
}

fn serialize_items<E: OrderedEntity>(items: &[E]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

impl<E: OrderedEntity> Default for CollectionEditor<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: OrderedEntity> CollectionEditor<E> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            snapshot: "[]".to_string(),
            selection: None,
            pending_deletes: Vec::new(),
            persisted: HashSet::new(),
            generation: 0,
        }
    }

    /// Read the collection in its natural order
    pub async fn fetch(store: &dyn DocumentStore) -> Result<Vec<E>> {
        let docs = store
            .list(&E::collection(), Some(&E::natural_order()))
            .await?;
        docs.iter().map(decode_doc).collect()
    }

    /// Replace the buffer with freshly fetched items
    pub fn apply_load(&mut self, items: Vec<E>) -> Result<()> {
        self.snapshot = serialize_items(&items)?;
        self.persisted = items.iter().map(|item| item.id().to_string()).collect();
        self.items = items;
        self.pending_deletes.clear();
        self.generation += 1;
        self.drop_stale_selection();
        debug!(collection = E::COLLECTION, count = self.items.len(), "Loaded collection");
        Ok(())
    }

    pub async fn load(&mut self, store: &dyn DocumentStore) -> Result<()> {
        let items = Self::fetch(store).await?;
        self.apply_load(items)
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn pending_deletes(&self) -> &[String] {
        &self.pending_deletes
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.items.iter().find(|item| item.id() == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| SiteError::NotFound(format!("{} item {}", E::COLLECTION, id)))
    }

    /// Append a blank item with a fresh id and select it
    pub fn add(&mut self) -> &E {
        let id = Uuid::new_v4().to_string();
        self.items.push(E::blank(id.clone()));
        self.selection = Some(id);
        let index = self.items.len() - 1;
        &self.items[index]
    }

    /// Replace an item in place; its id must not change
    pub fn update(&mut self, id: &str, item: E) -> Result<()> {
        if item.id() != id {
            return Err(SiteError::InvalidInput(format!(
                "Item id {} cannot be changed to {}",
                id,
                item.id()
            )));
        }
        let index = self.position(id)?;
        self.items[index] = item;
        Ok(())
    }

    /// Apply a JSON merge patch to an item (`id` is ignored)
    pub fn patch(&mut self, id: &str, patch: &Value) -> Result<&E> {
        let index = self.position(id)?;
        let mut value = serde_json::to_value(&self.items[index])?;
        merge_patch(&mut value, patch);
        if let Value::Object(map) = &mut value {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        let item: E = serde_json::from_value(value)
            .map_err(|e| SiteError::InvalidInput(format!("Invalid {} fields: {}", E::COLLECTION, e)))?;
        self.items[index] = item;
        Ok(&self.items[index])
    }

    /// Apply a featured-slot operation to an item
    pub fn edit_slots(&mut self, id: &str, op: &SlotOp) -> Result<()> {
        let index = self.position(id)?;
        let slots = self.items[index].slots_mut().ok_or_else(|| {
            SiteError::InvalidInput(format!("{} items have no featured photos", E::COLLECTION))
        })?;
        op.apply(slots)
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.items, from, to)
    }

    /// Remove an item locally; persisted items are deleted on the next commit
    pub fn remove(&mut self, id: &str) -> Result<()> {
        let index = self.position(id)?;
        self.items.remove(index);
        if self.persisted.contains(id) && !self.pending_deletes.iter().any(|p| p == id) {
            self.pending_deletes.push(id.to_string());
        }
        if self.selection.as_deref() == Some(id) {
            self.selection = None;
        }
        Ok(())
    }

    pub fn select(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                self.position(id)?;
                self.selection = Some(id.to_string());
            }
            None => self.selection = None,
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        serialize_items(&self.items)
            .map(|current| current != self.snapshot)
            .unwrap_or(true)
    }

    /// Restore the last loaded or committed state
    pub fn cancel(&mut self) -> Result<()> {
        self.items = serde_json::from_str(&self.snapshot)?;
        self.pending_deletes.clear();
        self.drop_stale_selection();
        Ok(())
    }

    fn drop_stale_selection(&mut self) {
        if let Some(selected) = self.selection.as_deref() {
            if !self.items.iter().any(|item| item.id() == selected) {
                self.selection = None;
            }
        }
    }

    /// Capture the current sequence for a commit
    pub fn begin_commit(&self) -> Result<CommitPlan<E>> {
        let captured = serialize_items(&self.items)?;
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut item = item.normalized();
                item.set_order(index as i64);
                item
            })
            .collect();

        Ok(CommitPlan {
            items,
            deletes: self.pending_deletes.clone(),
            captured,
            generation: self.generation,
        })
    }

    /// Reconcile the buffer after `plan` was written successfully
    pub fn finish_commit(&mut self, plan: CommitPlan<E>) -> Result<()> {
        for item in &plan.items {
            self.persisted.insert(item.id().to_string());
        }
        for id in &plan.deletes {
            self.persisted.remove(id);
        }
        self.pending_deletes.retain(|id| !plan.deletes.contains(id));

        if plan.generation != self.generation {
            debug!(
                collection = E::COLLECTION,
                "Collection reloaded while committing, keeping loaded state"
            );
            self.drop_stale_selection();
            return Ok(());
        }

        let committed = serialize_items(&plan.items)?;
        let unchanged = serialize_items(&self.items)? == plan.captured;
        self.snapshot = committed;

        if unchanged {
            self.items = plan.items;
        } else {
            // Written by this commit but removed locally since
            let orphans: Vec<String> = plan
                .items
                .iter()
                .map(|item| item.id().to_string())
                .filter(|id| self.get(id).is_none() && !self.pending_deletes.contains(id))
                .collect();
            debug!(
                collection = E::COLLECTION,
                orphans = orphans.len(),
                "Buffer changed while committing, keeping local edits"
            );
            self.pending_deletes.extend(orphans);
        }
        self.drop_stale_selection();
        Ok(())
    }

    /// Write the buffer: begin, execute and finish in one go
    pub async fn commit(&mut self, store: &dyn DocumentStore) -> Result<CommitReport> {
        let plan = self.begin_commit()?;
        let report = plan.execute(store).await?;
        self.finish_commit(plan)?;
        Ok(report)
    }

    pub fn view(&self) -> EditorView<'_, E> {
        EditorView {
            collection: E::COLLECTION,
            items: &self.items,
            selection: self.selection.as_deref(),
            pending_deletes: &self.pending_deletes,
            dirty: self.is_dirty(),
        }
    }
}

impl<E: OrderedEntity> CommitPlan<E> {
    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn deletes(&self) -> &[String] {
        &self.deletes
    }

    /// One atomic batch of merge-sets, then best-effort deletes
    pub async fn execute(&self, store: &dyn DocumentStore) -> Result<CommitReport> {
        let collection = E::collection();
        let mut batch = WriteBatch::new();
        for item in &self.items {
            batch.merge(collection.doc(item.id()), encode_doc(item)?);
        }
        store.commit(batch).await?;

        let mut report = CommitReport {
            written: self.items.len(),
            ..Default::default()
        };
        for id in &self.deletes {
            match store.delete(&collection.doc(id)).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!(collection = E::COLLECTION, id = %id, error = %e, "Failed to delete removed item");
                    report.failed_deletes.push(id.clone());
                }
            }
        }

        info!(
            collection = E::COLLECTION,
            written = report.written,
            deleted = report.deleted,
            "Committed collection"
        );
        Ok(report)
    }
}
