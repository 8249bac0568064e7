//! Featured-photo slots
//!
//! A [`SlotList`] is an ordered list of optional photo URLs owned by a page,
//! an event or a testimonial. It has no persistence of its own: slot edits
//! show up in the owner's dirty state and are written with the owner.
//!
//! On the wire a slot list is an array of strings where `""` is an empty slot.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::reorder::move_item;
use crate::types::{Result, SiteError};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotList {
    slots: Vec<Option<String>>,
}

impl SlotList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filled slots from a list of URLs (empty strings become empty slots)
    pub fn from_urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            slots: urls.into_iter().map(|url| non_empty(url.into())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    /// Append an empty slot, returning its index
    pub fn add_slot(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Fill (or clear, with an empty URL) the slot at `index`
    pub fn set_slot(&mut self, index: usize, url: &str) -> Result<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| SiteError::InvalidInput(format!("No slot {} (have {})", index, len)))?;
        *slot = non_empty(url.to_string());
        Ok(())
    }

    pub fn remove_slot(&mut self, index: usize) -> Result<()> {
        if index >= self.slots.len() {
            return Err(SiteError::InvalidInput(format!(
                "No slot {} (have {})",
                index,
                self.slots.len()
            )));
        }
        self.slots.remove(index);
        Ok(())
    }

    pub fn reorder_slots(&mut self, from: usize, to: usize) -> Result<()> {
        move_item(&mut self.slots, from, to)
    }

    /// The URLs that get written: filled slots, in order
    pub fn persisted(&self) -> Vec<String> {
        self.slots.iter().flatten().cloned().collect()
    }

    /// Drop empty slots in place
    pub fn compact(&mut self) {
        self.slots.retain(Option::is_some);
    }
}

fn non_empty(url: String) -> Option<String> {
    if url.trim().is_empty() {
        None
    } else {
        Some(url)
    }
}

impl Serialize for SlotList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.slots.iter().map(|slot| slot.as_deref().unwrap_or("")))
    }
}

impl<'de> Deserialize<'de> for SlotList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<Option<String>>::deserialize(deserializer)?;
        Ok(Self {
            slots: raw.into_iter().map(|slot| slot.and_then(non_empty)).collect(),
        })
    }
}

/// An operation on a slot list, as sent by the admin client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SlotOp {
    Add,
    Set { index: usize, url: String },
    Remove { index: usize },
    Reorder { from: usize, to: usize },
}

impl SlotOp {
    pub fn apply(&self, slots: &mut SlotList) -> Result<()> {
        match self {
            SlotOp::Add => {
                slots.add_slot();
                Ok(())
            }
            SlotOp::Set { index, url } => slots.set_slot(*index, url),
            SlotOp::Remove { index } => slots.remove_slot(*index),
            SlotOp::Reorder { from, to } => slots.reorder_slots(*from, *to),
        }
    }
}
