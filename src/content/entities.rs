//! Ordered content entities
//!
//! Events, testimonials, supporters and staff members share one shape: a
//! caller-generated id, entity fields, and an integer `order` that is the
//! admin sort key. [`OrderedEntity`] is what the generic collection editor
//! needs to know about each of them.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::editor::slots::SlotList;
use crate::store::{CollectionPath, OrderBy};

pub trait OrderedEntity:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// Top-level collection holding this entity
    const COLLECTION: &'static str;

    /// Listing order used when loading the editor
    fn natural_order() -> OrderBy {
        OrderBy::asc("order")
    }

    /// A new entity with every field empty
    fn blank(id: String) -> Self;

    fn id(&self) -> &str;

    fn set_order(&mut self, order: i64);

    /// The entity as it should be written (empty slots and blank text dropped)
    fn normalized(&self) -> Self {
        self.clone()
    }

    /// Featured-photo slots, for entities that have them
    fn slots_mut(&mut self) -> Option<&mut SlotList> {
        None
    }

    fn collection() -> CollectionPath {
        CollectionPath::root(Self::COLLECTION)
    }
}

fn drop_blank(paragraphs: &[String]) -> Vec<String> {
    paragraphs
        .iter()
        .filter(|p| !p.trim().is_empty())
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// `YYYY-MM-DD`, or empty when undated
    pub date: String,
    pub time: String,
    pub location: String,
    pub url: String,
    pub archived: bool,
    pub summary: String,
    pub paragraphs: Vec<String>,
    pub featured: SlotList,
    pub order: i64,
}

impl OrderedEntity for Event {
    const COLLECTION: &'static str = "events";

    fn natural_order() -> OrderBy {
        OrderBy::desc("date")
    }

    fn blank(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    fn normalized(&self) -> Self {
        let mut event = self.clone();
        event.paragraphs = drop_blank(&self.paragraphs);
        event.featured.compact();
        event
    }

    fn slots_mut(&mut self) -> Option<&mut SlotList> {
        Some(&mut self.featured)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    pub id: String,
    pub paragraph: String,
    pub name: String,
    pub contact: Option<String>,
    pub featured: SlotList,
    pub order: i64,
}

impl OrderedEntity for Testimonial {
    const COLLECTION: &'static str = "testimonials";

    fn blank(id: String) -> Self {
        Self {
            id,
            contact: Some(String::new()),
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }

    fn normalized(&self) -> Self {
        let mut testimonial = self.clone();
        testimonial.contact.get_or_insert_with(String::new);
        testimonial.featured.compact();
        testimonial
    }

    fn slots_mut(&mut self) -> Option<&mut SlotList> {
        Some(&mut self.featured)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Supporter {
    pub id: String,
    pub photo_url: String,
    pub name: String,
    pub subname: String,
    pub description: String,
    pub order: i64,
}

impl OrderedEntity for Supporter {
    const COLLECTION: &'static str = "supporters";

    fn blank(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaffMember {
    pub id: String,
    pub photo_url: String,
    pub name: String,
    pub title: String,
    pub subtitle: String,
    pub bio: String,
    pub order: i64,
}

impl OrderedEntity for StaffMember {
    const COLLECTION: &'static str = "staffMembers";

    fn blank(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}
