//! Page content documents (`pages/{pageKey}`)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::store::{encode_doc, CollectionPath, DocPath, Document, DocumentStore};
use crate::types::{Result, SiteError};

pub const PAGES_COLLECTION: &str = "pages";

/// The fixed set of editable pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKey {
    Home,
    WhatWeDo,
    WhoWeAre,
    Events,
    Supporters,
    Gallery,
    Testimonials,
}

impl PageKey {
    pub const ALL: [PageKey; 7] = [
        PageKey::Home,
        PageKey::WhatWeDo,
        PageKey::WhoWeAre,
        PageKey::Events,
        PageKey::Supporters,
        PageKey::Gallery,
        PageKey::Testimonials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageKey::Home => "home",
            PageKey::WhatWeDo => "what-we-do",
            PageKey::WhoWeAre => "who-we-are",
            PageKey::Events => "events",
            PageKey::Supporters => "supporters",
            PageKey::Gallery => "gallery",
            PageKey::Testimonials => "testimonials",
        }
    }

    /// Only the home page carries a banner image
    pub fn has_banner(&self) -> bool {
        matches!(self, PageKey::Home)
    }

    pub fn doc_path(&self) -> DocPath {
        CollectionPath::root(PAGES_COLLECTION).doc(self.as_str())
    }
}

impl FromStr for PageKey {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self> {
        PageKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SiteError::InvalidInput(format!("Unknown page key: {}", s)))
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editable text and imagery of one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    pub summary: String,
    pub paragraphs: Vec<String>,
    pub featured: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

impl PageContent {
    /// Build from a stored document, defaulting anything missing or malformed
    pub fn from_document(doc: &Document) -> Self {
        Self {
            summary: doc
                .get("summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            paragraphs: string_array(doc.get("paragraphs")),
            featured: string_array(doc.get("featured")),
            banner: doc.get("banner").and_then(Value::as_str).map(str::to_string),
        }
    }
}

/// Non-array values count as absent; non-string entries are skipped
fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Read a page; `None` when it has never been saved
pub async fn fetch_page_content(
    store: &dyn DocumentStore,
    key: PageKey,
) -> Result<Option<PageContent>> {
    let doc = store.get(&key.doc_path()).await?;
    Ok(doc.as_ref().map(PageContent::from_document))
}

/// Merge-upsert a page; absent fields are not sent
pub async fn save_page_content(
    store: &dyn DocumentStore,
    key: PageKey,
    content: &PageContent,
) -> Result<()> {
    let body = encode_doc(content)?;
    debug!(page = %key, fields = body.len(), "Saving page content");
    store.set(&key.doc_path(), body, true).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_page_key_round_trip() {
        for key in PageKey::ALL {
            assert_eq!(key.as_str().parse::<PageKey>().unwrap(), key);
        }
        assert!(matches!(
            "about".parse::<PageKey>(),
            Err(SiteError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_array_fields_treated_as_absent() {
        let doc = json!({"summary": "Hi", "paragraphs": "oops", "featured": ["a", 3, "b"]});
        let content = PageContent::from_document(doc.as_object().unwrap());
        assert_eq!(content.summary, "Hi");
        assert!(content.paragraphs.is_empty());
        assert_eq!(content.featured, vec!["a", "b"]);
        assert_eq!(content.banner, None);
    }

    #[tokio::test]
    async fn test_save_merges_with_existing_fields() {
        let store = MemoryStore::new();
        let path = PageKey::Home.doc_path();
        store
            .set(&path, json!({"banner": "b.jpg", "extra": 1}).as_object().cloned().unwrap(), false)
            .await
            .unwrap();

        let content = PageContent {
            summary: "Welcome".into(),
            ..Default::default()
        };
        save_page_content(&store, PageKey::Home, &content).await.unwrap();

        let stored = store.get(&path).await.unwrap().unwrap();
        assert_eq!(stored.get("banner"), Some(&json!("b.jpg")));
        assert_eq!(stored.get("extra"), Some(&json!(1)));
        assert_eq!(stored.get("summary"), Some(&json!("Welcome")));
    }
}
