//! Page content editor

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::slots::{SlotList, SlotOp};
use crate::content::pages::{fetch_page_content, save_page_content, PageContent, PageKey};
use crate::store::DocumentStore;
use crate::types::{Result, SiteError};

/// Editable fields of a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageDraft {
    pub summary: String,
    pub paragraphs: Vec<String>,
    pub featured: SlotList,
    pub banner: Option<String>,
}

impl From<PageContent> for PageDraft {
    fn from(content: PageContent) -> Self {
        Self {
            summary: content.summary,
            paragraphs: content.paragraphs,
            featured: SlotList::from_urls(content.featured),
            banner: content.banner,
        }
    }
}

pub struct PageEditor {
    key: PageKey,
    exists: bool,
    draft: PageDraft,
    snapshot: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEditorView<'a> {
    pub key: &'static str,
    pub exists: bool,
    pub draft: &'a PageDraft,
    pub dirty: bool,
}

/// A save captured from a page editor
#[derive(Debug, Clone)]
pub struct PageSavePlan {
    key: PageKey,
    content: PageContent,
    captured: String,
}

fn serialize_draft(draft: &PageDraft) -> Result<String> {
    Ok(serde_json::to_string(draft)?)
}

impl PageEditor {
    pub fn new(key: PageKey) -> Self {
        let draft = PageDraft::default();
        let snapshot = serialize_draft(&draft).unwrap_or_default();
        Self {
            key,
            exists: false,
            draft,
            snapshot,
        }
    }

    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Whether the page has ever been saved
    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn draft(&self) -> &PageDraft {
        &self.draft
    }

    pub async fn fetch(store: &dyn DocumentStore, key: PageKey) -> Result<Option<PageContent>> {
        fetch_page_content(store, key).await
    }

    /// Replace the draft with fetched content (`None` loads empty defaults)
    pub fn apply_load(&mut self, content: Option<PageContent>) -> Result<()> {
        self.exists = content.is_some();
        self.draft = content.map(PageDraft::from).unwrap_or_default();
        self.snapshot = serialize_draft(&self.draft)?;
        debug!(page = %self.key, exists = self.exists, "Loaded page");
        Ok(())
    }

    pub async fn load(&mut self, store: &dyn DocumentStore) -> Result<()> {
        let content = Self::fetch(store, self.key).await?;
        self.apply_load(content)
    }

    pub fn set_summary(&mut self, summary: String) {
        self.draft.summary = summary;
    }

    pub fn set_paragraphs(&mut self, paragraphs: Vec<String>) {
        self.draft.paragraphs = paragraphs;
    }

    pub fn set_banner(&mut self, banner: Option<String>) -> Result<()> {
        if !self.key.has_banner() {
            return Err(SiteError::InvalidInput(format!(
                "Page {} has no banner",
                self.key
            )));
        }
        self.draft.banner = banner.filter(|url| !url.trim().is_empty());
        Ok(())
    }

    pub fn edit_slots(&mut self, op: &SlotOp) -> Result<()> {
        op.apply(&mut self.draft.featured)
    }

    pub fn is_dirty(&self) -> bool {
        serialize_draft(&self.draft)
            .map(|current| current != self.snapshot)
            .unwrap_or(true)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.draft = serde_json::from_str(&self.snapshot)?;
        Ok(())
    }

    /// Capture the cleaned content to write
    pub fn begin_save(&self) -> Result<PageSavePlan> {
        let content = PageContent {
            summary: self.draft.summary.clone(),
            paragraphs: self
                .draft
                .paragraphs
                .iter()
                .filter(|p| !p.trim().is_empty())
                .cloned()
                .collect(),
            featured: self.draft.featured.persisted(),
            banner: if self.key.has_banner() {
                self.draft.banner.clone()
            } else {
                None
            },
        };
        Ok(PageSavePlan {
            key: self.key,
            content,
            captured: serialize_draft(&self.draft)?,
        })
    }

    pub fn finish_save(&mut self, plan: PageSavePlan) -> Result<()> {
        let unchanged = serialize_draft(&self.draft)? == plan.captured;
        let saved = PageDraft::from(plan.content);
        self.snapshot = serialize_draft(&saved)?;
        self.exists = true;
        if unchanged {
            self.draft = saved;
        }
        Ok(())
    }

    pub async fn save(&mut self, store: &dyn DocumentStore) -> Result<()> {
        let plan = self.begin_save()?;
        plan.execute(store).await?;
        self.finish_save(plan)
    }

    pub fn view(&self) -> PageEditorView<'_> {
        PageEditorView {
            key: self.key.as_str(),
            exists: self.exists,
            draft: &self.draft,
            dirty: self.is_dirty(),
        }
    }
}

impl PageSavePlan {
    pub fn content(&self) -> &PageContent {
        &self.content
    }

    pub async fn execute(&self, store: &dyn DocumentStore) -> Result<()> {
        save_page_content(store, self.key, &self.content).await?;
        info!(page = %self.key, "Saved page content");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_never_saved_page_loads_defaults() {
        let store = MemoryStore::new();
        let mut editor = PageEditor::new(PageKey::WhatWeDo);
        editor.load(&store).await.unwrap();
        assert!(!editor.exists());
        assert_eq!(editor.draft(), &PageDraft::default());
        assert!(!editor.is_dirty());
    }

    #[tokio::test]
    async fn test_save_cleans_and_resnapshots() {
        let store = MemoryStore::new();
        let mut editor = PageEditor::new(PageKey::Home);
        editor.load(&store).await.unwrap();

        editor.set_summary("Hello".into());
        editor.set_paragraphs(vec!["One".into(), " ".into()]);
        editor.edit_slots(&SlotOp::Add).unwrap();
        editor.edit_slots(&SlotOp::Add).unwrap();
        editor
            .edit_slots(&SlotOp::Set { index: 1, url: "b.jpg".into() })
            .unwrap();
        editor.set_banner(Some("banner.jpg".into())).unwrap();
        assert!(editor.is_dirty());

        editor.save(&store).await.unwrap();
        assert!(editor.exists());
        assert!(!editor.is_dirty());
        assert_eq!(editor.draft().paragraphs, vec!["One"]);

        let stored = fetch_page_content(&store, PageKey::Home).await.unwrap().unwrap();
        assert_eq!(stored.featured, vec!["b.jpg"]);
        assert_eq!(stored.banner.as_deref(), Some("banner.jpg"));
    }

    #[tokio::test]
    async fn test_cancel_restores_snapshot() {
        let store = MemoryStore::new();
        let mut editor = PageEditor::new(PageKey::Events);
        editor.load(&store).await.unwrap();
        editor.set_summary("Draft".into());
        editor.cancel().unwrap();
        assert_eq!(editor.draft().summary, "");
        assert!(!editor.is_dirty());
    }

    #[test]
    fn test_banner_only_on_home() {
        let mut editor = PageEditor::new(PageKey::Gallery);
        assert!(editor.set_banner(Some("x.jpg".into())).is_err());
    }
}
