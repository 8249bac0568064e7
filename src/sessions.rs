//! Admin edit sessions
//!
//! An edit session owns the edit buffers of one signed-in admin: one
//! [`CollectionEditor`] per entity collection and one [`PageEditor`] per page
//! that has been opened. Buffers are discarded when the session is closed or
//! reaped after being idle.
//!
//! The editor lock is never held across store I/O. A load or commit that
//! completes after its session was closed is discarded.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::User;
use crate::content::entities::{Event, OrderedEntity, StaffMember, Supporter, Testimonial};
use crate::content::pages::PageKey;
use crate::editor::{CollectionEditor, PageEditor, SlotOp};
use crate::store::DocumentStore;
use crate::types::{Result, SiteError};

/// Default idle time before a session is reaped (30 minutes)
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Editable entity collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionName {
    Events,
    Testimonials,
    Supporters,
    StaffMembers,
}

impl CollectionName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Events => Event::COLLECTION,
            CollectionName::Testimonials => Testimonial::COLLECTION,
            CollectionName::Supporters => Supporter::COLLECTION,
            CollectionName::StaffMembers => StaffMember::COLLECTION,
        }
    }
}

impl FromStr for CollectionName {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "events" => Ok(CollectionName::Events),
            "testimonials" => Ok(CollectionName::Testimonials),
            "supporters" => Ok(CollectionName::Supporters),
            "staffMembers" => Ok(CollectionName::StaffMembers),
            other => Err(SiteError::InvalidInput(format!(
                "Unknown collection: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation on a collection editor
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CollectionOp {
    Load,
    Add,
    Select {
        #[serde(default)]
        id: Option<String>,
    },
    /// JSON merge patch of one item's fields
    Update { id: String, patch: Value },
    Reorder { from: usize, to: usize },
    Remove { id: String },
    Slot { id: String, slot: SlotOp },
    Cancel,
    Commit,
}

/// An operation on a page editor
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PageOp {
    Load,
    SetSummary { summary: String },
    SetParagraphs { paragraphs: Vec<String> },
    SetBanner {
        #[serde(default)]
        banner: Option<String>,
    },
    Slot { slot: SlotOp },
    Cancel,
    Save,
}

/// Edit buffers of one session
#[derive(Default)]
pub struct Editors {
    pub events: CollectionEditor<Event>,
    pub testimonials: CollectionEditor<Testimonial>,
    pub supporters: CollectionEditor<Supporter>,
    pub staff: CollectionEditor<StaffMember>,
    pub pages: HashMap<PageKey, PageEditor>,
}

impl Editors {
    fn page(&mut self, key: PageKey) -> &mut PageEditor {
        self.pages.entry(key).or_insert_with(|| PageEditor::new(key))
    }

    /// Whether any buffer has unsaved edits
    pub fn any_dirty(&self) -> bool {
        self.events.is_dirty()
            || self.testimonials.is_dirty()
            || self.supporters.is_dirty()
            || self.staff.is_dirty()
            || self.pages.values().any(PageEditor::is_dirty)
    }
}

type Pick<E> = for<'a> fn(&'a mut Editors) -> &'a mut CollectionEditor<E>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: Uuid,
    pub owner: String,
    pub idle_secs: u64,
}

pub struct EditSession {
    id: Uuid,
    owner: User,
    open: AtomicBool,
    last_active: StdMutex<Instant>,
    editors: Mutex<Editors>,
}

impl EditSession {
    fn new(owner: User) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            open: AtomicBool::new(true),
            last_active: StdMutex::new(Instant::now()),
            editors: Mutex::new(Editors::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &User {
        &self.owner
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn touch(&self) {
        if let Ok(mut last) = self.last_active.lock() {
            *last = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            owner: self.owner.email.clone(),
            idle_secs: self.idle_for().as_secs(),
        }
    }

    /// Lock the editors, failing once the session is closed
    async fn editors(&self) -> Result<MutexGuard<'_, Editors>> {
        let guard = self.editors.lock().await;
        if !self.is_open() {
            return Err(SiteError::NotFound(format!("Edit session {}", self.id)));
        }
        Ok(guard)
    }

    pub async fn has_unsaved_edits(&self) -> bool {
        self.editors.lock().await.any_dirty()
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn collection_view(&self, name: CollectionName) -> Result<Value> {
        let editors = self.editors().await?;
        match name {
            CollectionName::Events => view_of(&editors.events),
            CollectionName::Testimonials => view_of(&editors.testimonials),
            CollectionName::Supporters => view_of(&editors.supporters),
            CollectionName::StaffMembers => view_of(&editors.staff),
        }
    }

    pub async fn collection_op(
        &self,
        store: &dyn DocumentStore,
        name: CollectionName,
        op: CollectionOp,
    ) -> Result<Value> {
        self.touch();
        match name {
            CollectionName::Events => {
                self.run_collection_op::<Event>(store, op, |e| &mut e.events).await
            }
            CollectionName::Testimonials => {
                self.run_collection_op::<Testimonial>(store, op, |e| &mut e.testimonials).await
            }
            CollectionName::Supporters => {
                self.run_collection_op::<Supporter>(store, op, |e| &mut e.supporters).await
            }
            CollectionName::StaffMembers => {
                self.run_collection_op::<StaffMember>(store, op, |e| &mut e.staff).await
            }
        }
    }

    async fn run_collection_op<E: OrderedEntity>(
        &self,
        store: &dyn DocumentStore,
        op: CollectionOp,
        pick: Pick<E>,
    ) -> Result<Value> {
        match op {
            CollectionOp::Load => {
                let items = CollectionEditor::<E>::fetch(store).await?;
                let mut editors = self.editors().await?;
                let editor = pick(&mut editors);
                editor.apply_load(items)?;
                editor_response(editor, None)
            }
            CollectionOp::Commit => {
                let plan = {
                    let mut editors = self.editors().await?;
                    pick(&mut editors).begin_commit()?
                };
                let report = plan.execute(store).await?;
                let mut editors = self.editors().await?;
                let editor = pick(&mut editors);
                editor.finish_commit(plan)?;
                editor_response(editor, Some(json!(report)))
            }
            op => {
                let mut editors = self.editors().await?;
                let editor = pick(&mut editors);
                match op {
                    CollectionOp::Add => {
                        editor.add();
                    }
                    CollectionOp::Select { id } => editor.select(id.as_deref())?,
                    CollectionOp::Update { id, patch } => {
                        editor.patch(&id, &patch)?;
                    }
                    CollectionOp::Reorder { from, to } => editor.reorder(from, to)?,
                    CollectionOp::Remove { id } => editor.remove(&id)?,
                    CollectionOp::Slot { id, slot } => editor.edit_slots(&id, &slot)?,
                    CollectionOp::Cancel => editor.cancel()?,
                    CollectionOp::Load | CollectionOp::Commit => {}
                }
                editor_response(editor, None)
            }
        }
    }

    // =========================================================================
    // Pages
    // =========================================================================

    pub async fn page_view(&self, key: PageKey) -> Result<Value> {
        let mut editors = self.editors().await?;
        Ok(json!({ "editor": editors.page(key).view() }))
    }

    pub async fn page_op(&self, store: &dyn DocumentStore, key: PageKey, op: PageOp) -> Result<Value> {
        self.touch();
        match op {
            PageOp::Load => {
                let content = PageEditor::fetch(store, key).await?;
                let mut editors = self.editors().await?;
                let editor = editors.page(key);
                editor.apply_load(content)?;
                Ok(json!({ "editor": editor.view() }))
            }
            PageOp::Save => {
                let plan = {
                    let mut editors = self.editors().await?;
                    editors.page(key).begin_save()?
                };
                plan.execute(store).await?;
                let mut editors = self.editors().await?;
                let editor = editors.page(key);
                editor.finish_save(plan)?;
                Ok(json!({ "editor": editor.view() }))
            }
            op => {
                let mut editors = self.editors().await?;
                let editor = editors.page(key);
                match op {
                    PageOp::SetSummary { summary } => editor.set_summary(summary),
                    PageOp::SetParagraphs { paragraphs } => editor.set_paragraphs(paragraphs),
                    PageOp::SetBanner { banner } => editor.set_banner(banner)?,
                    PageOp::Slot { slot } => editor.edit_slots(&slot)?,
                    PageOp::Cancel => editor.cancel()?,
                    PageOp::Load | PageOp::Save => {}
                }
                Ok(json!({ "editor": editor.view() }))
            }
        }
    }
}

fn view_of<E: OrderedEntity>(editor: &CollectionEditor<E>) -> Result<Value> {
    editor_response(editor, None)
}

fn editor_response<E: OrderedEntity>(
    editor: &CollectionEditor<E>,
    commit: Option<Value>,
) -> Result<Value> {
    let mut body = json!({ "editor": serde_json::to_value(editor.view())? });
    if let (Some(report), Value::Object(map)) = (commit, &mut body) {
        map.insert("commit".to_string(), report);
    }
    Ok(body)
}

/// All open edit sessions
pub struct EditSessions {
    sessions: DashMap<Uuid, Arc<EditSession>>,
    idle_timeout: Duration,
}

impl Default for EditSessions {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl EditSessions {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    pub fn open(&self, owner: User) -> Arc<EditSession> {
        let session = Arc::new(EditSession::new(owner));
        self.sessions.insert(session.id(), Arc::clone(&session));
        info!(session = %session.id(), owner = %session.owner().email, "Opened edit session");
        session
    }

    /// A session owned by `owner`
    pub fn get(&self, id: Uuid, owner: &User) -> Result<Arc<EditSession>> {
        let session = self
            .sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| SiteError::NotFound(format!("Edit session {}", id)))?;
        if session.owner().id != owner.id {
            return Err(SiteError::Forbidden(format!(
                "Edit session {} belongs to another user",
                id
            )));
        }
        session.touch();
        Ok(session)
    }

    /// Close a session, discarding its buffers
    pub fn close(&self, id: Uuid, owner: &User) -> Result<()> {
        let session = self.get(id, owner)?;
        self.sessions.remove(&id);
        session.close();
        info!(session = %id, "Closed edit session");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close sessions idle for longer than the timeout
    pub fn reap_idle(&self) -> usize {
        let idle: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.idle_for() > self.idle_timeout)
            .map(|entry| *entry.key())
            .collect();

        let count = idle.len();
        for id in idle {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.close();
            }
        }
        if count > 0 {
            debug!(count = count, "Reaped idle edit sessions");
        }
        count
    }
}

/// Spawn a background task that reaps idle sessions
pub fn spawn_cleanup_task(sessions: Arc<EditSessions>) {
    let interval = (sessions.idle_timeout / 4).max(Duration::from_secs(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            let removed = sessions.reap_idle();
            debug!(
                removed = removed,
                open = sessions.len(),
                "Edit session cleanup completed"
            );
        }
    });

    info!("Edit session cleanup task started");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn admin(id: &str) -> User {
        User {
            id: id.into(),
            email: format!("{}@example.org", id),
        }
    }

    #[test]
    fn test_collection_names() {
        for name in ["events", "testimonials", "supporters", "staffMembers"] {
            assert_eq!(name.parse::<CollectionName>().unwrap().as_str(), name);
        }
        assert!("pages".parse::<CollectionName>().is_err());
    }

    #[test]
    fn test_op_parsing() {
        let op: CollectionOp =
            serde_json::from_value(json!({"op": "reorder", "from": 0, "to": 2})).unwrap();
        assert!(matches!(op, CollectionOp::Reorder { from: 0, to: 2 }));
        let op: PageOp = serde_json::from_value(json!({"op": "set_summary", "summary": "Hi"})).unwrap();
        assert!(matches!(op, PageOp::SetSummary { .. }));
    }

    #[test]
    fn test_sessions_are_owned() {
        let sessions = EditSessions::default();
        let session = sessions.open(admin("a"));
        assert!(sessions.get(session.id(), &admin("a")).is_ok());
        assert!(matches!(
            sessions.get(session.id(), &admin("b")),
            Err(SiteError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_session_rejects_edits() {
        let store = MemoryStore::new();
        let sessions = EditSessions::default();
        let session = sessions.open(admin("a"));

        session
            .collection_op(&store, CollectionName::Events, CollectionOp::Add)
            .await
            .unwrap();
        sessions.close(session.id(), &admin("a")).unwrap();

        assert!(sessions.is_empty());
        assert!(matches!(
            session
                .collection_op(&store, CollectionName::Events, CollectionOp::Load)
                .await,
            Err(SiteError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reap_idle() {
        let sessions = EditSessions::new(Duration::ZERO);
        let session = sessions.open(admin("a"));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(sessions.reap_idle(), 1);
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn test_page_ops() {
        let store = MemoryStore::new();
        let sessions = EditSessions::default();
        let session = sessions.open(admin("a"));

        let view = session.page_op(&store, PageKey::Home, PageOp::Load).await.unwrap();
        assert_eq!(view["editor"]["exists"], json!(false));

        session
            .page_op(&store, PageKey::Home, PageOp::SetSummary { summary: "Hi".into() })
            .await
            .unwrap();
        assert!(session.has_unsaved_edits().await);

        let view = session.page_op(&store, PageKey::Home, PageOp::Save).await.unwrap();
        assert_eq!(view["editor"]["exists"], json!(true));
        assert_eq!(view["editor"]["dirty"], json!(false));
    }
}
