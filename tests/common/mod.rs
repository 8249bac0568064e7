//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use clap::Parser;
use lantern::config::Args;
use lantern::objects::{FsObjectStore, ObjectStore};
use lantern::server::{handle_request, AppState};
use lantern::store::{
    CollectionPath, DocPath, Document, DocumentStore, MemoryStore, OrderBy, StoredDoc, WriteBatch,
};
use lantern::types::{Result, SiteError};

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const ADMIN_EMAIL: &str = "admin@example.org";

/// Memory store that records every write and can be told to fail
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryStore,
    batches: Mutex<Vec<WriteBatch>>,
    deletes: Mutex<Vec<DocPath>>,
    fail_commits: AtomicBool,
    fail_deletes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> Vec<WriteBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// Single-document deletes issued outside a batch
    pub fn deletes(&self) -> Vec<DocPath> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn clear_log(&self) {
        self.batches.lock().unwrap().clear();
        self.deletes.lock().unwrap().clear();
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>> {
        self.inner.get(path).await
    }

    async fn list(
        &self,
        collection: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<StoredDoc>> {
        self.inner.list(collection, order).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(SiteError::Store("injected commit failure".into()));
        }
        self.batches.lock().unwrap().push(batch.clone());
        self.inner.commit(batch).await
    }

    async fn delete(&self, path: &DocPath) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(SiteError::Store("injected delete failure".into()));
        }
        self.deletes.lock().unwrap().push(path.clone());
        self.inner.delete(path).await
    }
}

/// Filesystem object store that records deletes and can refuse some of them
pub struct RecordingObjects {
    inner: FsObjectStore,
    _dir: TempDir,
    deleted: Mutex<Vec<String>>,
    refuse_delete: Mutex<HashSet<String>>,
    refuse_put: Mutex<HashSet<String>>,
}

impl RecordingObjects {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let inner = FsObjectStore::new(dir.path(), "http://localhost:8080/objects")
            .await
            .unwrap();
        Self {
            inner,
            _dir: dir,
            deleted: Mutex::new(Vec::new()),
            refuse_delete: Mutex::new(HashSet::new()),
            refuse_put: Mutex::new(HashSet::new()),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Fail deletes of the object behind `url`
    pub fn refuse_delete_of(&self, url: &str) {
        let path = self.inner.path_for_url(url).unwrap();
        self.refuse_delete.lock().unwrap().insert(path);
    }

    /// Fail uploads whose object path ends with `file_name`
    pub fn refuse_put_of(&self, file_name: &str) {
        self.refuse_put.lock().unwrap().insert(file_name.to_string());
    }
}

#[async_trait]
impl ObjectStore for RecordingObjects {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<String> {
        let refused = self
            .refuse_put
            .lock()
            .unwrap()
            .iter()
            .any(|name| path.ends_with(name.as_str()));
        if refused {
            return Err(SiteError::Object(format!("injected upload failure for {}", path)));
        }
        self.inner.put(path, data, progress).await
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.get(path).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.refuse_delete.lock().unwrap().contains(path) {
            return Err(SiteError::Object(format!("injected delete failure for {}", path)));
        }
        self.inner.delete(path).await?;
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        self.inner.url_for(path)
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        self.inner.path_for_url(url)
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: Arc<RecordingStore>,
    pub objects: Arc<RecordingObjects>,
}

async fn build_app(argv: &[&str]) -> TestApp {
    let args = Args::try_parse_from(argv).unwrap();
    let store = Arc::new(RecordingStore::new());
    let objects = Arc::new(RecordingObjects::new().await);
    let state = AppState::new(
        args,
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        "memory",
        Arc::clone(&objects) as Arc<dyn ObjectStore>,
    )
    .unwrap();
    TestApp {
        state: Arc::new(state),
        store,
        objects,
    }
}

/// App in dev mode: every caller is an admin
pub async fn dev_app() -> TestApp {
    build_app(&["lantern", "--dev-mode"]).await
}

/// App in production mode with one allowlisted admin
pub async fn secured_app() -> TestApp {
    build_app(&[
        "lantern",
        "--jwt-secret",
        TEST_SECRET,
        "--admin-emails",
        ADMIN_EMAIL,
    ])
    .await
}

impl TestApp {
    pub fn token_for(&self, email: &str) -> String {
        self.state.identity.jwt().issue("user-1", email, 3600).unwrap()
    }

    /// Send a request through the router and decode the JSON reply
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Bytes::from(json.to_string())
            }
            None => Bytes::new(),
        };
        let request = builder.body(Full::new(body)).unwrap();

        let response = handle_request(Arc::clone(&self.state), request).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
