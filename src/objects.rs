//! Object storage for uploaded photos
//!
//! Objects are addressed by slash-separated paths such as
//! `galleryGroups/{groupId}/{photoId}-{fileName}` and published under a public
//! base URL. [`FsObjectStore`] keeps them in a local directory tree.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::types::{Result, SiteError};

/// Write size between progress reports (64KB)
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Narrow interface to the object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `path`, reporting progress (0-100) as it is written.
    /// Returns the public URL of the stored object.
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<String>;

    /// Read an object back
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete an object; a missing object is `SiteError::NotFound`
    async fn delete(&self, path: &str) -> Result<()>;

    /// Public URL for an object path
    fn url_for(&self, path: &str) -> String;

    /// Object path for a public URL produced by this store
    fn path_for_url(&self, url: &str) -> Option<String>;
}

/// Object path for an uploaded gallery photo
pub fn photo_object_path(group_id: &str, photo_id: &str, file_name: &str) -> String {
    format!(
        "galleryGroups/{}/{}-{}",
        group_id,
        photo_id,
        sanitize_file_name(file_name)
    )
}

/// Keep a client-supplied file name inside a single path segment
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c.is_control() { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim_matches('.').trim();
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Content type guessed from the object's extension
pub fn content_type_for(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

/// Filesystem-backed [`ObjectStore`]
pub struct FsObjectStore {
    root_dir: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    /// Create a store rooted at `root_dir`, publishing under `public_base_url`
    pub async fn new<P: AsRef<Path>>(root_dir: P, public_base_url: &str) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        fs::create_dir_all(&root_dir).await?;

        info!(path = %root_dir.display(), base = %public_base_url, "Initialized object store");

        Ok(Self {
            root_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve an object path to a file, rejecting anything that escapes the root
    fn file_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let is_clean = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_clean {
            return Err(SiteError::InvalidInput(format!("Invalid object path: {}", path)));
        }
        Ok(self.root_dir.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        path: &str,
        data: &[u8],
        progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<String> {
        let file_path = self.file_path(path)?;
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        progress(0);
        let mut file = fs::File::create(&file_path).await?;
        let total = data.len().max(1);
        let mut written = 0usize;
        for chunk in data.chunks(CHUNK_SIZE) {
            file.write_all(chunk).await?;
            written += chunk.len();
            progress(((written * 100) / total).min(100) as u8);
        }
        file.flush().await?;
        progress(100);

        debug!(path = %path, size = data.len(), "Stored object");
        Ok(self.url_for(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.file_path(path)?;
        match fs::read(&file_path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SiteError::NotFound(format!("Object {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let file_path = self.file_path(path)?;
        match fs::remove_file(&file_path).await {
            Ok(()) => {
                info!(path = %path, "Deleted object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SiteError::NotFound(format!("Object {}", path)))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn url_for(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix('/')?;
        let decoded: Option<Vec<String>> = rest
            .split('/')
            .map(|segment| urlencoding::decode(segment).ok().map(|s| s.into_owned()))
            .collect();
        decoded.map(|segments| segments.join("/"))
    }
}
