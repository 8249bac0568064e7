//! Gallery groups and their photos
//!
//! Groups live at `galleryGroups/{groupId}` with their photos in the
//! `galleryGroups/{groupId}/photos` sub-collection. Photo files go to the
//! object store under `galleryGroups/{groupId}/{photoId}-{fileName}`.
//!
//! Document writes are authoritative; object deletes that follow them are
//! best-effort and only logged when they fail.

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::today;
use super::uploads::UploadTracker;
use crate::objects::{photo_object_path, ObjectStore};
use crate::store::{
    decode_doc, encode_doc, CollectionPath, Direction, Document, DocumentStore, OrderBy,
    StoredDoc, WriteBatch,
};
use crate::types::{Result, SiteError};

pub const GROUPS_COLLECTION: &str = "galleryGroups";
pub const PHOTOS_COLLECTION: &str = "photos";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GalleryGroup {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Photo {
    pub id: String,
    pub url: String,
    pub caption: String,
    pub date: String,
    pub name: String,
    pub order: Option<i64>,
    pub file_name: String,
}

/// A group with its photo count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: GalleryGroup,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupSortField {
    Title,
    Date,
    Size,
}

/// Client-selected ordering of the group list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct GroupSort {
    pub sort: GroupSortField,
    #[serde(default = "default_direction")]
    pub dir: Direction,
}

fn default_direction() -> Direction {
    Direction::Asc
}

impl GroupSort {
    pub fn apply(&self, groups: &mut [GroupSummary]) {
        groups.sort_by(|a, b| {
            let ord = match self.sort {
                GroupSortField::Title => a
                    .group
                    .title
                    .to_lowercase()
                    .cmp(&b.group.title.to_lowercase()),
                GroupSortField::Date => a.group.date.cmp(&b.group.date),
                GroupSortField::Size => a.size.cmp(&b.size),
            };
            match self.dir {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        });
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGroup {
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
}

/// Group fields to merge; absent fields are left as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

/// Photo fields to merge; absent fields are left as stored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoMeta {
    pub caption: Option<String>,
    pub date: Option<String>,
    pub name: Option<String>,
}

/// One file of an upload batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOutcome {
    pub id: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Photo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveGroupReport {
    pub photos_deleted: usize,
    pub objects_deleted: usize,
    pub objects_failed: usize,
}

/// Photos grouped by gallery group, for picking featured photos
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogGroup {
    pub group_id: String,
    pub group_title: String,
    pub photos: Vec<Photo>,
}

pub fn groups_collection() -> CollectionPath {
    CollectionPath::root(GROUPS_COLLECTION)
}

pub fn photos_collection(group_id: &str) -> CollectionPath {
    CollectionPath::sub(&groups_collection().doc(group_id), PHOTOS_COLLECTION)
}

/// Gallery operations over the document and object stores
#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    uploads: Arc<UploadTracker>,
}

impl GalleryService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        uploads: Arc<UploadTracker>,
    ) -> Self {
        Self {
            store,
            objects,
            uploads,
        }
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Groups by date, newest first
    pub async fn groups(&self) -> Result<Vec<GalleryGroup>> {
        let docs = self
            .store
            .list(&groups_collection(), Some(&OrderBy::desc("date")))
            .await?;
        docs.iter().map(decode_doc).collect()
    }

    /// Groups with photo counts; newest first unless `sort` says otherwise
    pub async fn list_groups(&self, sort: Option<GroupSort>) -> Result<Vec<GroupSummary>> {
        let groups = self.groups().await?;
        let sizes = join_all(groups.iter().map(|g| async move {
            let photos_path = photos_collection(&g.id);
            self.store.list(&photos_path, None).await
        }))
        .await;

        let mut summaries = Vec::with_capacity(groups.len());
        for (group, photos) in groups.into_iter().zip(sizes) {
            summaries.push(GroupSummary {
                size: photos?.len(),
                group,
            });
        }
        if let Some(sort) = sort {
            sort.apply(&mut summaries);
        }
        Ok(summaries)
    }

    pub async fn get_group(&self, group_id: &str) -> Result<GalleryGroup> {
        let path = groups_collection().doc(group_id);
        let data = self
            .store
            .get(&path)
            .await?
            .ok_or_else(|| SiteError::NotFound(format!("Gallery group {}", group_id)))?;
        decode_doc(&StoredDoc {
            id: group_id.to_string(),
            data,
        })
    }

    pub async fn create_group(&self, new_group: NewGroup) -> Result<GalleryGroup> {
        let title = new_group.title.trim();
        if title.is_empty() {
            return Err(SiteError::InvalidInput("Group title is required".into()));
        }
        let group = GalleryGroup {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: format!("{} highlights", title),
            date: new_group
                .date
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(today),
        };
        self.store
            .set(&groups_collection().doc(&group.id), encode_doc(&group)?, false)
            .await?;

        info!(group_id = %group.id, title = %group.title, "Created gallery group");
        Ok(group)
    }

    pub async fn save_group_meta(&self, group_id: &str, meta: GroupMeta) -> Result<GalleryGroup> {
        self.get_group(group_id).await?;
        self.store
            .set(&groups_collection().doc(group_id), encode_doc(&meta)?, true)
            .await?;
        debug!(group_id = %group_id, "Saved gallery group metadata");
        self.get_group(group_id).await
    }

    /// Delete a group with all its photos.
    ///
    /// Photo documents and the group document go in one atomic batch; the
    /// stored files are deleted afterwards and failures there are only logged.
    pub async fn remove_group(&self, group_id: &str) -> Result<RemoveGroupReport> {
        let photos_path = photos_collection(group_id);
        let photos: Vec<Photo> = self
            .store
            .list(&photos_path, None)
            .await?
            .iter()
            .map(decode_doc)
            .collect::<Result<_>>()?;

        let mut batch = WriteBatch::new();
        for photo in &photos {
            batch.delete(photos_path.doc(&photo.id));
        }
        batch.delete(groups_collection().doc(group_id));
        self.store.commit(batch).await?;

        let urls: Vec<&str> = photos
            .iter()
            .map(|p| p.url.as_str())
            .filter(|url| !url.is_empty())
            .collect();
        let results = join_all(urls.iter().map(|url| self.delete_object_for_url(url))).await;
        let objects_deleted = results.iter().filter(|deleted| **deleted).count();

        let report = RemoveGroupReport {
            photos_deleted: photos.len(),
            objects_deleted,
            objects_failed: results.len() - objects_deleted,
        };
        info!(
            group_id = %group_id,
            photos = report.photos_deleted,
            objects_failed = report.objects_failed,
            "Removed gallery group"
        );
        Ok(report)
    }

    // =========================================================================
    // Photos
    // =========================================================================

    /// Photos of a group by order, assigning orders first if any are missing
    pub async fn load_photos(&self, group_id: &str) -> Result<Vec<Photo>> {
        let photos_path = photos_collection(group_id);
        let mut photos: Vec<Photo> = self
            .store
            .list(&photos_path, Some(&OrderBy::asc("order")))
            .await?
            .iter()
            .map(decode_doc)
            .collect::<Result<_>>()?;

        if photos.iter().any(|p| p.order.is_none()) {
            let mut batch = WriteBatch::new();
            for (index, photo) in photos.iter_mut().enumerate() {
                photo.order = Some(index as i64);
                batch.merge(photos_path.doc(&photo.id), order_body(index));
            }
            self.store.commit(batch).await?;
            info!(group_id = %group_id, count = photos.len(), "Normalized photo order");
        }
        Ok(photos)
    }

    /// Upload a batch of files into a group.
    ///
    /// Files upload concurrently; a failed file is reported in its outcome
    /// and does not stop the others.
    pub async fn upload_photos(
        &self,
        group_id: &str,
        files: Vec<UploadFile>,
    ) -> Result<Vec<UploadOutcome>> {
        let group = self.get_group(group_id).await?;
        let start = self.store.list(&photos_collection(group_id), None).await?.len();
        let title = if group.title.is_empty() {
            "Gallery".to_string()
        } else {
            group.title.clone()
        };

        let outcomes = join_all(
            files
                .into_iter()
                .enumerate()
                .map(|(position, file)| self.upload_one(group_id, &title, start + position, file)),
        )
        .await;

        let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
        info!(
            group_id = %group_id,
            uploaded = outcomes.len() - failed,
            failed,
            "Upload batch finished"
        );
        Ok(outcomes)
    }

    async fn upload_one(
        &self,
        group_id: &str,
        title: &str,
        index: usize,
        file: UploadFile,
    ) -> UploadOutcome {
        let id = Uuid::new_v4().to_string();
        self.uploads.start(&id, group_id, &file.file_name);

        match self.store_photo(group_id, title, index, &id, &file).await {
            Ok(photo) => {
                self.uploads.finish(&id);
                UploadOutcome {
                    id,
                    file_name: file.file_name,
                    photo: Some(photo),
                    error: None,
                }
            }
            Err(e) => {
                warn!(group_id = %group_id, file = %file.file_name, error = %e, "Photo upload failed");
                self.uploads.fail(&id);
                UploadOutcome {
                    id,
                    file_name: file.file_name,
                    photo: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn store_photo(
        &self,
        group_id: &str,
        title: &str,
        index: usize,
        id: &str,
        file: &UploadFile,
    ) -> Result<Photo> {
        let object_path = photo_object_path(group_id, id, &file.file_name);
        let uploads = Arc::clone(&self.uploads);
        let progress_id = id.to_string();
        let report = move |pct: u8| uploads.set_progress(&progress_id, pct);

        let url = self.objects.put(&object_path, &file.data, &report).await?;

        let photo = Photo {
            id: id.to_string(),
            url,
            caption: String::new(),
            date: today(),
            name: format!("{} {}", title, index + 1),
            order: Some(index as i64),
            file_name: file.file_name.clone(),
        };
        let written = match encode_doc(&photo) {
            Ok(doc) => {
                self.store
                    .set(&photos_collection(group_id).doc(id), doc, false)
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = self.objects.delete(&object_path).await {
                warn!(path = %object_path, error = %cleanup, "Failed to delete orphaned photo object");
            }
            return Err(e);
        }
        Ok(photo)
    }

    pub async fn save_photo(&self, group_id: &str, photo_id: &str, meta: PhotoMeta) -> Result<()> {
        let path = photos_collection(group_id).doc(photo_id);
        if self.store.get(&path).await?.is_none() {
            return Err(SiteError::NotFound(format!("Photo {}", photo_id)));
        }
        self.store.set(&path, encode_doc(&meta)?, true).await
    }

    /// Persist a new photo sequence: `order := index` for each id.
    ///
    /// `photo_ids` must name every photo of the group exactly once.
    pub async fn save_photo_order(&self, group_id: &str, photo_ids: &[String]) -> Result<()> {
        let photos_path = photos_collection(group_id);
        let existing: HashSet<String> = self
            .store
            .list(&photos_path, None)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        let requested: HashSet<&str> = photo_ids.iter().map(String::as_str).collect();
        let is_permutation = requested.len() == photo_ids.len()
            && photo_ids.len() == existing.len()
            && requested.iter().all(|id| existing.contains(*id));
        if !is_permutation {
            return Err(SiteError::InvalidInput(format!(
                "Photo order must list each of the {} photos in group {} exactly once",
                existing.len(),
                group_id
            )));
        }

        let mut batch = WriteBatch::new();
        for (index, id) in photo_ids.iter().enumerate() {
            batch.merge(photos_path.doc(id), order_body(index));
        }
        self.store.commit(batch).await?;
        debug!(group_id = %group_id, count = photo_ids.len(), "Saved photo order");
        Ok(())
    }

    /// Delete one photo document, then its file (best-effort)
    pub async fn remove_photo(&self, group_id: &str, photo_id: &str) -> Result<()> {
        let path = photos_collection(group_id).doc(photo_id);
        let url = self
            .store
            .get(&path)
            .await?
            .and_then(|doc| doc.get("url").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();

        self.store.delete(&path).await?;
        if !url.is_empty() {
            self.delete_object_for_url(&url).await;
        }
        info!(group_id = %group_id, photo_id = %photo_id, "Removed photo");
        Ok(())
    }

    /// Every photo, grouped by gallery group
    pub async fn photo_catalog(&self) -> Result<Vec<CatalogGroup>> {
        let groups = self.groups().await?;
        let listings = join_all(groups.iter().map(|g| async move {
            let photos_path = photos_collection(&g.id);
            self.store
                .list(&photos_path, Some(&OrderBy::asc("order")))
                .await
        }))
        .await;

        let mut catalog = Vec::with_capacity(groups.len());
        for (group, listing) in groups.into_iter().zip(listings) {
            let photos: Vec<Photo> = listing?
                .iter()
                .map(decode_doc)
                .collect::<Result<Vec<Photo>>>()?
                .into_iter()
                .filter(|p| !p.url.is_empty())
                .collect();
            catalog.push(CatalogGroup {
                group_id: group.id,
                group_title: group.title,
                photos,
            });
        }
        Ok(catalog)
    }

    /// Best-effort object delete; returns whether the file is gone
    async fn delete_object_for_url(&self, url: &str) -> bool {
        let Some(path) = self.objects.path_for_url(url) else {
            warn!(url = %url, "Photo URL is not managed by the object store");
            return false;
        };
        match self.objects.delete(&path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to delete photo object");
                false
            }
        }
    }
}

fn order_body(index: usize) -> Document {
    match json!({ "order": index }) {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(title: &str, date: &str, size: usize) -> GroupSummary {
        GroupSummary {
            group: GalleryGroup {
                id: title.to_lowercase(),
                title: title.into(),
                description: String::new(),
                date: date.into(),
            },
            size,
        }
    }

    #[test]
    fn test_group_sort() {
        let mut groups = vec![
            summary("beta", "2024-01-01", 5),
            summary("Alpha", "2023-05-01", 9),
            summary("gamma", "2025-02-01", 1),
        ];

        GroupSort { sort: GroupSortField::Title, dir: Direction::Asc }.apply(&mut groups);
        let titles: Vec<_> = groups.iter().map(|g| g.group.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta", "gamma"]);

        GroupSort { sort: GroupSortField::Size, dir: Direction::Desc }.apply(&mut groups);
        let sizes: Vec<_> = groups.iter().map(|g| g.size).collect();
        assert_eq!(sizes, vec![9, 5, 1]);
    }

    #[test]
    fn test_group_sort_from_query() {
        let sort: GroupSort = serde_urlencoded::from_str("sort=date&dir=desc").unwrap();
        assert_eq!(sort.sort, GroupSortField::Date);
        assert_eq!(sort.dir, Direction::Desc);
        let sort: GroupSort = serde_urlencoded::from_str("sort=size").unwrap();
        assert_eq!(sort.dir, Direction::Asc);
    }

    #[test]
    fn test_summary_flattens_group() {
        let value = serde_json::to_value(summary("Fair", "2024-05-01", 3)).unwrap();
        assert_eq!(value["title"], "Fair");
        assert_eq!(value["size"], 3);
    }

    #[test]
    fn test_partial_meta_encodes_only_given_fields() {
        let meta: GroupMeta = serde_json::from_value(json!({"description": "Rainy"})).unwrap();
        let doc = encode_doc(&meta).unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc["description"], "Rainy");
    }

    #[test]
    fn test_photo_paths() {
        assert_eq!(photos_collection("g1").as_str(), "galleryGroups/g1/photos");
    }
}
