//! Per-file upload progress

use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub id: String,
    pub group_id: String,
    pub file_name: String,
    /// 0-100
    pub progress: u8,
    pub status: UploadStatus,
}

/// Progress of every upload started since the tracker was created
#[derive(Default)]
pub struct UploadTracker {
    uploads: DashMap<String, UploadProgress>,
}

impl UploadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, id: &str, group_id: &str, file_name: &str) {
        self.uploads.insert(
            id.to_string(),
            UploadProgress {
                id: id.to_string(),
                group_id: group_id.to_string(),
                file_name: file_name.to_string(),
                progress: 0,
                status: UploadStatus::Uploading,
            },
        );
    }

    /// Progress never goes backwards and stops moving once the upload settles
    pub fn set_progress(&self, id: &str, progress: u8) {
        if let Some(mut entry) = self.uploads.get_mut(id) {
            if entry.status == UploadStatus::Uploading {
                entry.progress = entry.progress.max(progress.min(100));
            }
        }
    }

    pub fn finish(&self, id: &str) {
        if let Some(mut entry) = self.uploads.get_mut(id) {
            entry.progress = 100;
            entry.status = UploadStatus::Done;
        }
    }

    pub fn fail(&self, id: &str) {
        if let Some(mut entry) = self.uploads.get_mut(id) {
            entry.status = UploadStatus::Error;
        }
    }

    pub fn get(&self, id: &str) -> Option<UploadProgress> {
        self.uploads.get(id).map(|entry| entry.value().clone())
    }

    /// Uploads, optionally limited to one gallery group
    pub fn list(&self, group_id: Option<&str>) -> Vec<UploadProgress> {
        let mut uploads: Vec<UploadProgress> = self
            .uploads
            .iter()
            .filter(|entry| group_id.map_or(true, |g| entry.group_id == g))
            .map(|entry| entry.value().clone())
            .collect();
        uploads.sort_by(|a, b| a.file_name.cmp(&b.file_name).then_with(|| a.id.cmp(&b.id)));
        uploads
    }

    /// Forget settled uploads, returning how many were dropped
    pub fn clear_finished(&self) -> usize {
        let before = self.uploads.len();
        self.uploads
            .retain(|_, upload| upload.status == UploadStatus::Uploading);
        before - self.uploads.len()
    }
}
