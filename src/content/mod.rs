//! Site content: pages, ordered entities and the photo gallery

pub mod entities;
pub mod gallery;
pub mod pages;
pub mod uploads;

pub use entities::{Event, OrderedEntity, StaffMember, Supporter, Testimonial};
pub use gallery::{GalleryGroup, GalleryService, Photo};
pub use pages::{fetch_page_content, save_page_content, PageContent, PageKey};
pub use uploads::{UploadProgress, UploadStatus, UploadTracker};

/// Today's date (UTC) as `YYYY-MM-DD`
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_format() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
    }
}
