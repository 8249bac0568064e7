//! Read-only views composed from stored content
//!
//! - [`public`]: home page, content pages and gallery groups
//! - [`overview`]: the admin dashboard

pub mod overview;
pub mod public;

use serde::Serialize;

use crate::content::entities::{Event, OrderedEntity};
use crate::content::gallery::{groups_collection, photos_collection, GalleryGroup};
use crate::store::{decode_doc, DocumentStore, OrderBy};
use crate::types::Result;

pub use overview::{admin_overview, AdminOverview};
pub use public::{content_page_view, gallery_group_view, home_view, ContentPageView, GalleryGroupView, HomeView};

const UNTITLED: &str = "Untitled";

/// An event placed on the public timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub is_past: bool,
}

/// The most recent past event, then every upcoming event soonest first.
///
/// Undated events are left out. `today` is `YYYY-MM-DD`; an event dated
/// today counts as upcoming.
pub fn arrange_events(events: Vec<Event>, today: &str) -> Vec<ArrangedEvent> {
    let (mut past, mut upcoming): (Vec<Event>, Vec<Event>) = events
        .into_iter()
        .filter(|e| !e.date.is_empty())
        .partition(|e| e.date.as_str() < today);

    past.sort_by(|a, b| b.date.cmp(&a.date));
    upcoming.sort_by(|a, b| a.date.cmp(&b.date));

    past.into_iter()
        .take(1)
        .map(|event| ArrangedEvent { event, is_past: true })
        .chain(
            upcoming
                .into_iter()
                .map(|event| ArrangedEvent { event, is_past: false }),
        )
        .collect()
}

/// A gallery group with the photo used as its cover
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCover {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

pub(crate) async fn load_entities<E: OrderedEntity>(
    store: &dyn DocumentStore,
    order: &OrderBy,
) -> Result<Vec<E>> {
    let docs = store.list(&E::collection(), Some(order)).await?;
    docs.iter().map(decode_doc).collect()
}

pub(crate) async fn load_groups(store: &dyn DocumentStore) -> Result<Vec<GalleryGroup>> {
    let docs = store
        .list(&groups_collection(), Some(&OrderBy::desc("date")))
        .await?;
    docs.iter().map(decode_doc).collect()
}

/// Groups newest first, each with its first photo as cover
pub(crate) async fn group_covers(store: &dyn DocumentStore) -> Result<Vec<GroupCover>> {
    let groups = load_groups(store).await?;
    let mut covers = Vec::with_capacity(groups.len());
    for group in groups {
        let photos = store
            .list(&photos_collection(&group.id), Some(&OrderBy::asc("order")))
            .await?;
        let cover = photos.iter().find_map(|p| {
            p.data
                .get("url")
                .and_then(|url| url.as_str())
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        });
        covers.push(GroupCover {
            id: group.id,
            title: display_title(&group.title),
            cover,
        });
    }
    Ok(covers)
}

pub(crate) fn display_title(title: &str) -> String {
    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, date: &str) -> Event {
        Event {
            id: id.into(),
            date: date.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_arrange_events() {
        let events = vec![
            event("old", "2024-01-10"),
            event("recent", "2024-05-30"),
            event("undated", ""),
            event("later", "2024-09-01"),
            event("today", "2024-06-01"),
        ];
        let arranged = arrange_events(events, "2024-06-01");
        let order: Vec<(&str, bool)> = arranged
            .iter()
            .map(|a| (a.event.id.as_str(), a.is_past))
            .collect();
        assert_eq!(
            order,
            vec![("recent", true), ("today", false), ("later", false)]
        );
    }

    #[test]
    fn test_arrange_without_past() {
        let arranged = arrange_events(vec![event("next", "2030-01-01")], "2024-06-01");
        assert_eq!(arranged.len(), 1);
        assert!(!arranged[0].is_past);
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title(""), "Untitled");
        assert_eq!(display_title("Spring"), "Spring");
    }
}
