//! Public page views

use serde::Serialize;

use super::{arrange_events, display_title, group_covers, load_entities, ArrangedEvent, GroupCover};
use crate::content::entities::{Event, OrderedEntity, StaffMember, Supporter, Testimonial};
use crate::content::gallery::{groups_collection, photos_collection, GalleryGroup, Photo};
use crate::content::pages::{fetch_page_content, PageContent, PageKey};
use crate::content::today;
use crate::store::{decode_doc, DocumentStore, OrderBy, StoredDoc};
use crate::types::{Result, SiteError};

/// Featured photos shown on a content page
pub const FEATURED_LIMIT: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPageView {
    pub key: &'static str,
    pub content: PageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<ArrangedEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupCover>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff: Option<Vec<StaffMember>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supporters: Option<Vec<Supporter>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub testimonials: Option<Vec<Testimonial>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub content: PageContent,
    pub events: Vec<ArrangedEvent>,
    pub staff: Vec<StaffMember>,
    pub supporters: Vec<Supporter>,
    pub testimonials: Vec<Testimonial>,
    pub groups: Vec<GroupCover>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryGroupView {
    pub group: GalleryGroup,
    pub photos: Vec<Photo>,
}

async fn by_order<E: OrderedEntity>(store: &dyn DocumentStore) -> Result<Vec<E>> {
    load_entities(store, &OrderBy::asc("order")).await
}

async fn timeline(store: &dyn DocumentStore) -> Result<Vec<ArrangedEvent>> {
    let events: Vec<Event> = load_entities(store, &OrderBy::asc("date")).await?;
    Ok(arrange_events(events, &today()))
}

/// A content page with the data specific to it
pub async fn content_page_view(store: &dyn DocumentStore, key: PageKey) -> Result<ContentPageView> {
    let mut content = fetch_page_content(store, key).await?.unwrap_or_default();
    content.featured.truncate(FEATURED_LIMIT);

    let mut view = ContentPageView {
        key: key.as_str(),
        content,
        events: None,
        groups: None,
        staff: None,
        supporters: None,
        testimonials: None,
    };

    match key {
        PageKey::Events => view.events = Some(timeline(store).await?),
        PageKey::Gallery => view.groups = Some(group_covers(store).await?),
        PageKey::WhoWeAre => {
            view.staff = Some(by_order(store).await?);
            view.supporters = Some(by_order(store).await?);
        }
        PageKey::Supporters => view.supporters = Some(by_order(store).await?),
        PageKey::Testimonials => view.testimonials = Some(by_order(store).await?),
        PageKey::Home | PageKey::WhatWeDo => {}
    }
    Ok(view)
}

pub async fn home_view(store: &dyn DocumentStore) -> Result<HomeView> {
    let content = fetch_page_content(store, PageKey::Home)
        .await?
        .unwrap_or_default();

    Ok(HomeView {
        content,
        events: timeline(store).await?,
        staff: by_order(store).await?,
        supporters: by_order(store).await?,
        testimonials: by_order(store).await?,
        groups: group_covers(store).await?,
    })
}

/// A gallery group with its photos in order
pub async fn gallery_group_view(store: &dyn DocumentStore, group_id: &str) -> Result<GalleryGroupView> {
    let data = store
        .get(&groups_collection().doc(group_id))
        .await?
        .ok_or_else(|| SiteError::NotFound(format!("Gallery group {}", group_id)))?;
    let mut group: GalleryGroup = decode_doc(&StoredDoc {
        id: group_id.to_string(),
        data,
    })?;
    group.title = display_title(&group.title);

    let photos = store
        .list(&photos_collection(group_id), Some(&OrderBy::asc("order")))
        .await?
        .iter()
        .map(decode_doc)
        .collect::<Result<_>>()?;

    Ok(GalleryGroupView { group, photos })
}
