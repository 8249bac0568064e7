//! Admin dashboard
//!
//! Every section is loaded on its own; a section that fails is logged and
//! left out so the rest of the dashboard still renders.

use futures_util::future::join_all;
use serde::Serialize;
use std::future::Future;
use tracing::warn;

use super::{display_title, load_entities, load_groups};
use crate::content::entities::{Event, OrderedEntity, StaffMember, Supporter, Testimonial};
use crate::content::gallery::{photos_collection, GroupSummary};
use crate::content::today;
use crate::store::{DocumentStore, OrderBy};
use crate::types::Result;

/// Upcoming events listed on the dashboard
pub const UPCOMING_LIMIT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOverview {
    pub groups: Option<Vec<GroupSummary>>,
    pub staff_count: Option<usize>,
    pub supporters_count: Option<usize>,
    pub upcoming_events: Option<Vec<UpcomingEvent>>,
    pub testimonials_count: Option<usize>,
}

async fn section<T, F>(name: &str, load: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match load.await {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section = name, error = %e, "Dashboard section unavailable");
            None
        }
    }
}

async fn count<E: OrderedEntity>(store: &dyn DocumentStore) -> Result<usize> {
    Ok(store.list(&E::collection(), None).await?.len())
}

async fn groups_with_sizes(store: &dyn DocumentStore) -> Result<Vec<GroupSummary>> {
    let groups = load_groups(store).await?;
    let sizes = join_all(groups.iter().map(|g| async move {
        let photos_path = photos_collection(&g.id);
        store.list(&photos_path, None).await
    }))
    .await;

    let mut summaries = Vec::with_capacity(groups.len());
    for (mut group, photos) in groups.into_iter().zip(sizes) {
        group.title = display_title(&group.title);
        summaries.push(GroupSummary {
            size: photos?.len(),
            group,
        });
    }
    Ok(summaries)
}

async fn upcoming(store: &dyn DocumentStore) -> Result<Vec<UpcomingEvent>> {
    let today = today();
    let events: Vec<Event> = load_entities(store, &OrderBy::asc("date")).await?;
    Ok(events
        .into_iter()
        .filter(|e| e.date.as_str() >= today.as_str())
        .take(UPCOMING_LIMIT)
        .map(|e| UpcomingEvent {
            title: display_title(&e.title),
            id: e.id,
            date: e.date,
            time: e.time,
        })
        .collect())
}

pub async fn admin_overview(store: &dyn DocumentStore) -> AdminOverview {
    AdminOverview {
        groups: section("groups", groups_with_sizes(store)).await,
        staff_count: section("staff", count::<StaffMember>(store)).await,
        supporters_count: section("supporters", count::<Supporter>(store)).await,
        upcoming_events: section("events", upcoming(store)).await,
        testimonials_count: section("testimonials", count::<Testimonial>(store)).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_upcoming_skips_past_and_undated() {
        let store = MemoryStore::new();
        let events = Event::collection();
        for (id, date) in [("past", "2001-01-01"), ("none", ""), ("a", "2999-01-01"), ("b", "2999-02-01")] {
            store
                .set(&events.doc(id), json!({"date": date}).as_object().cloned().unwrap(), false)
                .await
                .unwrap();
        }

        let overview = admin_overview(&store).await;
        let upcoming = overview.upcoming_events.unwrap();
        let ids: Vec<_> = upcoming.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(upcoming[0].title, "Untitled");
        assert_eq!(overview.staff_count, Some(0));
        assert_eq!(overview.groups.map(|g| g.len()), Some(0));
    }
}
