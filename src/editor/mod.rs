//! Edit buffers for admin content
//!
//! - [`collection::CollectionEditor`]: ordered entity sequences (events,
//!   testimonials, supporters, staff)
//! - [`page::PageEditor`]: text and imagery of one page
//! - [`slots::SlotList`]: featured-photo slots owned by either of the above
//!
//! Every buffer keeps a serialized snapshot of its last synced state; it is
//! dirty whenever the current serialization differs from that snapshot.

pub mod collection;
pub mod page;
pub mod reorder;
pub mod slots;

use serde_json::Value;

pub use collection::{CollectionEditor, CommitPlan, CommitReport};
pub use page::{PageEditor, PageSavePlan};
pub use slots::{SlotList, SlotOp};

/// Apply a JSON merge patch (RFC 7396) to `target`
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(fields) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(map) = target {
                for (key, value) in fields {
                    if value.is_null() {
                        map.remove(key);
                    } else {
                        merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        other => *target = other.clone(),
    }
}
