//! Index-based reordering shared by every editable sequence

use crate::types::{Result, SiteError};

/// Remove the element at `from` and reinsert it at `to`.
///
/// Both indices must address the current sequence; otherwise the sequence is
/// left untouched and `InvalidInput` is returned.
pub fn move_item<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<()> {
    let len = items.len();
    if from >= len || to >= len {
        return Err(SiteError::InvalidInput(format!(
            "Cannot move item {} to {} in a sequence of {}",
            from, to, len
        )));
    }
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(())
}
