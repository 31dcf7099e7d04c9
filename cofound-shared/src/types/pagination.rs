use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyset page: `next_cursor` is the id to pass as `after` for the next fetch,
/// `None` once the listing is exhausted.
#[derive(Debug, Serialize, Deserialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Uuid>,
}

impl<T> CursorPage<T> {
    /// Builds a page from a fetch of at most `limit` items. A full page yields
    /// the key of its last item as the cursor; a short page ends the listing.
    pub fn from_fetch(items: Vec<T>, limit: usize, key: impl Fn(&T) -> Uuid) -> Self {
        let next_cursor = if limit > 0 && items.len() >= limit {
            items.last().map(key)
        } else {
            None
        };
        Self { items, next_cursor }
    }

    /// Maps items while keeping the cursor of the original fetch, so dropping
    /// an item never ends the listing early.
    pub fn filter_map<U>(self, f: impl FnMut(T) -> Option<U>) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().filter_map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new(), next_cursor: None }
    }
}
