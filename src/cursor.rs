//! Pagination cursor for a single list

use serde::{Deserialize, Serialize};

/// Offset/limit pagination progress for one collection.
///
/// A cursor is owned by exactly one list instance; two mounted lists never
/// share a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// Number of items already fetched
    pub offset: u32,
    /// Requested page size
    pub limit: u32,
    /// No more pages remain
    pub exhausted: bool,
}

impl PageCursor {
    /// Create a fresh cursor. A zero limit is clamped to 1.
    pub fn new(limit: u32) -> Self {
        Self {
            offset: 0,
            limit: limit.max(1),
            exhausted: false,
        }
    }

    /// Record a successfully fetched page of `page_len` items.
    ///
    /// A page shorter than the limit is the end-of-data signal.
    pub fn advance(&mut self, page_len: usize) {
        let page_len = u32::try_from(page_len).unwrap_or(u32::MAX);
        self.offset = self.offset.saturating_add(page_len);
        if page_len < self.limit {
            self.exhausted = true;
        }
    }

    /// Rewind to the first page.
    pub fn reset(&mut self) {
        self.offset = 0;
        self.exhausted = false;
    }
}
