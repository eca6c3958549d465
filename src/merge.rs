//! Merging fetched pages into ordered collections

use std::cmp::Ordering;
use std::collections::HashSet;

/// An entity with a stable unique identifier.
pub trait Identified {
    /// Stable id; two items with the same id are the same entity
    fn id(&self) -> &str;
}

/// How an incoming page is combined with the existing collection.
pub enum MergeMode<'a, T> {
    /// Concatenate and drop repeated ids, first occurrence wins
    Append,
    /// Take the incoming page verbatim (refresh)
    Replace,
    /// Replace matching ids in place, insert new ones in comparator order
    UpsertSorted(&'a dyn Fn(&T, &T) -> Ordering),
}

/// Combine `incoming` into `existing` according to `mode`.
pub fn merge_page<T: Identified>(existing: Vec<T>, incoming: Vec<T>, mode: MergeMode<'_, T>) -> Vec<T> {
    match mode {
        MergeMode::Append => {
            let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
            let mut merged = Vec::with_capacity(existing.len() + incoming.len());
            for item in existing.into_iter().chain(incoming) {
                if seen.insert(item.id().to_string()) {
                    merged.push(item);
                }
            }
            merged
        }
        MergeMode::Replace => incoming,
        MergeMode::UpsertSorted(compare) => {
            let mut merged = existing;
            for item in incoming {
                upsert_sorted(&mut merged, item, compare);
            }
            merged
        }
    }
}

/// Insert or replace a single item.
///
/// An existing item keeps its position. A new item goes after every element
/// that does not order after it, so equal keys keep arrival order.
pub fn upsert_sorted<T: Identified>(items: &mut Vec<T>, item: T, compare: &dyn Fn(&T, &T) -> Ordering) {
    if let Some(index) = items.iter().position(|existing| existing.id() == item.id()) {
        items[index] = item;
        return;
    }
    let index = items
        .iter()
        .position(|existing| compare(&item, existing) == Ordering::Less)
        .unwrap_or(items.len());
    items.insert(index, item);
}

/// Stable sort; equal keys keep their relative order.
pub fn sort_stable<T>(items: &mut [T], compare: impl Fn(&T, &T) -> Ordering) {
    items.sort_by(compare);
}
