//! Display-name search

/// Case-insensitive match of `query` against `text`.
///
/// Every whitespace-separated token of the query must occur somewhere in the
/// text, in any order. An empty query matches everything, including a
/// missing name; a non-empty query never matches a missing name.
pub fn matches(text: Option<&str>, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let Some(text) = text else {
        return false;
    };
    let haystack = text.to_lowercase();
    query
        .split_whitespace()
        .all(|token| haystack.contains(&token.to_lowercase()))
}
