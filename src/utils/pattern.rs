//! Name matching used by the list/query filters.
//!
//! An empty pattern or a lone `*` matches everything, a trailing `*` turns
//! the pattern into a prefix match, anything else must match exactly.

use std::collections::HashMap;

pub const WILDCARD: char = '*';

pub fn is_wild_name(pattern: &str) -> bool {
    pattern.ends_with(WILDCARD)
}

pub fn match_name(
    pattern: &str,
    value: &str,
) -> bool {
    if pattern.is_empty() || pattern == "*" {
        return true;
    }
    if is_wild_name(pattern) {
        return value.starts_with(&pattern[..pattern.len() - 1]);
    }
    pattern == value
}

/// Every filter pair must be present in `metadata` with an equal value.
pub fn match_metadata(
    filter: &HashMap<String, String>,
    metadata: &HashMap<String, String>,
) -> bool {
    filter
        .iter()
        .all(|(k, v)| metadata.get(k).map(|actual| actual == v).unwrap_or(false))
}

/// Applies offset/limit. Out of range input yields an empty page.
pub fn paginate<T: Clone>(
    items: &[T],
    offset: u32,
    limit: u32,
) -> Vec<T> {
    let offset = offset as usize;
    if limit == 0 || offset >= items.len() {
        return Vec::new();
    }
    let end = offset.saturating_add(limit as usize).min(items.len());
    items[offset..end].to_vec()
}
