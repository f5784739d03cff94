use crate::model::AppRecord;
use std::cmp::Ordering;

/// Returns the records matching `query`, ranked exact > prefix > alphabetical on display name.
/// An empty query returns every record in catalog order.
pub fn search(records: &[AppRecord], query: &str) -> Vec<AppRecord> {
    if query.is_empty() {
        return records.to_vec();
    }

    let query = query.to_lowercase();
    let mut results: Vec<AppRecord> = records
        .iter()
        .filter(|r| matches(r, &query))
        .cloned()
        .collect();
    results.sort_by(|a, b| compare_relevance(a, b, &query));
    results
}

/// Every record, ascending by case-insensitive display name.
pub fn sort_all(records: &[AppRecord]) -> Vec<AppRecord> {
    let mut all = records.to_vec();
    all.sort_by_cached_key(|r| r.display_name.to_lowercase());
    all
}

/// `query` must already be lowercase.
pub fn matches(record: &AppRecord, query: &str) -> bool {
    record.name.to_lowercase().contains(query)
        || record.display_name.to_lowercase().contains(query)
        || record.description.to_lowercase().contains(query)
        || record.keywords.iter().any(|k| k.to_lowercase().contains(query))
}

fn tier(display_name: &str, query: &str) -> u8 {
    if display_name == query {
        0
    } else if display_name.starts_with(query) {
        1
    } else {
        2
    }
}

fn compare_relevance(a: &AppRecord, b: &AppRecord, query: &str) -> Ordering {
    let a_name = a.display_name.to_lowercase();
    let b_name = b.display_name.to_lowercase();
    tier(&a_name, query)
        .cmp(&tier(&b_name, query))
        .then_with(|| a_name.cmp(&b_name))
}
