//! Joining history entries with the keys they refer to.
//!
//! History rows only carry a `key_id`. Views show the site code and key
//! description next to each row, so entries are left-joined against a key
//! list that was fetched separately. Entries whose key is gone get
//! placeholder values instead of being dropped.

use std::collections::HashMap;

use crate::models::{
    history::{HistoryEntry, HistoryRecord},
    key::Key,
};

/// Site code shown for an entry whose key no longer exists.
pub const UNKNOWN_SITE: &str = "unknown site";

/// Description shown for an entry whose key no longer exists.
pub const UNKNOWN_KEY: &str = "unknown key";

/// Lookup table from `key_id` to key.
///
/// When the same id appears twice, the first key wins.
pub struct KeyIndex<'a> {
    by_id: HashMap<i32, &'a Key>,
}

impl<'a> KeyIndex<'a> {
    pub fn new(keys: &'a [Key]) -> Self {
        let mut by_id = HashMap::with_capacity(keys.len());
        for key in keys {
            by_id.entry(key.key_id).or_insert(key);
        }
        Self { by_id }
    }

    pub fn get(&self, key_id: i32) -> Option<&'a Key> {
        self.by_id.get(&key_id).copied()
    }

    /// Attach site code and description to one entry.
    pub fn enrich(&self, entry: HistoryEntry) -> HistoryRecord {
        let (site_code, description) = match self.get(entry.key_id) {
            Some(key) => (key.site_code.clone(), key.description.clone()),
            None => (UNKNOWN_SITE.to_string(), UNKNOWN_KEY.to_string()),
        };

        HistoryRecord {
            entry,
            site_code,
            description,
        }
    }
}

/// Left-join `entries` against `keys`, preserving entry order.
pub fn enrich_history(entries: Vec<HistoryEntry>, keys: &[Key]) -> Vec<HistoryRecord> {
    let index = KeyIndex::new(keys);
    entries.into_iter().map(|entry| index.enrich(entry)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterMode, filter};

    fn key(key_id: i32, site_code: &str, description: &str) -> Key {
        Key {
            key_id,
            site_code: site_code.to_string(),
            description: description.to_string(),
            key_count: 1,
            set_count: 1,
            is_issued: false,
            memo: None,
        }
    }

    fn entry(history_id: i32, key_id: i32) -> HistoryEntry {
        HistoryEntry {
            history_id,
            key_id,
            issued_to: Some("Ann".to_string()),
            issued_at: None,
            returned_at: None,
            memo: None,
        }
    }

    #[test]
    fn unmatched_key_gets_placeholders() {
        let records = enrich_history(vec![entry(5, 99)], &[key(1, "A1", "Front door")]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].entry.history_id, 5);
        assert_eq!(records[0].site_code, UNKNOWN_SITE);
        assert_eq!(records[0].description, UNKNOWN_KEY);
    }

    #[test]
    fn matched_key_fields_are_copied_verbatim() {
        let keys = [key(1, "A1", "Front door"), key(2, "B7", "Garage  Side")];
        let records = enrich_history(vec![entry(1, 2), entry(2, 1)], &keys);

        assert_eq!(records[0].site_code, "B7");
        assert_eq!(records[0].description, "Garage  Side");
        assert_eq!(records[1].site_code, "A1");
        assert_eq!(records[1].description, "Front door");
        assert_eq!(records[0].entry, entry(1, 2));
    }

    #[test]
    fn first_key_wins_on_duplicate_id() {
        let keys = [key(1, "A1", "first"), key(1, "A2", "second")];
        let records = enrich_history(vec![entry(1, 1)], &keys);
        assert_eq!(records[0].description, "first");
    }

    #[test]
    fn empty_key_list_enriches_everything_as_unknown() {
        let records = enrich_history(vec![entry(1, 1), entry(2, 2)], &[]);
        assert!(records.iter().all(|r| r.site_code == UNKNOWN_SITE));
    }

    #[test]
    fn enriched_fields_are_searchable() {
        let records = enrich_history(
            vec![entry(1, 1), entry(2, 99)],
            &[key(1, "A1", "Front door")],
        );

        let by_site = filter(records.clone(), "a1", FilterMode::Substring);
        assert_eq!(by_site.len(), 1);
        assert_eq!(by_site[0].entry.history_id, 1);

        let unknown = filter(records, "^unknown", FilterMode::RegExp);
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].entry.history_id, 2);
    }
}
