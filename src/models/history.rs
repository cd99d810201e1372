//! History data models.
//!
//! This module defines:
//! - `HistoryEntry`: one issue-to-return cycle of a key, as stored
//! - `HistoryRecord`: an entry joined with the site/description of its key
//! - `UpdateHistoryRequest`: partial update body

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{filter::Searchable, models::timestamp};

/// Represents a history record from the database.
///
/// # Database Table
///
/// Maps to the `history` table. `returned_at = NULL` means the key is
/// still out.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub history_id: i32,

    /// Key this cycle belongs to
    pub key_id: i32,

    /// Person holding the key
    pub issued_to: Option<String>,

    pub issued_at: Option<NaiveDateTime>,

    pub returned_at: Option<NaiveDateTime>,

    pub memo: Option<String>,
}

impl HistoryEntry {
    /// Whether the key of this entry is still checked out.
    pub fn is_outstanding(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// A history entry with display fields resolved from its key.
///
/// Serialized flat: the entry's fields plus `site_code` and `description`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(flatten)]
    pub entry: HistoryEntry,

    pub site_code: String,

    pub description: String,
}

impl Searchable for HistoryRecord {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.site_code.as_str()),
            Some(self.description.as_str()),
            self.entry.issued_to.as_deref(),
            self.entry.memo.as_deref(),
        ]
    }
}

/// Partial update of a history entry.
///
/// Only fields present in the body are written. `null` or `""` clears
/// the value.
///
/// # JSON Example
///
/// ```json
/// {
///   "returned_at": "2025-03-10T08:00",
///   "memo": "Returned late"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateHistoryRequest {
    #[serde(
        default,
        deserialize_with = "super::deserialize_text_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub issued_to: Option<Option<String>>,

    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub issued_at: Option<Option<NaiveDateTime>>,

    #[serde(
        default,
        deserialize_with = "timestamp::deserialize_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub returned_at: Option<Option<NaiveDateTime>>,

    #[serde(
        default,
        deserialize_with = "super::deserialize_text_patch",
        skip_serializing_if = "Option::is_none"
    )]
    pub memo: Option<Option<String>>,
}

impl UpdateHistoryRequest {
    /// Apply the present fields to `entry`.
    pub fn apply_to(self, entry: &mut HistoryEntry) {
        if let Some(issued_to) = self.issued_to {
            entry.issued_to = issued_to;
        }
        if let Some(issued_at) = self.issued_at {
            entry.issued_at = issued_at;
        }
        if let Some(returned_at) = self.returned_at {
            entry.returned_at = returned_at;
        }
        if let Some(memo) = self.memo {
            entry.memo = memo;
        }
    }
}

/// Query string accepted by the history list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub site_code: Option<String>,
    #[serde(flatten)]
    pub filter: crate::models::ListQuery,
}

impl HistoryQuery {
    /// The requested site, treating `?site_code=` as "all sites".
    pub fn site_code(&self) -> Option<&str> {
        crate::models::non_blank(self.site_code.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;

    fn entry() -> HistoryEntry {
        HistoryEntry {
            history_id: 5,
            key_id: 1,
            issued_to: Some("Ann".to_string()),
            issued_at: timestamp::parse("2025-03-09T10:00").unwrap(),
            returned_at: None,
            memo: Some("spare".to_string()),
        }
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut target = entry();
        let patch: UpdateHistoryRequest =
            serde_json::from_str(r#"{"returned_at": "2025-03-10T08:00"}"#).unwrap();
        patch.apply_to(&mut target);

        assert_eq!(target.issued_to.as_deref(), Some("Ann"));
        assert_eq!(target.memo.as_deref(), Some("spare"));
        assert_eq!(target.returned_at, timestamp::parse("2025-03-10T08:00").unwrap());
        assert!(!target.is_outstanding());
    }

    #[test]
    fn patch_can_clear_fields() {
        let mut target = entry();
        let patch: UpdateHistoryRequest =
            serde_json::from_str(r#"{"issued_at": "", "memo": null}"#).unwrap();
        patch.apply_to(&mut target);

        assert_eq!(target.issued_at, None);
        assert_eq!(target.memo, None);
        assert_eq!(target.issued_to.as_deref(), Some("Ann"));
    }

    #[test]
    fn patch_blank_text_clears() {
        let mut target = entry();
        let patch: UpdateHistoryRequest =
            serde_json::from_str(r#"{"issued_to": "", "memo": ""}"#).unwrap();
        patch.apply_to(&mut target);

        assert_eq!(target.issued_to, None);
        assert_eq!(target.memo, None);
        assert!(target.issued_at.is_some());
    }

    #[test]
    fn blank_site_code_means_every_site() {
        let uri: axum::http::Uri = "/api/history/details/?site_code=&q=ann".parse().unwrap();
        let Query(query) = Query::<HistoryQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.site_code(), None);
        assert_eq!(query.filter.query(), "ann");

        let uri: axum::http::Uri = "/api/history/?site_code=A1".parse().unwrap();
        let Query(query) = Query::<HistoryQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.site_code(), Some("A1"));
    }

    #[test]
    fn record_serializes_flat() {
        let record = HistoryRecord {
            entry: entry(),
            site_code: "A1".to_string(),
            description: "Front door".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["history_id"], 5);
        assert_eq!(value["site_code"], "A1");
        assert_eq!(value["description"], "Front door");
    }
}
