//! Key data models and API request types.
//!
//! This module defines:
//! - `Key`: Database entity representing a key or key set
//! - `KeyRequest`: Request body for creating and replacing keys
//! - `IssueKeyRequest` / `ReturnKeyRequest`: bodies for the issue/return endpoints

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{filter::Searchable, models::timestamp};

/// Represents a key record from the database.
///
/// # Database Table
///
/// Maps to the `keys` table. Each key belongs to exactly one site
/// (via `site_code`).
///
/// # Issued State
///
/// `is_issued` is true while a history entry for this key has no
/// `returned_at`. Only the issue and return operations flip it.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Key {
    /// Unique identifier for this key
    pub key_id: i32,

    /// Site this key opens
    pub site_code: String,

    /// What the key is for, e.g. "Front door"
    pub description: String,

    /// Number of physical keys in one set
    pub key_count: i32,

    /// Number of sets
    pub set_count: i32,

    /// Whether the key is currently checked out
    pub is_issued: bool,

    /// Free-form note
    pub memo: Option<String>,
}

/// Request body for creating or replacing a key.
///
/// # JSON Example
///
/// ```json
/// {
///   "site_code": "A1",
///   "description": "Front door",
///   "key_count": 2,
///   "set_count": 1,
///   "memo": null
/// }
/// ```
///
/// # Validation
///
/// - `site_code` must reference an existing site
/// - `key_count` and `set_count` must be at least 1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRequest {
    pub site_code: String,
    pub description: String,
    pub key_count: i32,
    pub set_count: i32,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Request to check out a key of a site.
///
/// ```json
/// {
///   "site_code": "A1",
///   "issued_to": "J. Smith",
///   "issued_at": "2025-03-09T10:15"
/// }
/// ```
///
/// `issued_at` defaults to the current time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueKeyRequest {
    pub site_code: String,
    pub issued_to: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub issued_at: Option<NaiveDateTime>,
}

/// Request to check a key of a site back in.
///
/// `returned_at` defaults to the current time. A non-empty `memo`
/// replaces the memo of the closed history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnKeyRequest {
    pub site_code: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub returned_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Query string accepted by `GET /api/keys/`.
#[derive(Debug, Default, Deserialize)]
pub struct KeyListQuery {
    pub site_code: Option<String>,
    #[serde(flatten)]
    pub filter: crate::models::ListQuery,
}

impl KeyListQuery {
    /// The requested site, treating `?site_code=` as "all sites".
    pub fn site_code(&self) -> Option<&str> {
        crate::models::non_blank(self.site_code.as_deref())
    }
}

impl KeyRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("Description must not be empty".to_string());
        }
        if self.key_count < 1 || self.set_count < 1 {
            return Err("Key count and set count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Searchable for Key {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.site_code.as_str()),
            Some(self.description.as_str()),
            self.memo.as_deref(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterMode, filter};
    use axum::extract::Query;

    fn front_door() -> Key {
        Key {
            key_id: 1,
            site_code: "A1".to_string(),
            description: "Front door".to_string(),
            key_count: 2,
            set_count: 1,
            is_issued: false,
            memo: None,
        }
    }

    #[test]
    fn filter_finds_key_by_description() {
        let found = filter(vec![front_door()], "front", FilterMode::Substring);
        assert_eq!(found, vec![front_door()]);

        let missing = filter(vec![front_door()], "back", FilterMode::Substring);
        assert!(missing.is_empty());
    }

    #[test]
    fn blank_site_code_means_every_site() {
        let uri: axum::http::Uri = "/api/keys/?site_code=%20".parse().unwrap();
        let Query(query) = Query::<KeyListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.site_code(), None);

        let uri: axum::http::Uri = "/api/keys/?site_code=B2&mode=regexp".parse().unwrap();
        let Query(query) = Query::<KeyListQuery>::try_from_uri(&uri).unwrap();
        assert_eq!(query.site_code(), Some("B2"));
        assert_eq!(query.filter.mode, FilterMode::RegExp);
    }

    #[test]
    fn validate_rejects_zero_counts() {
        let request = KeyRequest {
            site_code: "A1".to_string(),
            description: "Front door".to_string(),
            key_count: 0,
            set_count: 1,
            memo: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn issue_request_accepts_form_timestamp_or_blank() {
        let request: IssueKeyRequest = serde_json::from_str(
            r#"{"site_code": "A1", "issued_to": "Ann", "issued_at": "2025-03-09T10:15"}"#,
        )
        .unwrap();
        assert!(request.issued_at.is_some());

        let request: IssueKeyRequest =
            serde_json::from_str(r#"{"site_code": "A1", "issued_to": "Ann", "issued_at": ""}"#)
                .unwrap();
        assert!(request.issued_at.is_none());

        let request: IssueKeyRequest =
            serde_json::from_str(r#"{"site_code": "A1", "issued_to": "Ann"}"#).unwrap();
        assert!(request.issued_at.is_none());
    }
}
