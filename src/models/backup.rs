//! YAML backup document.
//!
//! A backup holds the three tables in dependency order:
//!
//! ```yaml
//! sites:
//! - site_id: 1
//!   site_code: A1
//!   address: 1 Main Street
//!   memo: null
//! keys:
//! - key_id: 1
//!   site_code: A1
//!   description: Front door
//!   key_count: 2
//!   set_count: 1
//!   is_issued: false
//!   memo: null
//! history:
//! - history_id: 1
//!   key_id: 1
//!   issued_to: Ann
//!   issued_at: 2025-03-09T10:00:00
//!   returned_at: null
//!   memo: null
//! ```
//!
//! On restore, ids are not preserved: keys get fresh ids and history rows
//! are re-pointed at them. Rows whose parent is missing are skipped.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{history::HistoryEntry, key::Key, site::Site, timestamp};

/// File name offered for download.
pub const BACKUP_FILENAME: &str = "key_tracker_backup.yaml";

/// Media type of the backup file.
pub const BACKUP_CONTENT_TYPE: &str = "application/x-yaml";

/// File extensions accepted for restore.
pub const BACKUP_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Whether `filename` looks like a backup file.
pub fn has_backup_extension(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    BACKUP_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub sites: Vec<BackupSite>,
    pub keys: Vec<BackupKey>,
    pub history: Vec<BackupHistory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSite {
    #[serde(default)]
    pub site_id: Option<i32>,
    pub site_code: String,
    pub address: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupKey {
    pub key_id: i32,
    pub site_code: String,
    pub description: String,
    pub key_count: i32,
    pub set_count: i32,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_issued: bool,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupHistory {
    #[serde(default)]
    pub history_id: Option<i32>,
    pub key_id: i32,
    #[serde(default)]
    pub issued_to: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub issued_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub returned_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Older backups store `is_issued` as `0`/`1`.
fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(value)) => value,
        Some(Flag::Int(value)) => value != 0,
        None => false,
    })
}

impl From<Site> for BackupSite {
    fn from(site: Site) -> Self {
        Self {
            site_id: Some(site.site_id),
            site_code: site.site_code,
            address: site.address,
            memo: site.memo,
        }
    }
}

impl From<Key> for BackupKey {
    fn from(key: Key) -> Self {
        Self {
            key_id: key.key_id,
            site_code: key.site_code,
            description: key.description,
            key_count: key.key_count,
            set_count: key.set_count,
            is_issued: key.is_issued,
            memo: key.memo,
        }
    }
}

impl From<HistoryEntry> for BackupHistory {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            history_id: Some(entry.history_id),
            key_id: entry.key_id,
            issued_to: entry.issued_to,
            issued_at: entry.issued_at,
            returned_at: entry.returned_at,
            memo: entry.memo,
        }
    }
}

impl BackupDocument {
    pub fn new(sites: Vec<Site>, keys: Vec<Key>, history: Vec<HistoryEntry>) -> Self {
        Self {
            sites: sites.into_iter().map(Into::into).collect(),
            keys: keys.into_iter().map(Into::into).collect(),
            history: history.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parse an uploaded backup. All three sections must be present.
    pub fn from_yaml(contents: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(contents)
    }

    /// Decide which rows of this document can be restored.
    pub fn plan(self) -> RestorePlan {
        let site_codes: HashSet<&str> = self.sites.iter().map(|s| s.site_code.as_str()).collect();

        let (keys, orphan_keys): (Vec<BackupKey>, Vec<BackupKey>) = self
            .keys
            .into_iter()
            .partition(|key| site_codes.contains(key.site_code.as_str()));

        let key_ids: HashSet<i32> = keys.iter().map(|k| k.key_id).collect();
        let (history, orphan_history): (Vec<BackupHistory>, Vec<BackupHistory>) = self
            .history
            .into_iter()
            .partition(|entry| key_ids.contains(&entry.key_id));

        for key in &orphan_keys {
            tracing::warn!(
                "Skipping key {}: site {} not found in backup",
                key.key_id,
                key.site_code
            );
        }
        for entry in &orphan_history {
            tracing::warn!(
                "Skipping history entry {:?}: key {} not found in backup",
                entry.history_id,
                entry.key_id
            );
        }

        RestorePlan {
            sites: self.sites,
            keys,
            history,
            skipped_keys: orphan_keys.len(),
            skipped_history: orphan_history.len(),
        }
    }
}

/// Rows to insert, in order, plus counts of what was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePlan {
    pub sites: Vec<BackupSite>,
    pub keys: Vec<BackupKey>,
    pub history: Vec<BackupHistory>,
    pub skipped_keys: usize,
    pub skipped_history: usize,
}

/// Outcome reported by `POST /api/backup/restore/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreSummary {
    pub message: String,
    pub sites: usize,
    pub keys: usize,
    pub history: usize,
    pub skipped_keys: usize,
    pub skipped_history: usize,
}
