//! Data models representing database entities and API payloads.

use serde::{Deserialize, Deserializer};

use crate::filter::FilterMode;

/// Issued keys with their latest history entry
pub mod active_key;
/// YAML backup document
pub mod backup;
/// Issue/return history
pub mod history;
/// Keys and key sets
pub mod key;
/// Sites (locations)
pub mod site;
pub mod timestamp;

/// Filter parameters shared by every list endpoint.
///
/// `GET /api/keys/?q=front&mode=regexp`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    /// Raw query text; absent or blank means "no filtering"
    pub q: Option<String>,

    #[serde(default)]
    pub mode: FilterMode,
}

impl ListQuery {
    pub fn query(&self) -> &str {
        self.q.as_deref().unwrap_or("")
    }
}

/// `None` for absent or blank values.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// `#[serde(deserialize_with)]` helper for nullable text patch fields.
///
/// Together with `#[serde(default)]`, a missing field stays `None` while an
/// explicit `null` or `""` becomes `Some(None)`.
pub fn deserialize_text_patch<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|v| !v.is_empty())))
}
