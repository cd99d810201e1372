//! Site data models and API request types.
//!
//! A site is a physical location. It is addressed everywhere by its
//! `site_code`, which is unique; `site_id` is only a surrogate key.

use serde::{Deserialize, Serialize};

use crate::filter::Searchable;

/// Represents a site record from the database.
///
/// # Database Table
///
/// Maps to the `sites` table. Keys reference sites by `site_code`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct Site {
    /// Surrogate primary key
    pub site_id: i32,

    /// Unique human-facing code, e.g. "A1"
    pub site_code: String,

    /// Street address
    pub address: String,

    /// Free-form note
    pub memo: Option<String>,
}

/// Request body for creating a site.
///
/// # JSON Example
///
/// ```json
/// {
///   "site_code": "A1",
///   "address": "1 Main Street",
///   "memo": "Side entrance"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub site_code: String,
    pub address: String,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Request body for updating a site.
///
/// The code itself is immutable; it is taken from the URL path.
/// A `site_code` in the body is accepted and ignored so the same form
/// payload can be sent for create and edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateSiteRequest {
    pub address: String,
    #[serde(default)]
    pub memo: Option<String>,
}

impl Searchable for Site {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.site_code.as_str()),
            Some(self.address.as_str()),
            self.memo.as_deref(),
        ]
    }
}
