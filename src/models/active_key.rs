//! Currently issued keys, as shown on the dashboard.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::filter::Searchable;

/// One issued key together with its most recent history entry.
///
/// `issued_to` and `issued_at` are empty when a key is flagged as issued
/// but has no history (e.g. after a partial restore).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct ActiveKey {
    pub site_code: String,
    pub key_description: String,
    pub issued_to: Option<String>,
    pub issued_at: Option<NaiveDateTime>,
}

impl Searchable for ActiveKey {
    fn search_fields(&self) -> Vec<Option<&str>> {
        vec![
            Some(self.site_code.as_str()),
            Some(self.key_description.as_str()),
            self.issued_to.as_deref(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterMode, filter};

    fn active(site_code: &str, issued_to: Option<&str>) -> ActiveKey {
        ActiveKey {
            site_code: site_code.to_string(),
            key_description: "Front door".to_string(),
            issued_to: issued_to.map(str::to_string),
            issued_at: None,
        }
    }

    #[test]
    fn filter_matches_recipient() {
        let keys = vec![active("A1", Some("J. Smith")), active("B2", Some("Ann"))];
        let found = filter(keys, "smith", FilterMode::Substring);
        assert_eq!(found, vec![active("A1", Some("J. Smith"))]);
    }

    #[test]
    fn filter_matches_site_and_description() {
        let keys = vec![active("A1", None), active("B2", None)];
        assert_eq!(
            filter(keys.clone(), "b2", FilterMode::Substring),
            vec![active("B2", None)]
        );
        assert_eq!(filter(keys, "FRONT", FilterMode::Substring).len(), 2);
    }

    #[test]
    fn missing_recipient_is_empty_text() {
        let keys = vec![active("A1", None), active("B2", Some("Ann"))];

        assert!(filter(keys.clone(), "none", FilterMode::Substring).is_empty());
        assert_eq!(
            filter(keys, "^$", FilterMode::RegExp),
            vec![active("A1", None)]
        );
    }
}
