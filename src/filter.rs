//! Text filtering for in-memory record lists.
//!
//! Every list view (sites, keys, history, active keys) narrows its records
//! with the same rule: a record is kept when any of its searchable fields
//! matches the query. Two modes exist:
//!
//! - **Substring**: case-insensitive `contains`
//! - **RegExp**: case-insensitive regular expression
//!
//! A pattern that fails to compile does not fail the caller. The filter
//! falls back to returning every record unchanged.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// How the query string is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Case-insensitive substring match
    #[default]
    Substring,

    /// Case-insensitive regular expression match
    #[serde(alias = "regex")]
    RegExp,
}

/// A record that can be narrowed by [`filter`].
///
/// Implementors list the text fields a query is matched against.
/// `None` stands for an absent optional field and is matched as `""`.
pub trait Searchable {
    fn search_fields(&self) -> Vec<Option<&str>>;
}

impl<T: Searchable + ?Sized> Searchable for &T {
    fn search_fields(&self) -> Vec<Option<&str>> {
        (**self).search_fields()
    }
}

/// Compiled form of a query.
#[derive(Debug)]
pub enum Matcher {
    /// Keeps every record (empty query or unusable pattern)
    All,

    /// Lowercased needle
    Substring(String),

    /// Case-insensitive pattern
    Pattern(Regex),
}

impl Matcher {
    pub fn new(query: &str, mode: FilterMode) -> Self {
        if query.trim().is_empty() {
            return Matcher::All;
        }

        match mode {
            FilterMode::Substring => Matcher::Substring(query.to_lowercase()),
            FilterMode::RegExp => match RegexBuilder::new(query).case_insensitive(true).build() {
                Ok(regex) => Matcher::Pattern(regex),
                Err(e) => {
                    tracing::warn!("Ignoring invalid filter pattern {:?}: {}", query, e);
                    Matcher::All
                }
            },
        }
    }

    /// Whether a single field value matches.
    pub fn matches_value(&self, value: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Substring(needle) => value.to_lowercase().contains(needle.as_str()),
            Matcher::Pattern(regex) => regex.is_match(value),
        }
    }

    /// Whether any searchable field of `record` matches.
    pub fn matches<T: Searchable>(&self, record: &T) -> bool {
        if let Matcher::All = self {
            return true;
        }

        record
            .search_fields()
            .into_iter()
            .any(|field| self.matches_value(field.unwrap_or("")))
    }
}

/// Keep the records matching `query`, preserving input order.
///
/// An empty or whitespace-only query returns `records` untouched.
pub fn filter<T: Searchable>(records: Vec<T>, query: &str, mode: FilterMode) -> Vec<T> {
    let matcher = Matcher::new(query, mode);
    if let Matcher::All = matcher {
        return records;
    }

    records
        .into_iter()
        .filter(|record| matcher.matches(record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        code: &'static str,
        note: Option<&'static str>,
    }

    impl Searchable for Row {
        fn search_fields(&self) -> Vec<Option<&str>> {
            vec![Some(self.code), self.note]
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { code: "A1", note: Some("Front door") },
            Row { code: "B2", note: None },
            Row { code: "c3", note: Some("back gate") },
        ]
    }

    #[test]
    fn blank_query_returns_input_in_order() {
        for query in ["", "   ", "\t\n"] {
            for mode in [FilterMode::Substring, FilterMode::RegExp] {
                assert_eq!(filter(rows(), query, mode), rows());
            }
        }
    }

    #[test]
    fn substring_is_case_insensitive() {
        let upper = filter(rows(), "FRONT", FilterMode::Substring);
        let lower = filter(rows(), "front", FilterMode::Substring);
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 1);
        assert_eq!(upper[0].code, "A1");
    }

    #[test]
    fn substring_matches_any_field() {
        let result = filter(rows(), "C3", FilterMode::Substring);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].note, Some("back gate"));
    }

    #[test]
    fn absent_fields_never_match_non_empty_needle() {
        let result = filter(rows(), "b2x", FilterMode::Substring);
        assert!(result.is_empty());
    }

    #[test]
    fn substring_filter_is_idempotent() {
        for query in ["a", "door", "zzz", "2"] {
            let once = filter(rows(), query, FilterMode::Substring);
            let twice = filter(once.clone(), query, FilterMode::Substring);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn regexp_is_case_insensitive() {
        let result = filter(rows(), "^[ab]\\d$", FilterMode::RegExp);
        assert_eq!(result.len(), 2);

        let upper = filter(rows(), "GATE$", FilterMode::RegExp);
        let lower = filter(rows(), "gate$", FilterMode::RegExp);
        assert_eq!(upper, lower);
        assert_eq!(upper.len(), 1);
    }

    #[test]
    fn regexp_can_match_absent_field_as_empty() {
        let result = filter(rows(), "^$", FilterMode::RegExp);
        assert_eq!(result, vec![Row { code: "B2", note: None }]);
    }

    #[test]
    fn malformed_pattern_fails_open() {
        let result = filter(rows(), "(front", FilterMode::RegExp);
        assert_eq!(result, rows());
    }

    #[test]
    fn substring_mode_treats_pattern_chars_literally() {
        let result = filter(rows(), "(front", FilterMode::Substring);
        assert!(result.is_empty());
    }

    #[test]
    fn query_is_not_trimmed_for_matching() {
        let result = filter(rows(), " gate", FilterMode::Substring);
        assert_eq!(result.len(), 1);
        let result = filter(rows(), " door ", FilterMode::Substring);
        assert!(result.is_empty());
    }

    #[test]
    fn filters_borrowed_records() {
        let owned = rows();
        let borrowed: Vec<&Row> = owned.iter().collect();
        let result = filter(borrowed, "a1", FilterMode::Substring);
        assert_eq!(result, vec![&owned[0]]);
    }

    #[test]
    fn mode_deserializes_from_lowercase() {
        let mode: FilterMode = serde_json::from_str("\"regexp\"").unwrap();
        assert_eq!(mode, FilterMode::RegExp);
        let mode: FilterMode = serde_json::from_str("\"regex\"").unwrap();
        assert_eq!(mode, FilterMode::RegExp);
        let mode: FilterMode = serde_json::from_str("\"substring\"").unwrap();
        assert_eq!(mode, FilterMode::Substring);
    }
}
