//! Lenient timestamp parsing for request bodies and backup files.
//!
//! Timestamps are stored as naive UTC (`TIMESTAMP` columns). Clients send
//! them in several shapes:
//!
//! - RFC 3339 with an offset (`2025-03-09T10:15:00+02:00`), converted to UTC
//! - ISO without offset, with or without fractional seconds
//! - `datetime-local` form values without seconds (`2025-03-09T10:15`)
//! - an empty string, meaning "no value"

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, de::Error};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp string. Returns `Ok(None)` for blank input.
pub fn parse(value: &str) -> Result<Option<NaiveDateTime>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.naive_utc()));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or_else(|| format!("invalid timestamp: {value}"))
}

/// `#[serde(deserialize_with)]` helper for `Option<NaiveDateTime>` fields.
pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse(&raw).map_err(D::Error::custom),
        None => Ok(None),
    }
}

/// `#[serde(deserialize_with)]` helper for patch fields.
///
/// Used together with `#[serde(default)]`: a missing field stays `None`
/// (leave unchanged), while `null` or `""` becomes `Some(None)` (clear).
pub fn deserialize_patch<'de, D>(
    deserializer: D,
) -> Result<Option<Option<NaiveDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn parses_supported_shapes() {
        assert_eq!(parse("2025-03-09T10:15:30").unwrap(), Some(at(10, 15, 30)));
        assert_eq!(parse("2025-03-09 10:15:30").unwrap(), Some(at(10, 15, 30)));
        assert_eq!(parse("2025-03-09T10:15").unwrap(), Some(at(10, 15, 0)));
        assert_eq!(parse("2025-03-09T12:15:30+02:00").unwrap(), Some(at(10, 15, 30)));
        assert_eq!(parse("2025-03-09T10:15:30Z").unwrap(), Some(at(10, 15, 30)));
    }

    #[test]
    fn keeps_fractional_seconds() {
        let parsed = parse("2025-03-09T10:15:30.250000").unwrap().unwrap();
        assert_eq!(parsed.and_utc().timestamp_subsec_millis(), 250);
    }

    #[test]
    fn blank_is_absent() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("  ").unwrap(), None);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse("yesterday").is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "deserialize_patch")]
        returned_at: Option<Option<NaiveDateTime>>,
    }

    #[test]
    fn patch_distinguishes_missing_from_cleared() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.returned_at, None);

        let null: Patch = serde_json::from_str(r#"{"returned_at": null}"#).unwrap();
        assert_eq!(null.returned_at, Some(None));

        let empty: Patch = serde_json::from_str(r#"{"returned_at": ""}"#).unwrap();
        assert_eq!(empty.returned_at, Some(None));

        let set: Patch = serde_json::from_str(r#"{"returned_at": "2025-03-09T10:15"}"#).unwrap();
        assert_eq!(set.returned_at, Some(Some(at(10, 15, 0))));
    }
}
