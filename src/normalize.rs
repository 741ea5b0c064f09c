//! Temporal normalization: promote recognized date-string fields to native
//! timestamps before a document reaches the store.
//!
//! Accepted inputs (parsed as UTC when no offset is given):
//! 1. RFC 3339 / ISO 8601 with offset ("2024-01-01T10:00:00Z", "+02:00")
//! 2. ISO date-time without offset, with or without fractional seconds
//! 3. ISO date-time with a space separator ("2024-01-01 10:00:00")
//! 4. Bare ISO date ("2024-01-01"), taken as midnight UTC
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::document::{Document, Value};

/// A temporal field that could not be converted. Non-fatal: the record is
/// still written with the original string in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub field: String,
    pub reason: String,
}

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Replace each recognized temporal field holding a date string with a
/// native timestamp. Absent fields, nulls, empty strings, and fields already
/// in native form are left untouched; an unparsable string stays in place
/// and is reported as a `FieldIssue`.
pub fn normalize_temporal_fields(doc: &mut Document, temporal_fields: &[&str]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for &field in temporal_fields {
        let parsed = match doc.get(field) {
            Some(Value::Str(raw)) if !raw.trim().is_empty() => match parse_instant(raw) {
                Some(ts) => ts,
                None => {
                    issues.push(FieldIssue {
                        field: field.to_string(),
                        reason: format!("unparsable date string {raw:?}"),
                    });
                    continue;
                }
            },
            _ => continue,
        };
        doc.insert(field.to_string(), Value::Timestamp(parsed));
    }
    issues
}
