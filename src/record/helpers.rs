//! Small record helpers shared by the mapper and the connectors.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::{Record, DELETED};

/// Current time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Expiry timestamp in epoch seconds, `days` after `start`
pub fn ttl(start: DateTime<Utc>, days: i64) -> i64 {
    (start + Duration::days(days)).timestamp()
}

/// Truthiness of a stored value: `null`, `false`, `0`, `NaN`-like numbers
/// and the empty string are falsy; everything else, including empty
/// arrays and objects, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether `field` is present and not the absence-marker
pub fn is_defined(record: &Record, field: &str) -> bool {
    record.get(field).is_some_and(|v| !v.is_null())
}

/// Whether the record is soft-deleted.
///
/// Absent, `null` and `false` markers all mean "live"; `null` is a cleared
/// marker, not a deletion.
pub fn is_deleted(record: &Record) -> bool {
    record.get(DELETED).is_some_and(is_truthy)
}

/// Drop soft-deleted records, keeping the order of the rest
pub fn retain_live(records: Vec<Record>) -> Vec<Record> {
    records.into_iter().filter(|r| !is_deleted(r)).collect()
}
