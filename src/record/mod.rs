//! # Records
//!
//! A record is an insertion-ordered map from field name to JSON value.
//! Every stored record carries a partition key (`pk`), a sort key (`sk`)
//! and a `discriminator` naming its entity type. A field is either present
//! with a value, present with the absence-marker (`null`), or missing.

mod changeset;
mod helpers;

pub use changeset::{Change, ChangeClass, ChangeSet};
pub use helpers::{is_deleted, is_defined, is_truthy, now, retain_live, ttl};

use serde_json::{Map, Value};

/// A stored item
pub type Record = Map<String, Value>;

/// Partition key field
pub const PK: &str = "pk";

/// Sort key field
pub const SK: &str = "sk";

/// Entity type tag
pub const DISCRIMINATOR: &str = "discriminator";

/// Soft-delete marker
pub const DELETED: &str = "deleted";

/// Default sort key segment delimiter
pub const DEFAULT_DELIMITER: char = '|';

/// Read a string field
pub fn str_field<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Build a record from a JSON value, rejecting non-objects
pub fn from_value(value: Value) -> Option<Record> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
