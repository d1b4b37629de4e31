//! Change-sets: the input of a sparse update.

use serde::de::{Deserialize, Deserializer};
use serde_json::Value;

use super::Record;

/// Requested change for one field
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Write the value
    Set(Value),
    /// Clear the field (the absence-marker)
    Remove,
    /// Leave the field untouched
    Unset,
}

/// How the update compiler treats a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    Set,
    Remove,
    Skip,
}

impl Change {
    /// Classify the change. `Set(null)` is the absence-marker and clears the field.
    pub fn class(&self) -> ChangeClass {
        match self {
            Change::Set(Value::Null) | Change::Remove => ChangeClass::Remove,
            Change::Set(_) => ChangeClass::Set,
            Change::Unset => ChangeClass::Skip,
        }
    }
}

impl From<Value> for Change {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Change::Remove,
            value => Change::Set(value),
        }
    }
}

impl From<Option<Value>> for Change {
    fn from(value: Option<Value>) -> Self {
        value.map(Change::from).unwrap_or(Change::Unset)
    }
}

/// Insertion-ordered field changes for one record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: Vec<(String, Change)>,
}

impl ChangeSet {
    /// Create an empty change-set
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` to `field`; a `null` value clears the field
    pub fn set(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Change::from(value.into()))
    }

    /// Clear `field`
    pub fn remove(self, field: impl Into<String>) -> Self {
        self.with(field, Change::Remove)
    }

    /// Mention `field` without touching it
    pub fn unset(self, field: impl Into<String>) -> Self {
        self.with(field, Change::Unset)
    }

    /// Record a change. Re-inserting a field replaces its change but keeps
    /// its original position.
    pub fn with(mut self, field: impl Into<String>, change: Change) -> Self {
        self.insert(field, change);
        self
    }

    /// In-place form of [`ChangeSet::with`]
    pub fn insert(&mut self, field: impl Into<String>, change: Change) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = change,
            None => self.entries.push((field, change)),
        }
    }

    /// Changes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.entries.iter().map(|(name, change)| (name.as_str(), change))
    }

    /// Number of mentioned fields, skips included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no field is mentioned
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every mentioned field is a skip
    pub fn is_noop(&self) -> bool {
        self.entries
            .iter()
            .all(|(_, change)| change.class() == ChangeClass::Skip)
    }
}

impl From<Record> for ChangeSet {
    fn from(record: Record) -> Self {
        let entries = record
            .into_iter()
            .map(|(field, value)| (field, Change::from(value)))
            .collect();
        Self { entries }
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Record::deserialize(deserializer).map(ChangeSet::from)
    }
}
