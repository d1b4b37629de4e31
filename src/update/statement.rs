//! Partial-update statement handed to the table client.

use serde::Serialize;

use crate::record::Record;

/// What the backend returns after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnValues {
    /// The full post-update record
    AllNew,
}

/// A compiled partial update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateStatement {
    /// `#field` → field
    pub attribute_names: Record,
    /// `:field` → value
    pub attribute_values: Record,
    /// `SET #a = :a, ...`, present only when something is set
    pub set_clause: Option<String>,
    /// `REMOVE #b, ...`, present only when something is removed
    pub remove_clause: Option<String>,
    pub return_values: ReturnValues,
}

impl UpdateStatement {
    /// Full update expression, SET before REMOVE. Empty when the
    /// change-set only contained skips.
    pub fn expression(&self) -> String {
        match (&self.set_clause, &self.remove_clause) {
            (Some(set), Some(remove)) => format!("{} {}", set, remove),
            (Some(set), None) => set.clone(),
            (None, Some(remove)) => remove.clone(),
            (None, None) => String::new(),
        }
    }

    /// Whether the statement changes nothing
    pub fn is_empty(&self) -> bool {
        self.set_clause.is_none() && self.remove_clause.is_none()
    }

    /// Fields written by the statement, in clause order
    pub fn set_fields(&self) -> impl Iterator<Item = &str> {
        self.attribute_names
            .iter()
            .filter(|(alias, _)| self.attribute_values.contains_key(&value_alias_of(alias)))
            .filter_map(|(_, field)| field.as_str())
    }

    /// Fields cleared by the statement, in clause order
    pub fn removed_fields(&self) -> impl Iterator<Item = &str> {
        self.attribute_names
            .iter()
            .filter(|(alias, _)| !self.attribute_values.contains_key(&value_alias_of(alias)))
            .filter_map(|(_, field)| field.as_str())
    }
}

/// `#field` → `:field`
fn value_alias_of(name_alias: &str) -> String {
    let field = name_alias.strip_prefix('#').unwrap_or(name_alias);
    format!(":{}", field)
}
