//! Sparse update compiler
//!
//! Turns a change-set into a partial-update statement. Each mentioned
//! field lands in exactly one of three places:
//!
//! - SET, when the change carries a concrete value
//! - REMOVE, when the change is the absence-marker
//! - nowhere, when the change is the unset sentinel
//!
//! Field names are always referenced through `#field` aliases so reserved
//! words never collide with the expression grammar.

use serde_json::Value;

use crate::record::{Change, ChangeClass, ChangeSet, Record};

use super::statement::{ReturnValues, UpdateStatement};

/// Compile a change-set into an update statement.
///
/// Clause entries follow the change-set's insertion order.
pub fn compile(changes: &ChangeSet) -> UpdateStatement {
    let mut attribute_names = Record::new();
    let mut attribute_values = Record::new();
    let mut assignments = Vec::new();
    let mut removals = Vec::new();

    for (field, change) in changes.iter() {
        let name_alias = format!("#{}", field);
        match change {
            Change::Set(value) if change.class() == ChangeClass::Set => {
                let value_alias = format!(":{}", field);
                assignments.push(format!("{} = {}", name_alias, value_alias));
                attribute_names.insert(name_alias, Value::String(field.to_string()));
                attribute_values.insert(value_alias, value.clone());
            }
            _ if change.class() == ChangeClass::Remove => {
                removals.push(name_alias.clone());
                attribute_names.insert(name_alias, Value::String(field.to_string()));
            }
            _ => {}
        }
    }

    let set_clause = (!assignments.is_empty()).then(|| format!("SET {}", assignments.join(", ")));
    let remove_clause = (!removals.is_empty()).then(|| format!("REMOVE {}", removals.join(", ")));

    UpdateStatement {
        attribute_names,
        attribute_values,
        set_clause,
        remove_clause,
        return_values: ReturnValues::AllNew,
    }
}
