//! # Table Client Trait
//!
//! The network client the table connector drives. Requests carry
//! expression strings with `#name` / `:value` aliases resolved through the
//! attribute tables, the way the store's query and update APIs expect.

use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::error::DataResult;
use crate::record::Record;
use crate::update::UpdateStatement;

/// One query round-trip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryInput {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub key_condition: String,
    pub attribute_names: Record,
    pub attribute_values: Record,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    /// `Some(false)` reads in descending sort key order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
    pub consistent_read: bool,
    /// Items evaluated per round-trip; `None` leaves it to the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_start_key: Option<Record>,
}

/// Result of one query round-trip
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryOutput {
    pub items: Vec<Record>,
    /// Key to resume from; absent when the backend is exhausted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<Record>,
}

/// One partial update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateInput {
    pub table_name: String,
    pub key: Record,
    pub statement: UpdateStatement,
}

/// Key/value table backend
pub trait TableClient: Send + Sync {
    /// Run one query round-trip
    fn query(&self, input: QueryInput) -> BoxFuture<'_, DataResult<QueryOutput>>;

    /// Apply an update and return the full post-update record
    fn update(&self, input: UpdateInput) -> BoxFuture<'_, DataResult<Record>>;
}
