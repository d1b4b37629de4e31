//! # In-Memory Table
//!
//! A [`TableClient`] over an in-process map, for tests and local tools.
//! It understands the key conditions and update statements the connector
//! produces:
//!
//! - `#a = :a`, optionally `and #b = :b` or `and begins_with(#b, :b)`
//! - filter expressions of the same clause forms, applied after `Limit`
//! - `SET` / `REMOVE` update statements with upsert and `ALL_NEW` return
//!
//! Each round-trip evaluates at most `page_size` items (the stand-in for
//! the store's response size cap) and returns a `last_evaluated_key` only
//! when matching items remain.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, RwLock};

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::{DataError, DataResult};
use crate::record::{str_field, Record, PK, SK};

use super::client::{QueryInput, QueryOutput, TableClient, UpdateInput};

/// Items evaluated per round-trip unless configured otherwise
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Equals(String, Value),
    BeginsWith(String, String),
}

impl Clause {
    fn attribute(&self) -> &str {
        match self {
            Clause::Equals(attr, _) | Clause::BeginsWith(attr, _) => attr,
        }
    }

    fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::Equals(attr, value) => record.get(attr) == Some(value),
            Clause::BeginsWith(attr, prefix) => {
                str_field(record, attr).is_some_and(|v| v.starts_with(prefix.as_str()))
            }
        }
    }
}

fn resolve_name(alias: &str, names: &Record) -> DataResult<String> {
    if !alias.starts_with('#') {
        return Ok(alias.to_string());
    }
    names
        .get(alias)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| DataError::backend(format!("unresolved attribute name {}", alias)))
}

fn resolve_value(alias: &str, values: &Record) -> DataResult<Value> {
    values
        .get(alias)
        .cloned()
        .ok_or_else(|| DataError::backend(format!("unresolved attribute value {}", alias)))
}

fn parse_clauses(expression: &str, names: &Record, values: &Record) -> DataResult<Vec<Clause>> {
    expression
        .split(" and ")
        .map(str::trim)
        .map(|clause| {
            if let Some(args) = clause
                .strip_prefix("begins_with(")
                .and_then(|rest| rest.strip_suffix(')'))
            {
                let (name, value) = args
                    .split_once(',')
                    .ok_or_else(|| DataError::backend(format!("malformed clause '{}'", clause)))?;
                let prefix = resolve_value(value.trim(), values)?;
                let prefix = prefix
                    .as_str()
                    .ok_or_else(|| DataError::backend("begins_with needs a string operand"))?
                    .to_string();
                return Ok(Clause::BeginsWith(resolve_name(name.trim(), names)?, prefix));
            }

            let (name, value) = clause
                .split_once('=')
                .ok_or_else(|| DataError::backend(format!("unsupported clause '{}'", clause)))?;
            Ok(Clause::Equals(
                resolve_name(name.trim(), names)?,
                resolve_value(value.trim(), values)?,
            ))
        })
        .collect()
}

/// Ordering key of an item within a query: sort attribute, then primary key
fn position(record: &Record, sort_attr: &str) -> (String, String, String) {
    let sort = match record.get(sort_attr) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    let pk = str_field(record, PK).unwrap_or_default().to_string();
    let sk = str_field(record, SK).unwrap_or_default().to_string();
    (sort, pk, sk)
}

/// In-process table keyed by (`pk`, `sk`)
#[derive(Debug)]
pub struct InMemoryTable {
    items: RwLock<BTreeMap<(String, String), Record>>,
    page_size: usize,
    queries: Mutex<Vec<QueryInput>>,
    fail_queries_after: Mutex<Option<usize>>,
    failing_updates: RwLock<HashSet<String>>,
}

impl Default for InMemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Table whose round-trips evaluate at most `page_size` items
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            queries: Mutex::new(Vec::new()),
            fail_queries_after: Mutex::new(None),
            failing_updates: RwLock::new(HashSet::new()),
        }
    }

    /// Store a record as-is. Records without string `pk`/`sk` are ignored.
    pub fn put(&self, record: Record) {
        let key = match (str_field(&record, PK), str_field(&record, SK)) {
            (Some(pk), Some(sk)) => (pk.to_string(), sk.to_string()),
            _ => return,
        };
        if let Ok(mut items) = self.items.write() {
            items.insert(key, record);
        }
    }

    pub fn get(&self, pk: &str, sk: &str) -> Option<Record> {
        let items = self.items.read().ok()?;
        items.get(&(pk.to_string(), sk.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of query round-trips served so far
    pub fn query_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// The most recent query input
    pub fn last_query(&self) -> Option<QueryInput> {
        self.queries.lock().ok()?.last().cloned()
    }

    /// All query inputs, in arrival order
    pub fn queries(&self) -> Vec<QueryInput> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    /// Fail every query after the first `calls` round-trips
    pub fn fail_queries_after(&self, calls: usize) {
        if let Ok(mut limit) = self.fail_queries_after.lock() {
            *limit = Some(calls);
        }
    }

    /// Reject updates to partition `pk`
    pub fn fail_updates_for(&self, pk: impl Into<String>) {
        if let Ok(mut failing) = self.failing_updates.write() {
            failing.insert(pk.into());
        }
    }

    fn run_query(&self, input: QueryInput) -> DataResult<QueryOutput> {
        let calls = {
            let mut queries = self.queries.lock().map_err(|e| DataError::backend(e.to_string()))?;
            queries.push(input.clone());
            queries.len()
        };
        let fail_after = *self
            .fail_queries_after
            .lock()
            .map_err(|e| DataError::backend(e.to_string()))?;
        if fail_after.is_some_and(|n| calls > n) {
            return Err(DataError::backend("injected query failure"));
        }

        let conditions = parse_clauses(&input.key_condition, &input.attribute_names, &input.attribute_values)?;
        let filters = match &input.filter_expression {
            Some(expr) => parse_clauses(expr, &input.attribute_names, &input.attribute_values)?,
            None => Vec::new(),
        };
        let key_attr = conditions
            .first()
            .map(|c| c.attribute().to_string())
            .ok_or_else(|| DataError::backend("empty key condition"))?;
        let sort_attr = conditions
            .get(1)
            .map(|c| c.attribute().to_string())
            .unwrap_or_else(|| SK.to_string());
        let descending = input.scan_index_forward == Some(false);

        let mut matched: Vec<Record> = {
            let items = self.items.read().map_err(|e| DataError::backend(e.to_string()))?;
            items
                .values()
                .filter(|r| conditions.iter().all(|c| c.matches(r)))
                .cloned()
                .collect()
        };
        matched.sort_by(|a, b| {
            let order = position(a, &sort_attr).cmp(&position(b, &sort_attr));
            if descending {
                order.reverse()
            } else {
                order
            }
        });

        if let Some(start) = &input.exclusive_start_key {
            let start = position(start, &sort_attr);
            let after = if descending { Ordering::Less } else { Ordering::Greater };
            matched.retain(|r| position(r, &sort_attr).cmp(&start) == after);
        }

        let evaluate = input.limit.unwrap_or(self.page_size).min(self.page_size);
        let more = matched.len() > evaluate;
        matched.truncate(evaluate);

        let last_evaluated_key = match matched.last() {
            Some(last) if more => {
                let mut key = Record::new();
                for attr in [PK, SK, key_attr.as_str(), sort_attr.as_str()] {
                    if let Some(value) = last.get(attr) {
                        key.insert(attr.to_string(), value.clone());
                    }
                }
                Some(key)
            }
            _ => None,
        };

        let items = matched
            .into_iter()
            .filter(|r| filters.iter().all(|c| c.matches(r)))
            .collect();

        Ok(QueryOutput {
            items,
            last_evaluated_key,
        })
    }

    fn run_update(&self, input: UpdateInput) -> DataResult<Record> {
        let (pk, sk) = match (str_field(&input.key, PK), str_field(&input.key, SK)) {
            (Some(pk), Some(sk)) => (pk.to_string(), sk.to_string()),
            _ => return Err(DataError::backend("update key needs string pk and sk")),
        };
        if input.statement.is_empty() {
            return Err(DataError::backend("empty update expression"));
        }
        let failing = self
            .failing_updates
            .read()
            .map_err(|e| DataError::backend(e.to_string()))?
            .contains(&pk);
        if failing {
            return Err(DataError::backend(format!("injected update failure for {}", pk)));
        }

        let statement = &input.statement;
        let mut items = self.items.write().map_err(|e| DataError::backend(e.to_string()))?;
        let record = items
            .entry((pk, sk))
            .or_insert_with(|| input.key.clone());

        for field in statement.set_fields() {
            let value = statement
                .attribute_values
                .get(&format!(":{}", field))
                .cloned()
                .ok_or_else(|| DataError::backend(format!("no value for {}", field)))?;
            record.insert(field.to_string(), value);
        }
        let removed: HashSet<&str> = statement.removed_fields().collect();
        record.retain(|field, _| !removed.contains(field.as_str()));

        Ok(record.clone())
    }
}

impl TableClient for InMemoryTable {
    fn query(&self, input: QueryInput) -> BoxFuture<'_, DataResult<QueryOutput>> {
        let result = self.run_query(input);
        Box::pin(async move { result })
    }

    fn update(&self, input: UpdateInput) -> BoxFuture<'_, DataResult<Record>> {
        let result = self.run_update(input);
        Box::pin(async move { result })
    }
}
