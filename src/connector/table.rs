//! Table connector
//!
//! Builds key conditions and update statements for the injected
//! [`TableClient`] and runs paginated reads through the
//! [`PaginatedQueryEngine`].

use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture};
use serde::Deserialize;
use serde_json::Value;

use crate::config::TableConfig;
use crate::error::DataResult;
use crate::mapper::AggregateReconstructor;
use crate::observability::{log_event, Event};
use crate::pagination::{NativePage, Page, PageRequest, PageSource, PaginatedQueryEngine};
use crate::record::{ChangeSet, Record, PK, SK};
use crate::update::compile;

use super::client::{QueryInput, TableClient, UpdateInput};

/// One entry of a batch update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRequest {
    pub key: Record,
    pub changes: ChangeSet,
}

impl UpdateRequest {
    pub fn new(key: Record, changes: ChangeSet) -> Self {
        Self { key, changes }
    }
}

/// Exact-key lookup of one partition (optionally one sort key)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetRequest {
    /// Partition key value
    pub id: String,
    #[serde(default)]
    pub index: Option<String>,
    /// Partition key attribute (default: `pk`)
    #[serde(default)]
    pub pk_name: Option<String>,
    /// Sort key value
    #[serde(default)]
    pub sk: Option<String>,
    /// Sort key attribute (default: `sk`)
    #[serde(default)]
    pub sk_name: Option<String>,
}

impl GetRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn sort_key(mut self, sk: impl Into<String>) -> Self {
        self.sk = Some(sk.into());
        self
    }

    pub fn index(mut self, index: impl Into<String>, pk_name: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self.pk_name = Some(pk_name.into());
        self
    }
}

/// Key-condition query with optional sort key prefix
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub index: Option<String>,
    pub key_name: String,
    pub key_value: Value,
    /// Range attribute; used only together with `range_begins_with`
    #[serde(default)]
    pub range_name: Option<String>,
    #[serde(default)]
    pub range_begins_with: Option<String>,
    /// Opaque cursor from a previous page
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub scan_index_forward: Option<bool>,
    #[serde(default)]
    pub filter_expression: Option<String>,
    /// Extra aliases for the filter expression; override generated ones
    #[serde(default)]
    pub attribute_names: Record,
    #[serde(default)]
    pub attribute_values: Record,
}

impl QueryRequest {
    pub fn new(key_name: impl Into<String>, key_value: impl Into<Value>) -> Self {
        Self {
            key_name: key_name.into(),
            key_value: key_value.into(),
            ..Default::default()
        }
    }

    pub fn begins_with(mut self, range_name: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.range_name = Some(range_name.into());
        self.range_begins_with = Some(prefix.into());
        self
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn after(mut self, last: Option<String>) -> Self {
        self.last = last;
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_index_forward = Some(false);
        self
    }

    pub fn filter(mut self, expression: impl Into<String>, names: Record, values: Record) -> Self {
        self.filter_expression = Some(expression.into());
        self.attribute_names = names;
        self.attribute_values = values;
        self
    }

    fn range(&self) -> Option<(&str, &str)> {
        match (&self.range_name, &self.range_begins_with) {
            (Some(name), Some(prefix)) if !name.is_empty() && !prefix.is_empty() => {
                Some((name.as_str(), prefix.as_str()))
            }
            _ => None,
        }
    }
}

/// Data-access connector over one table
#[derive(Clone)]
pub struct Connector {
    config: TableConfig,
    client: Arc<dyn TableClient>,
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector").field("config", &self.config).finish()
    }
}

impl Connector {
    pub fn new(config: TableConfig, client: Arc<dyn TableClient>) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Reconstructor for aggregates of this table, splitting sort keys on
    /// the configured delimiter
    pub fn aggregate(&self, root: impl Into<String>) -> AggregateReconstructor {
        AggregateReconstructor::new(root).delimiter(self.config.delimiter)
    }

    /// Apply a partial update and return the post-update record
    pub async fn update(&self, key: Record, changes: &ChangeSet) -> DataResult<Record> {
        let input = UpdateInput {
            table_name: self.config.table_name.clone(),
            key,
            statement: compile(changes),
        };
        let expression = input.statement.expression();
        let key_json = Value::Object(input.key.clone()).to_string();

        log_event(
            Event::UpdateSent,
            &[
                ("expression", expression.as_str()),
                ("key", key_json.as_str()),
                ("table", self.config.table_name.as_str()),
            ],
        );

        match self.client.update(input).await {
            Ok(record) => {
                log_event(
                    Event::UpdateApplied,
                    &[("key", key_json.as_str()), ("fields", record.len().to_string().as_str())],
                );
                Ok(record)
            }
            Err(e) => {
                log_event(
                    Event::UpdateFailed,
                    &[("error", e.to_string().as_str()), ("key", key_json.as_str())],
                );
                Err(e)
            }
        }
    }

    /// Issue every update concurrently. Every update runs to completion
    /// even when a sibling fails; results follow request order and the
    /// first failure in that order is returned.
    pub async fn batch_update(&self, batch: &[UpdateRequest]) -> DataResult<Vec<Record>> {
        let results = join_all(
            batch
                .iter()
                .map(|req| self.update(req.key.clone(), &req.changes)),
        )
        .await
        .into_iter()
        .collect::<DataResult<Vec<_>>>()?;

        log_event(
            Event::BatchUpdateComplete,
            &[("updates", results.len().to_string().as_str())],
        );
        Ok(results)
    }

    /// Records of one partition, or the single record at (`id`, `sk`).
    /// Reads are consistent unless an index is used. One round-trip.
    pub async fn get(&self, request: &GetRequest) -> DataResult<Vec<Record>> {
        let mut names = Record::new();
        let mut values = Record::new();
        names.insert("#pk".into(), request.pk_name.as_deref().unwrap_or(PK).into());
        values.insert(":pk".into(), request.id.as_str().into());

        let key_condition = match &request.sk {
            Some(sk) => {
                names.insert("#sk".into(), request.sk_name.as_deref().unwrap_or(SK).into());
                values.insert(":sk".into(), sk.as_str().into());
                "#pk = :pk and #sk = :sk"
            }
            None => "#pk = :pk",
        };

        let input = QueryInput {
            table_name: self.config.table_name.clone(),
            index_name: request.index.clone(),
            key_condition: key_condition.to_string(),
            attribute_names: names,
            attribute_values: values,
            filter_expression: None,
            scan_index_forward: None,
            consistent_read: request.index.is_none(),
            limit: None,
            exclusive_start_key: None,
        };

        let output = TableSource::new(self.client.clone(), input)
            .fetch_page(None, None)
            .await?;
        Ok(output.items)
    }

    /// One client page of a key-condition query
    pub async fn query(&self, request: &QueryRequest) -> DataResult<Page<Record>> {
        let engine = PaginatedQueryEngine::new(self.source(request))
            .with_default_limit(self.config.default_limit);

        engine
            .page(PageRequest {
                limit: request.limit,
                cursor: request.last.clone(),
            })
            .await
    }

    /// Every record matching the query, ignoring any limit
    pub async fn query_all(&self, request: &QueryRequest) -> DataResult<Vec<Record>> {
        PaginatedQueryEngine::new(self.source(request)).drain().await
    }

    fn source(&self, request: &QueryRequest) -> TableSource {
        TableSource::new(self.client.clone(), self.query_input(request))
    }

    fn query_input(&self, request: &QueryRequest) -> QueryInput {
        let range = request.range();

        let mut names = Record::new();
        let mut values = Record::new();
        names.insert("#keyName".into(), request.key_name.as_str().into());
        values.insert(":keyName".into(), request.key_value.clone());
        if let Some((name, prefix)) = range {
            names.insert("#rangeName".into(), name.into());
            values.insert(":rangeBeginsWithValue".into(), prefix.into());
        }
        names.extend(request.attribute_names.clone());
        values.extend(request.attribute_values.clone());

        let key_condition = match range {
            Some(_) => "#keyName = :keyName and begins_with(#rangeName, :rangeBeginsWithValue)",
            None => "#keyName = :keyName",
        };

        QueryInput {
            table_name: self.config.table_name.clone(),
            index_name: request.index.clone(),
            key_condition: key_condition.to_string(),
            attribute_names: names,
            attribute_values: values,
            filter_expression: request.filter_expression.clone(),
            scan_index_forward: request.scan_index_forward,
            consistent_read: false,
            limit: None,
            exclusive_start_key: None,
        }
    }
}

/// [`PageSource`] adapter: one query template, resumed from each
/// `last_evaluated_key`
struct TableSource {
    client: Arc<dyn TableClient>,
    input: QueryInput,
}

impl TableSource {
    fn new(client: Arc<dyn TableClient>, input: QueryInput) -> Self {
        Self { client, input }
    }
}

impl PageSource for TableSource {
    type Item = Record;
    type Cursor = Record;

    fn fetch_page(
        &self,
        start: Option<Record>,
        limit: Option<usize>,
    ) -> BoxFuture<'_, DataResult<NativePage<Record, Record>>> {
        let input = QueryInput {
            exclusive_start_key: start,
            limit,
            ..self.input.clone()
        };
        Box::pin(async move {
            let output = self.client.query(input).await?;
            Ok(NativePage {
                items: output.items,
                next: output.last_evaluated_key,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::client::QueryOutput;
    use crate::connector::InMemoryTable;
    use crate::error::DataError;
    use crate::record::from_value;
    use serde_json::json;
    use std::time::Duration;

    /// Rejects pk `bad` at once; delays every other update
    struct SlowTable {
        inner: Arc<InMemoryTable>,
    }

    impl TableClient for SlowTable {
        fn query(&self, input: QueryInput) -> BoxFuture<'_, DataResult<QueryOutput>> {
            self.inner.query(input)
        }

        fn update(&self, input: UpdateInput) -> BoxFuture<'_, DataResult<Record>> {
            Box::pin(async move {
                if input.key.get(PK).and_then(Value::as_str) == Some("bad") {
                    return Err(DataError::backend("rejected"));
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.inner.update(input).await
            })
        }
    }

    fn record(value: Value) -> Record {
        from_value(value).unwrap()
    }

    fn connector(table: &Arc<InMemoryTable>) -> Connector {
        Connector::new(TableConfig::with_table("t1"), table.clone())
    }

    #[tokio::test]
    async fn test_get_partition_is_consistent() {
        let table = Arc::new(InMemoryTable::new());
        table.put(record(json!({"pk": "1", "sk": "a"})));
        table.put(record(json!({"pk": "1", "sk": "b"})));
        table.put(record(json!({"pk": "2", "sk": "a"})));

        let items = connector(&table).get(&GetRequest::new("1")).await.unwrap();

        assert_eq!(items.len(), 2);
        let input = table.last_query().unwrap();
        assert_eq!(input.key_condition, "#pk = :pk");
        assert!(input.consistent_read);
        assert_eq!(input.table_name, "t1");
        assert_eq!(input.limit, None);
    }

    #[tokio::test]
    async fn test_get_by_sort_key_on_index() {
        let table = Arc::new(InMemoryTable::new());
        table.put(record(json!({"pk": "1", "sk": "a", "data": "d1"})));
        table.put(record(json!({"pk": "2", "sk": "a", "data": "d1"})));
        table.put(record(json!({"pk": "2", "sk": "b", "data": "d1"})));

        let request = GetRequest::new("d1").index("gsi1", "data").sort_key("a");
        let items = connector(&table).get(&request).await.unwrap();

        assert_eq!(items.len(), 2);
        let input = table.last_query().unwrap();
        assert_eq!(input.key_condition, "#pk = :pk and #sk = :sk");
        assert_eq!(input.attribute_names["#pk"], "data");
        assert_eq!(input.attribute_names["#sk"], "sk");
        assert!(!input.consistent_read);
    }

    #[tokio::test]
    async fn test_query_condition_and_merged_aliases() {
        let table = Arc::new(InMemoryTable::new());
        let request = QueryRequest::new("pk", "1")
            .begins_with("sk", "child")
            .filter(
                "#status = :status",
                record(json!({"#status": "status"})),
                record(json!({":status": "live"})),
            )
            .descending();

        connector(&table).query(&request).await.unwrap();

        let input = table.last_query().unwrap();
        assert_eq!(
            input.key_condition,
            "#keyName = :keyName and begins_with(#rangeName, :rangeBeginsWithValue)"
        );
        assert_eq!(
            Value::Object(input.attribute_names),
            json!({"#keyName": "pk", "#rangeName": "sk", "#status": "status"})
        );
        assert_eq!(
            Value::Object(input.attribute_values),
            json!({":keyName": "1", ":rangeBeginsWithValue": "child", ":status": "live"})
        );
        assert_eq!(input.limit, Some(25));
        assert_eq!(input.scan_index_forward, Some(false));
        assert!(!input.consistent_read);
    }

    #[tokio::test]
    async fn test_range_needs_name_and_prefix() {
        let table = Arc::new(InMemoryTable::new());
        let mut request = QueryRequest::new("pk", "1");
        request.range_name = Some("sk".to_string());

        connector(&table).query(&request).await.unwrap();

        let input = table.last_query().unwrap();
        assert_eq!(input.key_condition, "#keyName = :keyName");
        assert!(!input.attribute_names.contains_key("#rangeName"));
    }

    #[tokio::test]
    async fn test_update_returns_all_new() {
        let table = Arc::new(InMemoryTable::new());
        table.put(record(json!({"pk": "1", "sk": "thing", "name": "a", "tag": "x"})));

        let changes = ChangeSet::new().set("name", "b").remove("tag").unset("other");
        let out = connector(&table)
            .update(record(json!({"pk": "1", "sk": "thing"})), &changes)
            .await
            .unwrap();

        assert_eq!(Value::Object(out), json!({"pk": "1", "sk": "thing", "name": "b"}));
    }

    #[tokio::test]
    async fn test_batch_update_surfaces_failure() {
        let table = Arc::new(InMemoryTable::new());
        table.fail_updates_for("2");

        let batch = vec![
            UpdateRequest::new(record(json!({"pk": "1", "sk": "a"})), ChangeSet::new().set("n", 1)),
            UpdateRequest::new(record(json!({"pk": "2", "sk": "a"})), ChangeSet::new().set("n", 2)),
        ];

        let err = connector(&table).batch_update(&batch).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_batch_update_keeps_request_order() {
        let table = Arc::new(InMemoryTable::new());
        let batch: Vec<_> = (0..5)
            .map(|n| {
                UpdateRequest::new(
                    record(json!({"pk": n.to_string(), "sk": "a"})),
                    ChangeSet::new().set("n", n),
                )
            })
            .collect();

        let out = connector(&table).batch_update(&batch).await.unwrap();

        let ns: Vec<_> = out.iter().map(|r| r["n"].clone()).collect();
        assert_eq!(ns, vec![json!(0), json!(1), json!(2), json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn test_batch_failure_does_not_cancel_siblings() {
        let table = Arc::new(InMemoryTable::new());
        let slow = Arc::new(SlowTable {
            inner: table.clone(),
        });
        let connector = Connector::new(TableConfig::with_table("t1"), slow);

        let batch = vec![
            UpdateRequest::new(record(json!({"pk": "good", "sk": "a"})), ChangeSet::new().set("n", 1)),
            UpdateRequest::new(record(json!({"pk": "bad", "sk": "a"})), ChangeSet::new().set("n", 2)),
        ];

        let err = connector.batch_update(&batch).await.unwrap_err();

        assert_eq!(err.code(), "AERODATA_BACKEND_FAILURE");
        assert_eq!(table.get("good", "a").unwrap()["n"], 1);
        assert!(table.get("bad", "a").is_none());
    }

    #[tokio::test]
    async fn test_batch_returns_first_failure_in_request_order() {
        let table = Arc::new(InMemoryTable::new());
        table.fail_updates_for("1");
        let slow = Arc::new(SlowTable {
            inner: table.clone(),
        });
        let connector = Connector::new(TableConfig::with_table("t1"), slow);

        // pk 1 fails after its delay, pk bad fails at once
        let batch = vec![
            UpdateRequest::new(record(json!({"pk": "1", "sk": "a"})), ChangeSet::new().set("n", 1)),
            UpdateRequest::new(record(json!({"pk": "bad", "sk": "a"})), ChangeSet::new().set("n", 2)),
        ];

        let err = connector.batch_update(&batch).await.unwrap_err();

        assert!(err.to_string().contains("injected update failure for 1"));
    }

    #[tokio::test]
    async fn test_aggregate_uses_configured_delimiter() {
        let table = Arc::new(InMemoryTable::new());
        table.put(record(json!({"pk": "1", "sk": "thing", "discriminator": "thing"})));
        table.put(record(json!({"pk": "1", "sk": "child#1", "discriminator": "child", "n": 1})));
        let config = TableConfig {
            delimiter: '#',
            ..TableConfig::with_table("t1")
        };
        let connector = Connector::new(config, table);

        let items = connector.get(&GetRequest::new("1")).await.unwrap();
        let out = connector
            .aggregate("thing")
            .cardinality("child", 999)
            .reconstruct(items, &crate::mapper::MapContext::new())
            .await
            .unwrap();

        assert_eq!(out["child"][0]["n"], 1);
    }
}
