//! Aggregate Mapping Tests
//!
//! Reading a partition back as one aggregate:
//! - projection of single records under the default policy
//! - root merge, role derivation and cardinality
//! - soft-delete filtering
//! - decryption before mapping, end to end over the in-memory table

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{json, Value};

use aerodata::config::{EncryptionConfig, TableConfig};
use aerodata::connector::{Connector, GetRequest, InMemoryTable};
use aerodata::crypto::{Encrypted, Encryption, FieldCipher};
use aerodata::mapper::{
    AggregateReconstructor, EntityMapper, FieldPolicy, MapContext, ProjectionMapper, SortKeySegment,
};
use aerodata::record::{from_value, ChangeSet, Record};
use aerodata::DataResult;

// =============================================================================
// Helper Functions
// =============================================================================

fn record(value: Value) -> Record {
    from_value(value).unwrap()
}

fn records(value: Value) -> Vec<Record> {
    value
        .as_array()
        .unwrap()
        .iter()
        .cloned()
        .filter_map(from_value)
        .collect()
}

fn related() -> EntityMapper {
    EntityMapper::projection(
        FieldPolicy::new()
            .with_rename([("sk", "id"), ("data", "name")])
            .transform("sk", SortKeySegment::default()),
    )
}

/// Prefixes every string field named in the metadata with `enc:`
struct PrefixCipher;

fn named_fields(options: &Record) -> Vec<String> {
    options
        .get("fields")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

impl FieldCipher for PrefixCipher {
    fn encrypt(&self, record: Record, options: Record) -> BoxFuture<'_, DataResult<Encrypted>> {
        let fields = named_fields(&options);
        let encrypted = record
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) if fields.contains(&k) => (k, Value::String(format!("enc:{}", s))),
                other => (k, other),
            })
            .collect();
        Box::pin(async move {
            Ok(Encrypted {
                encrypted,
                metadata: json!({"fields": fields}),
            })
        })
    }

    fn decrypt(&self, record: Record, options: Record) -> BoxFuture<'_, DataResult<Record>> {
        let fields = named_fields(&options);
        let decrypted = record
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) if fields.contains(&k) => {
                    let plain = s.strip_prefix("enc:").unwrap_or(&s).to_string();
                    (k, Value::String(plain))
                }
                other => (k, other),
            })
            .collect();
        Box::pin(async move { Ok(decrypted) })
    }
}

// =============================================================================
// Projection
// =============================================================================

#[tokio::test]
async fn test_default_projection() {
    let out = ProjectionMapper::default()
        .project(
            record(json!({"pk": "1", "sk": "thing", "data": "x", "extra": "y"})),
            &MapContext::new(),
        )
        .await
        .unwrap();

    assert_eq!(Value::Object(out), json!({"id": "1", "extra": "y"}));
}

// =============================================================================
// Reconstruction
// =============================================================================

/// A lone root record reconstructs to exactly its projection.
#[tokio::test]
async fn test_root_only_equals_projection() {
    let root = record(json!({"pk": "1", "sk": "thing", "discriminator": "thing", "data": "t", "a": 1}));
    let policy = FieldPolicy::new().rename("data", "name");

    let projected = ProjectionMapper::new(policy.clone())
        .project(root.clone(), &MapContext::new())
        .await
        .unwrap();
    let aggregate = AggregateReconstructor::new("thing")
        .entity("thing", EntityMapper::projection(policy))
        .reconstruct(vec![root], &MapContext::new())
        .await
        .unwrap();

    assert_eq!(aggregate, projected);
}

/// A list role, relation before root, identity mappers.
#[tokio::test]
async fn test_relation_before_root() {
    let input = records(json!([
        {"pk": "1", "sk": "child|1", "discriminator": "child", "n": 1},
        {"pk": "1", "sk": "thing", "discriminator": "thing", "title": "t"},
    ]));

    let out = AggregateReconstructor::new("thing")
        .cardinality("child", 999)
        .reconstruct(input, &MapContext::new())
        .await
        .unwrap();

    assert_eq!(
        Value::Object(out),
        json!({
            "pk": "1",
            "sk": "thing",
            "discriminator": "thing",
            "title": "t",
            "child": [{"pk": "1", "sk": "child|1", "discriminator": "child", "n": 1}],
        })
    );
}

/// Truthy deletion markers drop the record; absent, null and false keep it.
#[tokio::test]
async fn test_soft_deleted_records_are_skipped() {
    let input = records(json!([
        {"sk": "items|1", "discriminator": "item", "n": 1},
        {"sk": "items|2", "discriminator": "item", "n": 2, "deleted": null},
        {"sk": "items|3", "discriminator": "item", "n": 3, "deleted": true},
        {"sk": "items|4", "discriminator": "item", "n": 4, "deleted": false},
    ]));

    let out = AggregateReconstructor::new("thing")
        .cardinality("items", 999)
        .reconstruct(input, &MapContext::new())
        .await
        .unwrap();

    let ns: Vec<_> = out["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["n"].as_u64().unwrap())
        .collect();
    assert_eq!(ns, vec![1, 2, 4]);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_partition_round_trip_with_encryption() {
    let table = Arc::new(InMemoryTable::new());
    let connector = Connector::new(TableConfig::with_table("things"), table.clone());
    let encryption = Arc::new(Encryption::new(Arc::new(PrefixCipher), EncryptionConfig::default()));

    let root = encryption
        .encrypt(
            &record(json!({"fields": ["secret"]})),
            record(json!({"discriminator": "thing", "data": "thing0", "secret": "s3"})),
        )
        .await
        .unwrap();
    let root_key = record(json!({"pk": "1", "sk": "thing"}));
    connector.update(root_key, &ChangeSet::from(root)).await.unwrap();

    for n in 1..=2 {
        let key = record(json!({"pk": "1", "sk": format!("child|{}", n)}));
        let changes = ChangeSet::new()
            .set("discriminator", "child")
            .set("data", format!("child{}", n));
        connector.update(key, &changes).await.unwrap();
    }
    let peer = record(json!({"pk": "1", "sk": "peer|1"}));
    connector
        .update(peer, &ChangeSet::new().set("discriminator", "peer").set("deleted", true))
        .await
        .unwrap();

    let stored = table.get("1", "thing").unwrap();
    assert_eq!(stored["secret"], "enc:s3");

    let items = connector.get(&GetRequest::new("1")).await.unwrap();
    assert_eq!(items.len(), 4);

    let ctx = MapContext::new().with_decryptor(encryption);
    let aggregate = AggregateReconstructor::new("thing")
        .cardinality("child", 999)
        .entity(
            "thing",
            EntityMapper::projection(FieldPolicy::new().rename("data", "name")),
        )
        .entity("child", related())
        .entity("peer", related())
        .reconstruct(items, &ctx)
        .await
        .unwrap();

    assert_eq!(
        Value::Object(aggregate),
        json!({
            "id": "1",
            "name": "thing0",
            "secret": "s3",
            "child": [
                {"id": "1", "name": "child1"},
                {"id": "2", "name": "child2"},
            ],
        })
    );
}
