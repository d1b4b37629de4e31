//! Field transforms
//!
//! A transform receives the current value of its field, the whole
//! (decrypted) record and the call context, and may suspend.

use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DataResult;
use crate::record::{Record, DEFAULT_DELIMITER};

use super::context::MapContext;

/// Per-field value transformation
pub trait FieldTransform: Send + Sync {
    fn apply<'a>(
        &'a self,
        value: Value,
        record: &'a Record,
        ctx: &'a MapContext,
    ) -> BoxFuture<'a, DataResult<Value>>;
}

/// Adapter for synchronous closures
pub struct SyncTransform<F>(pub F);

impl<F> FieldTransform for SyncTransform<F>
where
    F: Fn(Value, &Record, &MapContext) -> DataResult<Value> + Send + Sync,
{
    fn apply<'a>(
        &'a self,
        value: Value,
        record: &'a Record,
        ctx: &'a MapContext,
    ) -> BoxFuture<'a, DataResult<Value>> {
        let result = (self.0)(value, record, ctx);
        Box::pin(async move { result })
    }
}

/// Picks one segment of a delimited string, typically a sort key such as
/// `child|42`. Missing segments and non-strings yield `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeySegment {
    pub index: usize,
    pub delimiter: char,
}

impl Default for SortKeySegment {
    /// The segment after the role prefix
    fn default() -> Self {
        Self {
            index: 1,
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl SortKeySegment {
    pub fn segment(&self, value: &Value) -> Value {
        value
            .as_str()
            .and_then(|s| s.split(self.delimiter).nth(self.index))
            .map(|s| Value::String(s.to_string()))
            .unwrap_or(Value::Null)
    }
}

impl FieldTransform for SortKeySegment {
    fn apply<'a>(
        &'a self,
        value: Value,
        _record: &'a Record,
        _ctx: &'a MapContext,
    ) -> BoxFuture<'a, DataResult<Value>> {
        let out = self.segment(&value);
        Box::pin(async move { Ok(out) })
    }
}

/// Transforms that can be named in a JSON policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinTransform {
    /// [`SortKeySegment::default`]
    SortKeySegment,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_segment() {
        let t = SortKeySegment::default();
        assert_eq!(t.segment(&json!("one2many|1")), json!("1"));
        assert_eq!(t.segment(&json!("a|b|c")), json!("b"));
        assert_eq!(t.segment(&json!("thing")), Value::Null);
        assert_eq!(t.segment(&json!(7)), Value::Null);
    }

    #[tokio::test]
    async fn test_sync_adapter() {
        let upper = SyncTransform(|v: Value, _: &Record, _: &MapContext| -> DataResult<Value> {
            Ok(Value::String(v.as_str().unwrap_or_default().to_uppercase()))
        });
        let record = Record::new();
        let ctx = MapContext::new();

        let out = upper.apply(json!("v1"), &record, &ctx).await.unwrap();
        assert_eq!(out, json!("V1"));
    }
}
