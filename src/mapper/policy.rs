//! Field policy: defaults, renames, omissions and transforms.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DataResult;
use crate::record::Record;

use super::context::MapContext;
use super::transform::{BuiltinTransform, FieldTransform, SortKeySegment, SyncTransform};

/// Internal storage fields that never reach callers
pub const DEFAULT_OMIT_FIELDS: &[&str] = &[
    "pk",
    "sk",
    "data",
    "data2",
    "data3",
    "data4",
    "discriminator",
    "ttl",
    "latched",
    "deleted",
    "pull",
    "awsregion",
    "aws:rep:updateregion",
    "aws:rep:updatetime",
    "aws:rep:deleting",
    "eem",
];

/// Partition key is exposed as `id`
pub const DEFAULT_RENAME: &[(&str, &str)] = &[("pk", "id")];

/// Immutable per-mapper field policy
#[derive(Clone)]
pub struct FieldPolicy {
    pub(crate) defaults: Record,
    pub(crate) rename: Vec<(String, String)>,
    pub(crate) omit: BTreeSet<String>,
    pub(crate) transforms: Vec<(String, Arc<dyn FieldTransform>)>,
}

impl Default for FieldPolicy {
    fn default() -> Self {
        Self {
            defaults: Record::new(),
            rename: DEFAULT_RENAME
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            omit: DEFAULT_OMIT_FIELDS.iter().map(|f| f.to_string()).collect(),
            transforms: Vec::new(),
        }
    }
}

impl fmt::Debug for FieldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transforms: Vec<_> = self.transforms.iter().map(|(field, _)| field).collect();
        f.debug_struct("FieldPolicy")
            .field("defaults", &self.defaults)
            .field("rename", &self.rename)
            .field("omit", &self.omit)
            .field("transforms", &transforms)
            .finish()
    }
}

impl FieldPolicy {
    /// Default omit set and `pk → id` rename
    pub fn new() -> Self {
        Self::default()
    }

    /// No defaults, renames, omissions or transforms
    pub fn passthrough() -> Self {
        Self {
            defaults: Record::new(),
            rename: Vec::new(),
            omit: BTreeSet::new(),
            transforms: Vec::new(),
        }
    }

    /// Value used when the record lacks `field`
    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Replace all default values
    pub fn with_defaults(mut self, defaults: Record) -> Self {
        self.defaults = defaults;
        self
    }

    /// Add or replace a rename. The source field stays unless omitted.
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        let to = to.into();
        match self.rename.iter_mut().find(|(f, _)| *f == from) {
            Some(entry) => entry.1 = to,
            None => self.rename.push((from, to)),
        }
        self
    }

    /// Replace the whole rename table
    pub fn with_rename<I, K, V>(mut self, rename: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.rename = rename
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        self
    }

    /// Hide a field from callers
    pub fn omit(mut self, field: impl Into<String>) -> Self {
        self.omit.insert(field.into());
        self
    }

    /// Replace the whole omit set
    pub fn with_omit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Expose a field the omit set would hide
    pub fn keep(mut self, field: &str) -> Self {
        self.omit.remove(field);
        self
    }

    /// Register a (possibly asynchronous) transform for `field`
    pub fn transform(mut self, field: impl Into<String>, transform: impl FieldTransform + 'static) -> Self {
        let field = field.into();
        let transform: Arc<dyn FieldTransform> = Arc::new(transform);
        match self.transforms.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = transform,
            None => self.transforms.push((field, transform)),
        }
        self
    }

    /// Register a synchronous transform closure for `field`
    pub fn transform_fn<F>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &Record, &MapContext) -> DataResult<Value> + Send + Sync + 'static,
    {
        self.transform(field, SyncTransform(f))
    }

    /// Whether `field` is hidden
    pub fn omits(&self, field: &str) -> bool {
        self.omit.contains(field)
    }
}

/// JSON form of a [`FieldPolicy`]. Absent tables keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicySpec {
    #[serde(default)]
    pub defaults: Record,
    /// Replaces the default rename table
    #[serde(default)]
    pub rename: Option<BTreeMap<String, String>>,
    /// Replaces the default omit set
    #[serde(default)]
    pub omit: Option<Vec<String>>,
    /// Added to the omit set
    #[serde(default)]
    pub also_omit: Vec<String>,
    #[serde(default)]
    pub transform: BTreeMap<String, BuiltinTransform>,
}

impl From<PolicySpec> for FieldPolicy {
    fn from(spec: PolicySpec) -> Self {
        let mut policy = FieldPolicy::new().with_defaults(spec.defaults);
        if let Some(rename) = spec.rename {
            policy = policy.with_rename(rename);
        }
        if let Some(omit) = spec.omit {
            policy = policy.with_omit(omit);
        }
        for field in spec.also_omit {
            policy = policy.omit(field);
        }
        for (field, builtin) in spec.transform {
            policy = match builtin {
                BuiltinTransform::SortKeySegment => policy.transform(field, SortKeySegment::default()),
            };
        }
        policy
    }
}
