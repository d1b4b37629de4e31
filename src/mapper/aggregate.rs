//! Aggregate reconstruction
//!
//! Folds the records of one partition (a root entity plus its related
//! entities) into a single nested object. Each record is mapped by the
//! mapper registered for its discriminator; the root's mapped fields form
//! the top level and every other record lands under the role named by the
//! first segment of its sort key.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{DataError, DataResult};
use crate::observability::{log_event, Event};
use crate::record::{retain_live, str_field, Record, DEFAULT_DELIMITER, DISCRIMINATOR, SK};

use super::context::MapContext;
use super::policy::{FieldPolicy, PolicySpec};
use super::projection::ProjectionMapper;

/// Mapper resolved for one discriminator
#[derive(Debug, Clone)]
pub enum EntityMapper {
    /// Project through a field policy
    Projection(Arc<ProjectionMapper>),
    /// Return the record unchanged
    Identity,
}

impl EntityMapper {
    pub fn projection(policy: FieldPolicy) -> Self {
        EntityMapper::Projection(Arc::new(ProjectionMapper::new(policy)))
    }

    pub async fn map(&self, record: Record, ctx: &MapContext) -> DataResult<Record> {
        match self {
            EntityMapper::Projection(mapper) => mapper.project(record, ctx).await,
            EntityMapper::Identity => Ok(record),
        }
    }
}

static IDENTITY: EntityMapper = EntityMapper::Identity;

/// Discriminator → mapper table. Unregistered discriminators map to
/// [`EntityMapper::Identity`].
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    mappers: HashMap<String, EntityMapper>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the mapper for `discriminator`
    pub fn register(mut self, discriminator: impl Into<String>, mapper: EntityMapper) -> Self {
        self.mappers.insert(discriminator.into(), mapper);
        self
    }

    pub fn resolve(&self, discriminator: Option<&str>) -> &EntityMapper {
        discriminator
            .and_then(|d| self.mappers.get(d))
            .unwrap_or(&IDENTITY)
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

/// What happens when a singular role receives more than one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardinalityPolicy {
    /// Keep the last record seen and log the overwrite
    #[default]
    LastWriteWins,
    /// Fail with [`DataError::CardinalityMismatch`]
    Strict,
}

/// Rebuilds an aggregate from its stored records
#[derive(Debug, Clone)]
pub struct AggregateReconstructor {
    root: String,
    cardinality: HashMap<String, u32>,
    registry: EntityRegistry,
    delimiter: char,
    policy: CardinalityPolicy,
}

impl AggregateReconstructor {
    /// Reconstructor for aggregates rooted at the `root` discriminator
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            cardinality: HashMap::new(),
            registry: EntityRegistry::new(),
            delimiter: DEFAULT_DELIMITER,
            policy: CardinalityPolicy::default(),
        }
    }

    /// Declare the cardinality of a role. Roles not declared are singular.
    pub fn cardinality(mut self, role: impl Into<String>, count: u32) -> Self {
        self.cardinality.insert(role.into(), count);
        self
    }

    /// Register the mapper for one discriminator
    pub fn entity(mut self, discriminator: impl Into<String>, mapper: EntityMapper) -> Self {
        self.registry = self.registry.register(discriminator, mapper);
        self
    }

    pub fn with_registry(mut self, registry: EntityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sort key delimiter (default: '|')
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn policy(mut self, policy: CardinalityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether `role` collects a list
    pub fn is_many(&self, role: &str) -> bool {
        self.cardinality.get(role).is_some_and(|c| *c > 1)
    }

    /// Role of a relation record: the sort key text before the first
    /// delimiter, or the whole sort key when there is none
    pub fn role_of<'a>(&self, record: &'a Record) -> DataResult<&'a str> {
        let sk = str_field(record, SK).ok_or_else(|| DataError::MissingField(SK.to_string()))?;
        Ok(sk.split(self.delimiter).next().unwrap_or(sk))
    }

    /// Fold `records` into one aggregate.
    ///
    /// Soft-deleted records are dropped first. Records are mapped one at a
    /// time in input order, so list roles keep input order.
    pub async fn reconstruct(&self, records: Vec<Record>, ctx: &MapContext) -> DataResult<Record> {
        let total = records.len();
        let live = retain_live(records);
        let mapped_count = live.len();

        let mut acc = Record::new();
        let mut placed = HashSet::new();
        for record in live {
            let discriminator = str_field(&record, DISCRIMINATOR).map(str::to_string);
            let mapper = self.registry.resolve(discriminator.as_deref());

            if discriminator.as_deref() == Some(self.root.as_str()) {
                let mut merged = mapper.map(record, ctx).await?;
                // relation fields already folded win collisions
                merged.extend(acc);
                acc = merged;
                continue;
            }

            let role = self.role_of(&record)?.to_string();
            let mapped = Value::Object(mapper.map(record, ctx).await?);
            self.place(&mut acc, &mut placed, role, mapped)?;
        }

        log_event(
            Event::AggregateReconstructed,
            &[
                ("dropped", (total - mapped_count).to_string().as_str()),
                ("records", mapped_count.to_string().as_str()),
                ("request_id", ctx.request_id.to_string().as_str()),
                ("root", self.root.as_str()),
            ],
        );

        Ok(acc)
    }

    /// Fold one relation under its role. `placed` holds the roles already
    /// filled by relation records; root fields sharing a role name are
    /// overwritten without counting as a duplicate.
    fn place(
        &self,
        acc: &mut Record,
        placed: &mut HashSet<String>,
        role: String,
        mapped: Value,
    ) -> DataResult<()> {
        let seen = !placed.insert(role.clone());

        if self.is_many(&role) {
            match acc.get_mut(&role) {
                Some(Value::Array(items)) if seen => items.push(mapped),
                _ => {
                    acc.insert(role, Value::Array(vec![mapped]));
                }
            }
            return Ok(());
        }

        if seen {
            match self.policy {
                CardinalityPolicy::Strict => {
                    return Err(DataError::CardinalityMismatch { role });
                }
                CardinalityPolicy::LastWriteWins => {
                    log_event(Event::CardinalityOverwrite, &[("role", role.as_str())]);
                }
            }
        }
        acc.insert(role, mapped);
        Ok(())
    }
}

/// JSON form of an [`AggregateReconstructor`]
#[derive(Debug, Clone, Deserialize)]
pub struct AggregateSpec {
    /// Root discriminator
    pub root: String,
    #[serde(default)]
    pub cardinality: BTreeMap<String, u32>,
    /// Per-discriminator policies; unlisted discriminators pass through
    #[serde(default)]
    pub mappers: BTreeMap<String, PolicySpec>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub strict: bool,
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl From<AggregateSpec> for AggregateReconstructor {
    fn from(spec: AggregateSpec) -> Self {
        let mut reconstructor = AggregateReconstructor::new(spec.root)
            .delimiter(spec.delimiter)
            .policy(if spec.strict {
                CardinalityPolicy::Strict
            } else {
                CardinalityPolicy::LastWriteWins
            });
        for (role, count) in spec.cardinality {
            reconstructor = reconstructor.cardinality(role, count);
        }
        for (discriminator, policy) in spec.mappers {
            reconstructor = reconstructor.entity(discriminator, EntityMapper::projection(policy.into()));
        }
        reconstructor
    }
}
