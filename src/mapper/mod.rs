//! # Mapping
//!
//! Turns stored records into client-facing objects: [`ProjectionMapper`]
//! shapes one record through a [`FieldPolicy`], and
//! [`AggregateReconstructor`] folds a partition's records into one nested
//! aggregate, dispatching on each record's discriminator.

mod aggregate;
mod context;
mod policy;
mod projection;
mod transform;

pub use aggregate::{
    AggregateReconstructor, AggregateSpec, CardinalityPolicy, EntityMapper, EntityRegistry,
};
pub use context::MapContext;
pub use policy::{FieldPolicy, PolicySpec, DEFAULT_OMIT_FIELDS, DEFAULT_RENAME};
pub use projection::ProjectionMapper;
pub use transform::{BuiltinTransform, FieldTransform, SortKeySegment, SyncTransform};
