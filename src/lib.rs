//! aerodata - data access over a single-table key/value store
//!
//! Sparse partial updates, cursor pagination and aggregate mapping for
//! records that share a partition key and are told apart by a
//! discriminator and a delimited sort key.

pub mod cli;
pub mod config;
pub mod connector;
pub mod crypto;
pub mod error;
pub mod mapper;
pub mod object_store;
pub mod observability;
pub mod pagination;
pub mod record;
pub mod update;

pub use error::{DataError, DataResult};
