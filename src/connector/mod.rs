//! # Table Connector
//!
//! Data access over a key/value table with composite (`pk`, `sk`) keys:
//! sparse partial updates, exact-key reads and cursor-paginated
//! key-condition queries. The network client is injected as a
//! [`TableClient`]; [`InMemoryTable`] serves tests and local tools.

mod client;
mod memory;
mod table;

pub use client::{QueryInput, QueryOutput, TableClient, UpdateInput};
pub use memory::{InMemoryTable, DEFAULT_PAGE_SIZE};
pub use table::{Connector, GetRequest, QueryRequest, UpdateRequest};
