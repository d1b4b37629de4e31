//! # Cursor Pagination
//!
//! Opaque cursors and the sequential page-accumulation loop shared by the
//! table and object-store connectors.

mod cursor;
mod engine;
mod page;

pub use cursor::{decode_cursor, decode_optional, encode_cursor};
pub use engine::{PageSource, PaginatedQueryEngine};
pub use page::{NativePage, Page, PageRequest, DEFAULT_LIMIT};
