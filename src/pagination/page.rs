//! Client-facing and backend-native page shapes.

use serde::Serialize;

/// Default client page size
pub const DEFAULT_LIMIT: usize = 25;

/// A bounded slice of a query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when more data may exist beyond this page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Whether the query domain is exhausted
    pub fn is_last(&self) -> bool {
        self.cursor.is_none()
    }

    /// Apply `f` to every item, keeping the cursor
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            cursor: self.cursor,
        }
    }
}

/// Client request for one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested page size; the engine default applies when absent
    pub limit: Option<usize>,
    /// Cursor returned by the previous page of the same query
    pub cursor: Option<String>,
}

impl PageRequest {
    /// First page with the given size
    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            cursor: None,
        }
    }

    /// Continue after `cursor`
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// One backend round-trip result
#[derive(Debug, Clone, PartialEq)]
pub struct NativePage<T, C> {
    pub items: Vec<T>,
    /// Backend pagination key; `None` when the backend is exhausted
    pub next: Option<C>,
}

impl<T, C> NativePage<T, C> {
    /// Page with more data behind it
    pub fn more(items: Vec<T>, next: C) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }

    /// Final page
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}
