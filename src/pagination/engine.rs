//! Paginated query engine
//!
//! Drives an injected page source one round-trip at a time and turns the
//! backend's native page stream into client pages with an exact, opaque
//! continuation cursor.
//!
//! Round-trips within one call are strictly sequential: each fetch starts
//! from the pagination key returned by the previous one. A failed fetch
//! aborts the call and discards everything buffered so far.

use futures_util::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DataResult;
use crate::observability::{log_event, Event};

use super::cursor::{decode_optional, encode_cursor};
use super::page::{NativePage, Page, PageRequest, DEFAULT_LIMIT};

/// Backend page-fetch capability
pub trait PageSource: Send + Sync {
    /// Item type delivered by the backend
    type Item: Send;

    /// Backend-native pagination key
    type Cursor: Serialize + DeserializeOwned + Send + Sync;

    /// Fetch one backend page starting after `start`. `limit` is the
    /// client page size for bounded queries and `None` when draining.
    fn fetch_page(
        &self,
        start: Option<Self::Cursor>,
        limit: Option<usize>,
    ) -> BoxFuture<'_, DataResult<NativePage<Self::Item, Self::Cursor>>>;
}

/// Cursor-based pagination over a [`PageSource`]
pub struct PaginatedQueryEngine<S> {
    source: S,
    default_limit: usize,
}

impl<S: PageSource> PaginatedQueryEngine<S> {
    /// Create an engine with the default page size
    pub fn new(source: S) -> Self {
        Self {
            source,
            default_limit: DEFAULT_LIMIT,
        }
    }

    /// Page size used when a request carries no limit
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Access the underlying source
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch one client page.
    ///
    /// The limit is checked after each backend page, so a page can hold up
    /// to one backend page more than requested; items are never dropped.
    /// The returned cursor is present only when the buffer reached the limit
    /// while the backend still had more data. A zero limit counts as absent.
    pub async fn page(&self, request: PageRequest) -> DataResult<Page<S::Item>> {
        let limit = request
            .limit
            .filter(|&n| n > 0)
            .unwrap_or(self.default_limit);
        let mut working: Option<S::Cursor> = decode_optional(request.cursor.as_deref())?;
        let mut items = Vec::new();
        let mut fetches = 0usize;

        let remaining = loop {
            let page = self.fetch(working.take(), Some(limit), &mut fetches).await?;
            items.extend(page.items);

            match page.next {
                Some(next) if items.len() < limit => working = Some(next),
                next => break next,
            }
        };

        let cursor = remaining.as_ref().map(encode_cursor).transpose()?;

        log_event(
            Event::QueryComplete,
            &[
                ("fetches", fetches.to_string().as_str()),
                ("items", items.len().to_string().as_str()),
                ("limit", limit.to_string().as_str()),
                ("more", cursor.is_some().to_string().as_str()),
            ],
        );

        Ok(Page { items, cursor })
    }

    /// Fetch the entire result set, ignoring any page size
    pub async fn drain(&self) -> DataResult<Vec<S::Item>> {
        let mut working: Option<S::Cursor> = None;
        let mut items = Vec::new();
        let mut fetches = 0usize;

        loop {
            let page = self.fetch(working.take(), None, &mut fetches).await?;
            items.extend(page.items);

            match page.next {
                Some(next) => working = Some(next),
                None => break,
            }
        }

        log_event(
            Event::QueryComplete,
            &[
                ("fetches", fetches.to_string().as_str()),
                ("items", items.len().to_string().as_str()),
            ],
        );

        Ok(items)
    }

    async fn fetch(
        &self,
        start: Option<S::Cursor>,
        limit: Option<usize>,
        fetches: &mut usize,
    ) -> DataResult<NativePage<S::Item, S::Cursor>> {
        *fetches += 1;
        match self.source.fetch_page(start, limit).await {
            Ok(page) => {
                log_event(
                    Event::QueryPageFetched,
                    &[
                        ("fetch", fetches.to_string().as_str()),
                        ("items", page.items.len().to_string().as_str()),
                        ("more", page.next.is_some().to_string().as_str()),
                    ],
                );
                Ok(page)
            }
            Err(e) => {
                log_event(
                    Event::QueryFailed,
                    &[("error", e.to_string().as_str()), ("fetch", fetches.to_string().as_str())],
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::record::Record;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted backend responses and records the start keys it saw
    struct Scripted {
        pages: Mutex<VecDeque<DataResult<NativePage<u32, Record>>>>,
        starts: Mutex<Vec<Option<Record>>>,
        limits: Mutex<Vec<Option<usize>>>,
    }

    impl Scripted {
        fn new(pages: Vec<DataResult<NativePage<u32, Record>>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                starts: Mutex::new(Vec::new()),
                limits: Mutex::new(Vec::new()),
            }
        }

        fn starts(&self) -> Vec<Option<Record>> {
            self.starts.lock().unwrap().clone()
        }
    }

    impl PageSource for Scripted {
        type Item = u32;
        type Cursor = Record;

        fn fetch_page(
            &self,
            start: Option<Record>,
            limit: Option<usize>,
        ) -> BoxFuture<'_, DataResult<NativePage<u32, Record>>> {
            self.starts.lock().unwrap().push(start);
            self.limits.lock().unwrap().push(limit);
            let next = self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch");
            Box::pin(async move { next })
        }
    }

    fn key(sk: &str) -> Record {
        json!({"pk": "1", "sk": sk}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_single_page_with_more_data() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::more(
            vec![1],
            key("thing"),
        ))]));

        let page = engine.page(PageRequest::first(1)).await.unwrap();

        assert_eq!(page.items, vec![1]);
        assert_eq!(page.cursor.as_deref(), Some("eyJwayI6IjEiLCJzayI6InRoaW5nIn0="));
        assert_eq!(*engine.source().limits.lock().unwrap(), vec![Some(1)]);
    }

    #[tokio::test]
    async fn test_below_limit_keeps_fetching() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1], key("a"))),
            Ok(NativePage::more(vec![2], key("b"))),
        ]));

        let page = engine.page(PageRequest::first(2)).await.unwrap();

        assert_eq!(page.items, vec![1, 2]);
        let resumed: Record = crate::pagination::decode_cursor(page.cursor.as_deref().unwrap()).unwrap();
        assert_eq!(resumed, key("b"));
        assert_eq!(engine.source().starts(), vec![None, Some(key("a"))]);
    }

    #[tokio::test]
    async fn test_limit_reached_at_exhaustion_has_no_cursor() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1], key("a"))),
            Ok(NativePage::last(vec![2])),
        ]));

        let page = engine.page(PageRequest::first(2)).await.unwrap();

        assert_eq!(page.items, vec![1, 2]);
        assert!(page.is_last());
    }

    #[tokio::test]
    async fn test_backend_exhausted_below_limit() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::last(vec![
            1, 2, 3,
        ]))]));

        let page = engine.page(PageRequest::first(10)).await.unwrap();

        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.cursor, None);
    }

    #[tokio::test]
    async fn test_over_fetch_keeps_whole_backend_page() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1, 2], key("a"))),
            Ok(NativePage::more(vec![3, 4, 5], key("b"))),
        ]));

        let page = engine.page(PageRequest::first(3)).await.unwrap();

        assert_eq!(page.items, vec![1, 2, 3, 4, 5]);
        assert!(page.cursor.is_some());
    }

    #[tokio::test]
    async fn test_resumes_from_client_cursor() {
        let cursor = encode_cursor(&key("thing")).unwrap();
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::last(vec![7]))]));

        let page = engine
            .page(PageRequest::first(5).after(cursor))
            .await
            .unwrap();

        assert_eq!(page.items, vec![7]);
        assert_eq!(engine.source().starts(), vec![Some(key("thing"))]);
    }

    #[tokio::test]
    async fn test_default_limit_applies() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::last(vec![]))]))
            .with_default_limit(7);

        engine.page(PageRequest::default()).await.unwrap();

        assert_eq!(*engine.source().limits.lock().unwrap(), vec![Some(7)]);
    }

    #[tokio::test]
    async fn test_zero_limit_falls_back_to_default() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::last(vec![1]))]))
            .with_default_limit(7);

        let page = engine.page(PageRequest::first(0)).await.unwrap();

        assert_eq!(page.items, vec![1]);
        assert_eq!(*engine.source().limits.lock().unwrap(), vec![Some(7)]);
    }

    #[tokio::test]
    async fn test_cursor_round_trips_through_engine() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![Ok(NativePage::more(
            vec![1],
            json!({"sk": "x|1", "pk": "p", "discriminator": "x"})
                .as_object()
                .cloned()
                .unwrap(),
        ))]));

        let cursor = engine.page(PageRequest::first(1)).await.unwrap().cursor.unwrap();
        let native: Value = crate::pagination::decode_cursor(&cursor).unwrap();
        assert_eq!(encode_cursor(&native).unwrap(), cursor);
    }

    #[tokio::test]
    async fn test_invalid_cursor_fails_before_fetching() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![]));

        let err = engine
            .page(PageRequest::first(1).after("!!"))
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::CursorDecode(_)));
        assert!(engine.source().starts().is_empty());
    }

    #[tokio::test]
    async fn test_failure_discards_partial_page() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1], key("a"))),
            Err(DataError::backend("throttled")),
        ]));

        let err = engine.page(PageRequest::first(5)).await.unwrap_err();

        assert!(matches!(err, DataError::Backend(_)));
    }

    #[tokio::test]
    async fn test_drain_ignores_limit() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1, 2], key("a"))),
            Ok(NativePage::more(vec![3], key("b"))),
            Ok(NativePage::last(vec![4])),
        ]))
        .with_default_limit(1);

        let items = engine.drain().await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(
            engine.source().starts(),
            vec![None, Some(key("a")), Some(key("b"))]
        );
        assert_eq!(*engine.source().limits.lock().unwrap(), vec![None, None, None]);
    }

    #[tokio::test]
    async fn test_drain_propagates_failure() {
        let engine = PaginatedQueryEngine::new(Scripted::new(vec![
            Ok(NativePage::more(vec![1], key("a"))),
            Err(DataError::backend("connection reset")),
        ]));

        assert!(engine.drain().await.is_err());
    }
}
