//! Test Support
//!
//! A scripted in-memory query engine plus small fixtures shared by unit tests
//! across modules. Scripted results are delivered synchronously when a watch
//! is fetched; tests can also push results into open watches mid-flight to
//! exercise races against reset and bulk loads.

use crate::coordinator::PagerCoordinator;
use crate::descriptor::{CursorBidirectional, PageDescriptor, PaginationDirection};
use crate::engine::{
    DataOrigin, FetchDirective, QueryEngine, ResultEnvelope, ResultSink, WatchHandle,
};
use crate::error::EngineError;
use crate::query::{PageKey, Query, Variables};
use crate::snapshot::PageSource;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Install a test logger once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Minimal query for state-level tests
#[derive(Clone)]
pub struct NoopQuery;

impl Query for NoopQuery {
    type Data = String;

    fn variables(&self) -> Variables {
        Variables::new()
    }
}

/// Fingerprint for a synthetic page tagged by name
pub fn page_key(tag: &str) -> PageKey {
    PageKey::from_variables(&Variables::new().with("tag", tag))
}

/// A cursor-paginated test query
#[derive(Clone, Debug)]
pub struct FeedQuery {
    pub vars: Variables,
}

impl FeedQuery {
    pub fn initial() -> Self {
        Self {
            vars: Variables::new(),
        }
    }

    pub fn after(cursor: &str) -> Self {
        Self {
            vars: Variables::new().with("after", cursor),
        }
    }

    pub fn before(cursor: &str) -> Self {
        Self {
            vars: Variables::new().with("before", cursor),
        }
    }
}

impl Query for FeedQuery {
    type Data = FeedPage;

    fn variables(&self) -> Variables {
        self.vars.clone()
    }
}

/// One page of test feed data
#[derive(Clone, Debug, PartialEq)]
pub struct FeedPage {
    pub items: Vec<i64>,
    pub info: CursorBidirectional,
}

impl FeedPage {
    /// A page that only continues forward
    pub fn forward(items: Vec<i64>, has_next: bool, end_cursor: Option<&str>) -> Self {
        Self {
            items,
            info: CursorBidirectional::new(has_next, end_cursor, false, None::<&str>),
        }
    }

    /// A page that only continues backward
    pub fn backward(items: Vec<i64>, has_previous: bool, start_cursor: Option<&str>) -> Self {
        Self {
            items,
            info: CursorBidirectional::new(false, None::<&str>, has_previous, start_cursor),
        }
    }

    pub fn bidirectional(items: Vec<i64>, info: CursorBidirectional) -> Self {
        Self { items, info }
    }
}

/// Network-sourced success envelope
pub fn net(page: FeedPage) -> ResultEnvelope<FeedPage> {
    ResultEnvelope::data(page, DataOrigin::Network)
}

/// Cache-sourced success envelope
pub fn cached(page: FeedPage) -> ResultEnvelope<FeedPage> {
    ResultEnvelope::data(page, DataOrigin::Cache)
}

/// Network-sourced failure envelope
pub fn failed(message: &str) -> ResultEnvelope<FeedPage> {
    ResultEnvelope::failure(vec![EngineError::new(message)], DataOrigin::Network)
}

/// A coordinator over [`FeedQuery`] with bidirectional-cursor extraction and a
/// resolver that follows `after`/`before` cursors
pub fn feed_coordinator(engine: &MockEngine) -> PagerCoordinator<FeedQuery, FeedQuery, MockEngine> {
    PagerCoordinator::new(
        engine.clone(),
        FeedQuery::initial(),
        |source: PageSource<'_, FeedQuery, FeedQuery>| {
            let data = match source {
                PageSource::Initial(data, _) | PageSource::Paginated(data, _) => data,
            };
            PageDescriptor::CursorBidirectional(data.info.clone())
        },
        |descriptor, direction| {
            let PageDescriptor::CursorBidirectional(info) = descriptor else {
                return None;
            };
            match direction {
                PaginationDirection::Next => info.end_cursor.as_deref().map(FeedQuery::after),
                PaginationDirection::Previous => {
                    info.start_cursor.as_deref().map(FeedQuery::before)
                }
            }
        },
    )
}

type Boxed = Box<dyn Any + Send>;
type Deliver = Arc<dyn Fn(Boxed) + Send + Sync>;

struct MockWatch {
    key: PageKey,
    cancelled: Arc<AtomicBool>,
    deliver: Deliver,
}

struct MockShared {
    scripts: Mutex<AHashMap<PageKey, VecDeque<Boxed>>>,
    watches: Mutex<Vec<MockWatch>>,
    fetches: AtomicUsize,
}

/// Scripted in-memory query engine
#[derive(Clone)]
pub struct MockEngine {
    shared: Arc<MockShared>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(MockShared {
                scripts: Mutex::new(AHashMap::new()),
                watches: Mutex::new(Vec::new()),
                fetches: AtomicUsize::new(0),
            }),
        }
    }

    /// Queue a result to be delivered on the next fetch of the page with the
    /// given variables
    pub fn script<D: Send + 'static>(&self, variables: &Variables, envelope: ResultEnvelope<D>) {
        let key = PageKey::from_variables(variables);
        self.shared
            .scripts
            .lock()
            .entry(key)
            .or_default()
            .push_back(Box::new(envelope));
    }

    /// Deliver a result right now to the most recent open watch on the page.
    /// Returns false when no live watch matches.
    pub fn deliver<D: Send + 'static>(
        &self,
        variables: &Variables,
        envelope: ResultEnvelope<D>,
    ) -> bool {
        self.deliver_to_watch(variables, envelope, false)
    }

    /// Deliver a result even to a cancelled watch, emulating an engine whose
    /// cancellation is best-effort
    pub fn deliver_ignoring_cancel<D: Send + 'static>(
        &self,
        variables: &Variables,
        envelope: ResultEnvelope<D>,
    ) -> bool {
        self.deliver_to_watch(variables, envelope, true)
    }

    fn deliver_to_watch<D: Send + 'static>(
        &self,
        variables: &Variables,
        envelope: ResultEnvelope<D>,
        include_cancelled: bool,
    ) -> bool {
        let key = PageKey::from_variables(variables);
        let deliver = {
            let watches = self.shared.watches.lock();
            watches
                .iter()
                .rev()
                .find(|watch| {
                    watch.key == key
                        && (include_cancelled || !watch.cancelled.load(Ordering::SeqCst))
                })
                .map(|watch| watch.deliver.clone())
        };
        match deliver {
            Some(deliver) => {
                deliver(Box::new(envelope));
                true
            }
            None => false,
        }
    }

    /// Total number of fetch/refetch triggers across all watches
    pub fn fetch_count(&self) -> usize {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    /// Number of watches that have not been cancelled
    pub fn open_watch_count(&self) -> usize {
        self.shared
            .watches
            .lock()
            .iter()
            .filter(|watch| !watch.cancelled.load(Ordering::SeqCst))
            .count()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine for MockEngine {
    type Handle = MockHandle;

    fn watch<Q: Query>(&self, query: &Q, on_result: ResultSink<Q::Data>) -> MockHandle {
        let key = PageKey::from_variables(&query.variables());
        let cancelled = Arc::new(AtomicBool::new(false));
        let deliver: Deliver = Arc::new(move |boxed: Boxed| {
            if let Ok(envelope) = boxed.downcast::<ResultEnvelope<Q::Data>>() {
                on_result(*envelope);
            }
        });
        self.shared.watches.lock().push(MockWatch {
            key: key.clone(),
            cancelled: cancelled.clone(),
            deliver: deliver.clone(),
        });
        MockHandle {
            key,
            cancelled,
            deliver,
            shared: self.shared.clone(),
        }
    }
}

/// Handle to a mock watch
pub struct MockHandle {
    key: PageKey,
    cancelled: Arc<AtomicBool>,
    deliver: Deliver,
    shared: Arc<MockShared>,
}

impl WatchHandle for MockHandle {
    fn fetch(&self, _directive: FetchDirective) {
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        let scripted = {
            let mut scripts = self.shared.scripts.lock();
            scripts
                .get_mut(&self.key)
                .map(std::mem::take)
                .unwrap_or_default()
        };
        for boxed in scripted {
            (self.deliver)(boxed);
        }
    }

    fn refetch(&self, directive: FetchDirective) {
        self.fetch(directive);
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_delivery_on_fetch() {
        let engine = MockEngine::new();
        let vars = Variables::new();
        engine.script(&vars, net(FeedPage::forward(vec![1], false, None)));

        let received: Arc<Mutex<Vec<FeedPage>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = received.clone();
        let handle = engine.watch(
            &FeedQuery::initial(),
            Arc::new(move |envelope: ResultEnvelope<FeedPage>| {
                if let Some(page) = envelope.data {
                    seen.lock().push(page);
                }
            }),
        );
        handle.fetch(FetchDirective::NetworkOnly);

        assert_eq!(received.lock().len(), 1);
        assert_eq!(engine.fetch_count(), 1);
    }

    #[test]
    fn test_cancelled_watch_drops_deliveries() {
        let engine = MockEngine::new();
        let vars = Variables::new();

        let received: Arc<Mutex<Vec<FeedPage>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = received.clone();
        let handle = engine.watch(
            &FeedQuery::initial(),
            Arc::new(move |envelope: ResultEnvelope<FeedPage>| {
                if let Some(page) = envelope.data {
                    seen.lock().push(page);
                }
            }),
        );
        handle.cancel();

        assert!(!engine.deliver(&vars, net(FeedPage::forward(vec![1], false, None))));
        assert!(received.lock().is_empty());
    }
}
