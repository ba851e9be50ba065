//! Query Engine Boundary
//!
//! The coordinator is a client of an injected query engine: a component that
//! can open a *watch* on a single query and deliver a stream of results for
//! it, first from a local cache and then from the live source depending on the
//! fetch directive. Transport, caching, and query execution all live behind
//! this boundary.
//!
//! ## Contract
//!
//! ```text
//! Coordinator                        Query engine
//!     │  watch(query, sink) ────────────►│  (no fetch yet)
//!     │◄──────────────────── WatchHandle │
//!     │  handle.fetch(directive) ───────►│
//!     │◄─ sink(ResultEnvelope: cache) ───│   (directive permitting)
//!     │◄─ sink(ResultEnvelope: network) ─│
//!     │  handle.cancel() ───────────────►│  (no further sink calls)
//! ```
//!
//! `cancel` must stop result delivery and must not invoke the sink itself.

use crate::error::EngineError;
use crate::query::Query;
use std::sync::Arc;

/// Policy describing how cache and network results are combined for one fetch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchDirective {
    /// Serve from cache when possible, hit the network on a miss
    CacheFirst,
    /// Serve the cached result immediately, then follow with the network
    /// result. The cached delivery is provisional: it is stored but not
    /// published, and the operation completes on the network result.
    CacheAndNetwork,
    /// Skip the cache entirely
    NetworkOnly,
    /// Never hit the network
    CacheOnly,
}

/// Where a result came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataOrigin {
    Cache,
    Network,
}

/// One result delivered by a watch.
///
/// `data: None` marks a failed fetch; `errors` may also accompany partial
/// data, in which case they are carried through to the snapshot unchanged.
#[derive(Clone, Debug)]
pub struct ResultEnvelope<D> {
    pub data: Option<D>,
    pub errors: Vec<EngineError>,
    pub origin: DataOrigin,
}

impl<D> ResultEnvelope<D> {
    /// A successful result
    pub fn data(data: D, origin: DataOrigin) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            origin,
        }
    }

    /// A failed result carrying the engine's errors
    pub fn failure(errors: Vec<EngineError>, origin: DataOrigin) -> Self {
        Self {
            data: None,
            errors,
            origin,
        }
    }
}

/// Shareable callback a watch delivers its results through
pub type ResultSink<D> = Arc<dyn Fn(ResultEnvelope<D>) + Send + Sync>;

/// A live subscription to a single query's result stream
pub trait WatchHandle: Send + Sync + 'static {
    /// Trigger the watched query with the given directive
    fn fetch(&self, directive: FetchDirective);

    /// Re-trigger the watched query without recreating the watch
    fn refetch(&self, directive: FetchDirective);

    /// Stop result delivery. Idempotent.
    fn cancel(&self);
}

/// The injected query engine
pub trait QueryEngine: Send + Sync + 'static {
    type Handle: WatchHandle;

    /// Open a watch on `query`. The watch is inert until its handle's
    /// `fetch` is called.
    fn watch<Q: Query>(&self, query: &Q, on_result: ResultSink<Q::Data>) -> Self::Handle;
}
