//! Pageflow - Pagination Coordination Engine
//!
//! This crate coordinates paginated fetches for clients of an incremental,
//! watch-based query engine. The engine only knows how to watch a single
//! query and stream cache/network results for it; pageflow owns everything
//! above that: tracking fetched pages, deriving the next fetchable boundary,
//! serializing fetch operations, merging results into ordered snapshots,
//! fanning snapshots out to subscribers, and draining whole connections.
//!
//! ## Flow
//!
//! ```text
//! caller ──► PagerCoordinator ──► resolver closure ──► Query
//!                 │                                       │
//!                 │ engine.watch(query)                   ▼
//!                 └──────────────────────────► QueryEngine (injected)
//!                 ▲                                       │
//!   subscribers ◄─┴── Snapshot ◄── merge ◄── ResultEnvelope
//! ```
//!
//! Pagination strategy is injected at construction as two closures: one
//! extracting a [`PageDescriptor`] from a fetched page, one resolving the
//! next [`Query`] from a boundary descriptor and direction.

pub mod config;
pub mod convenience;
pub mod coordinator;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod pager;
pub mod query;
pub mod snapshot;
pub mod subscription;

mod state;
#[cfg(test)]
pub mod test_support;

pub use config::PagerConfig;
pub use convenience::extract_with;
pub use coordinator::PagerCoordinator;
pub use descriptor::{
    CursorBidirectional, CursorForward, CursorReverse, OffsetBidirectional, OffsetForward,
    OffsetReverse, PageDescriptor, PaginationDirection,
};
pub use engine::{
    DataOrigin, FetchDirective, QueryEngine, ResultEnvelope, ResultSink, WatchHandle,
};
pub use error::{EngineError, PaginationError, Result};
pub use pager::{Pager, PagerOutput};
pub use query::{PageKey, Query, Variables};
pub use snapshot::{LastUpdatedPage, PageSource, Snapshot, SnapshotResult};
pub use subscription::Subscription;
