//! Pagination State
//!
//! Ordered storage for fetched pages plus the snapshot bookkeeping around it.
//! This state is exclusively owned and mutated by the coordinator; everything
//! that leaves it is an immutable [`Snapshot`].
//!
//! Pages are keyed by their query-variable fingerprint in insertion-ordered
//! maps, so re-fetching a page with identical variables replaces its slot
//! instead of appending a duplicate.

use crate::descriptor::PaginationDirection;
use crate::engine::ResultEnvelope;
use crate::query::{PageKey, Query};
use crate::snapshot::{LastUpdatedPage, Snapshot, SnapshotResult};
use hashlink::LinkedHashMap;

pub(crate) struct PaginationState<I: Query, P: Query> {
    /// Previous pages in fetch order; output order is the reverse
    pub previous_pages: LinkedHashMap<PageKey, ResultEnvelope<P::Data>>,
    /// Result of the first query, absent until the first fetch completes
    pub initial_page: Option<ResultEnvelope<I::Data>>,
    /// Next pages in fetch order
    pub next_pages: LinkedHashMap<PageKey, ResultEnvelope<P::Data>>,
    /// Last externally-visible snapshot
    pub current: Option<SnapshotResult<I, P>>,
    /// Snapshot computed during a bulk load, published when the loop finishes
    pub queued: Option<SnapshotResult<I, P>>,
    /// Mutual exclusion for directional fetches
    pub is_fetching: bool,
    /// Whether a bulk load is driving the fetch loop
    pub is_loading_all: bool,
    /// Generation counter; bumped on every reset so stale completions can be
    /// recognized and disregarded
    pub epoch: u64,
}

impl<I: Query, P: Query> PaginationState<I, P> {
    pub fn new() -> Self {
        Self {
            previous_pages: LinkedHashMap::new(),
            initial_page: None,
            next_pages: LinkedHashMap::new(),
            current: None,
            queued: None,
            is_fetching: false,
            is_loading_all: false,
            epoch: 0,
        }
    }

    /// Clear all fetched pages and in-progress flags, moving to a new epoch.
    ///
    /// The last published snapshot survives a reset; subscribers keep their
    /// latest value until the next fetch replaces it.
    pub fn clear(&mut self) {
        self.previous_pages.clear();
        self.initial_page = None;
        self.next_pages.clear();
        self.queued = None;
        self.is_fetching = false;
        self.is_loading_all = false;
        self.epoch += 1;
    }

    /// The last successfully published snapshot, if any
    pub fn current_ok(&self) -> Option<&Snapshot<I, P>> {
        self.current.as_ref().and_then(|result| result.as_ref().ok())
    }

    /// Payload of the most recently fetched page on the given side, skipping
    /// pages that completed without data
    pub fn last_page_data(&self, direction: PaginationDirection) -> Option<&P::Data> {
        let side = match direction {
            PaginationDirection::Next => &self.next_pages,
            PaginationDirection::Previous => &self.previous_pages,
        };
        side.iter().last().and_then(|(_, envelope)| envelope.data.as_ref())
    }

    /// Store a paginated page on the given side, replacing any page with the
    /// same fingerprint
    pub fn store_page(
        &mut self,
        direction: PaginationDirection,
        key: PageKey,
        envelope: ResultEnvelope<P::Data>,
    ) {
        let side = match direction {
            PaginationDirection::Next => &mut self.next_pages,
            PaginationDirection::Previous => &mut self.previous_pages,
        };
        side.insert(key, envelope);
    }

    /// Materialize a snapshot from current storage.
    ///
    /// Pure re-read: previous pages come out reversed (earliest first), next
    /// pages in fetch order, nothing is recomputed from past entries.
    pub fn assemble(&self, last_updated: LastUpdatedPage<I, P>) -> Snapshot<I, P> {
        let mut previous_pages: Vec<ResultEnvelope<P::Data>> =
            self.previous_pages.values().cloned().collect();
        previous_pages.reverse();
        Snapshot {
            previous_pages,
            initial_page: self.initial_page.clone(),
            next_pages: self.next_pages.values().cloned().collect(),
            last_updated,
        }
    }
}
