//! Pager Coordinator
//!
//! The single source of truth for pagination state and the only component
//! permitted to mutate it. The coordinator serializes fetch operations,
//! derives page boundaries, opens watches on the injected query engine,
//! merges results into state, and publishes snapshots to subscribers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      PagerCoordinator                        │
//! │  ┌───────────────┐  ┌────────────────┐  ┌────────────────┐  │
//! │  │ PaginationState│  │ WatchRegistry │  │  broadcast     │  │
//! │  │ (pages, flags) │  │ (open watches)│  │  (snapshots)   │  │
//! │  └───────────────┘  └────────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!         │ boundary + resolver                 ▲ ResultEnvelope
//!         ▼                                     │
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     QueryEngine (injected)                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! All mutation goes through one mutex whose critical sections never span an
//! await point; fetch operations suspend on a completion channel that the
//! watch callback fires on the first terminal result. Directional fetches are
//! mutually exclusive via the `is_fetching` flag. `reset` moves the state to
//! a new epoch; completions from an earlier epoch are disregarded.

use crate::config::PagerConfig;
use crate::descriptor::{PageDescriptor, PaginationDirection};
use crate::engine::{
    DataOrigin, FetchDirective, QueryEngine, ResultEnvelope, ResultSink, WatchHandle,
};
use crate::error::{
    CancelledSnafu, LoadInProgressSnafu, MissingInitialPageSnafu, NoMoreContentSnafu, NoQuerySnafu,
    PaginationError, Result,
};
use crate::query::{PageKey, Query};
use crate::snapshot::{LastUpdatedPage, PageSource, Snapshot, SnapshotResult};
use crate::state::PaginationState;
use crate::subscription::{self, Subscription};
use parking_lot::Mutex;
use snafu::ensure;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use uuid::Uuid;

/// Extraction function deriving a page descriptor from a fetched page
pub type ExtractFn<I, P> =
    Arc<dyn for<'a> Fn(PageSource<'a, I, P>) -> PageDescriptor + Send + Sync>;

/// Resolver producing the query for the page after/before a boundary
pub type ResolverFn<P> =
    Arc<dyn Fn(&PageDescriptor, PaginationDirection) -> Option<P> + Send + Sync>;

/// How a terminal result left the snapshot stream
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MergeOutcome {
    /// A success snapshot was recorded
    Published,
    /// A failure snapshot was recorded
    Failed,
}

type CompletionSlot = Arc<Mutex<Option<oneshot::Sender<MergeOutcome>>>>;

/// An open watch tracked by the coordinator
struct TrackedWatch<H> {
    id: Uuid,
    epoch: u64,
    directive: FetchDirective,
    handle: Arc<H>,
    completion: CompletionSlot,
}

struct WatchRegistry<H> {
    initial: Option<TrackedWatch<H>>,
    paginated: Vec<TrackedWatch<H>>,
}

impl<H> WatchRegistry<H> {
    fn new() -> Self {
        Self {
            initial: None,
            paginated: Vec::new(),
        }
    }
}

/// Everything behind the coordinator's single mutex
struct Guarded<I: Query, P: Query, H> {
    state: PaginationState<I, P>,
    watches: WatchRegistry<H>,
}

struct CoordinatorInner<I: Query, P: Query, E: QueryEngine> {
    engine: E,
    initial_query: I,
    extract: ExtractFn<I, P>,
    resolver: ResolverFn<P>,
    config: PagerConfig,
    guarded: Mutex<Guarded<I, P, E::Handle>>,
    broadcast: watch::Sender<Option<SnapshotResult<I, P>>>,
}

/// Pagination coordinator over an injected query engine.
///
/// Cheap to clone; clones share the same state and watch registry.
pub struct PagerCoordinator<I: Query, P: Query, E: QueryEngine> {
    inner: Arc<CoordinatorInner<I, P, E>>,
}

impl<I: Query, P: Query, E: QueryEngine> Clone for PagerCoordinator<I, P, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Clears the directional-fetch flag when a fetch operation ends, however it
/// ends. Skips the clear when the state has moved to a new epoch, so a fetch
/// started after a reset keeps its own exclusivity.
struct FetchGuard<I: Query, P: Query, E: QueryEngine> {
    inner: Arc<CoordinatorInner<I, P, E>>,
    epoch: u64,
}

impl<I: Query, P: Query, E: QueryEngine> Drop for FetchGuard<I, P, E> {
    fn drop(&mut self) {
        let mut guarded = self.inner.guarded.lock();
        if guarded.state.epoch == self.epoch {
            guarded.state.is_fetching = false;
        }
    }
}

impl<I: Query, P: Query, E: QueryEngine> PagerCoordinator<I, P, E> {
    /// Create a coordinator with default configuration
    pub fn new(
        engine: E,
        initial_query: I,
        extract: impl for<'a> Fn(PageSource<'a, I, P>) -> PageDescriptor + Send + Sync + 'static,
        resolver: impl Fn(&PageDescriptor, PaginationDirection) -> Option<P> + Send + Sync + 'static,
    ) -> Self {
        Self::with_config(engine, initial_query, PagerConfig::default(), extract, resolver)
    }

    /// Create a coordinator with explicit configuration
    pub fn with_config(
        engine: E,
        initial_query: I,
        config: PagerConfig,
        extract: impl for<'a> Fn(PageSource<'a, I, P>) -> PageDescriptor + Send + Sync + 'static,
        resolver: impl Fn(&PageDescriptor, PaginationDirection) -> Option<P> + Send + Sync + 'static,
    ) -> Self {
        let (broadcast, _) = watch::channel(None);
        Self {
            inner: Arc::new(CoordinatorInner {
                engine,
                initial_query,
                extract: Arc::new(extract),
                resolver: Arc::new(resolver),
                config,
                guarded: Mutex::new(Guarded {
                    state: PaginationState::new(),
                    watches: WatchRegistry::new(),
                }),
                broadcast,
            }),
        }
    }

    // ==================== Public API ====================

    /// Reset pagination state and fetch the first page with the configured
    /// default directive
    pub async fn fetch(&self) -> Result<()> {
        self.reset();
        let directive = self.inner.config.initial_fetch_directive;
        self.initial_fetch(directive).await.map(|_| ())
    }

    /// Reset pagination state and fetch the first page with the given
    /// directive.
    ///
    /// Refetching before any fetch behaves like a fresh fetch.
    pub async fn refetch(&self, directive: FetchDirective) -> Result<()> {
        self.reset();
        self.initial_fetch(directive).await.map(|_| ())
    }

    /// (Re)issue the first query without touching already-fetched pages.
    ///
    /// Reuses the existing initial watch when one is open.
    pub async fn fetch_initial(&self, directive: FetchDirective) -> Result<()> {
        self.initial_fetch(directive).await.map(|_| ())
    }

    /// Load the page after the current forward boundary.
    ///
    /// Returns `Ok` once the fetch completes, even when the delivered snapshot
    /// is a failure; engine failures are surfaced through the snapshot stream
    /// only. Precondition errors are returned directly.
    pub async fn load_next(&self, directive: FetchDirective) -> Result<()> {
        self.paginated_fetch(PaginationDirection::Next, directive)
            .await
            .map(|_| ())
    }

    /// Load the page before the current backward boundary.
    ///
    /// Same result convention as [`load_next`](Self::load_next).
    pub async fn load_previous(&self, directive: FetchDirective) -> Result<()> {
        self.paginated_fetch(PaginationDirection::Previous, directive)
            .await
            .map(|_| ())
    }

    /// Drain the connection to exhaustion in both directions.
    ///
    /// With `fetch_from_initial_page` set, pagination state is reset and the
    /// drain starts from a fresh initial fetch; otherwise an initial page must
    /// already be present. Jobs run one at a time, checking the forward
    /// direction before the backward one after every completion. Individual
    /// completions do not publish while the drain runs; subscribers see a
    /// single snapshot once it finishes or fails.
    pub async fn load_all(&self, fetch_from_initial_page: bool) -> Result<()> {
        let (handles, senders) = {
            let mut guarded = self.inner.guarded.lock();
            ensure!(!guarded.state.is_loading_all, LoadInProgressSnafu);
            if fetch_from_initial_page {
                let teardown = Self::collect_teardown(&mut guarded);
                guarded.state.is_loading_all = true;
                teardown
            } else {
                if guarded.state.initial_page.is_none() {
                    return MissingInitialPageSnafu.fail();
                }
                guarded.state.is_loading_all = true;
                (Vec::new(), Vec::new())
            }
        };
        drop(senders);
        for handle in &handles {
            handle.cancel();
        }
        tracing::info!(
            "Draining all pages (from_initial: {})",
            fetch_from_initial_page
        );

        let mut jobs: JoinSet<Result<MergeOutcome>> = JoinSet::new();
        if fetch_from_initial_page {
            let this = self.clone();
            let directive = self.inner.config.load_all_directive;
            jobs.spawn(async move { this.initial_fetch(directive).await });
        } else {
            self.spawn_drain_job(&mut jobs);
        }

        while let Some(joined) = jobs.join_next().await {
            let completed = match joined {
                Ok(result) => result,
                Err(join_error) if join_error.is_panic() => {
                    self.abandon_load_all(&mut jobs);
                    std::panic::resume_unwind(join_error.into_panic());
                }
                Err(_) => {
                    self.abandon_load_all(&mut jobs);
                    return CancelledSnafu.fail();
                }
            };
            if let Err(error) = completed {
                self.abandon_load_all(&mut jobs);
                return Err(error);
            }
            if !self.is_loading_all() {
                break;
            }
            self.spawn_drain_job(&mut jobs);
        }

        self.finish_load_all();
        Ok(())
    }

    /// Cancel all in-flight fetches and clear pagination state.
    ///
    /// The last published snapshot survives; subscribers are untouched. Any
    /// fetch completion that races with the reset is disregarded.
    pub fn reset(&self) {
        let (handles, senders) = {
            let mut guarded = self.inner.guarded.lock();
            Self::collect_teardown(&mut guarded)
        };
        drop(senders);
        for handle in &handles {
            handle.cancel();
        }
        tracing::info!("Pagination state reset");
    }

    /// Alias for [`reset`](Self::reset)
    pub fn cancel(&self) {
        self.reset();
    }

    /// Whether a page exists after the current forward boundary. Never blocks.
    pub fn can_load_next(&self) -> bool {
        let guarded = self.inner.guarded.lock();
        self.inner
            .boundary(&guarded.state, PaginationDirection::Next)
            .map(|descriptor| descriptor.can_load_next())
            .unwrap_or(false)
    }

    /// Whether a page exists before the current backward boundary. Never
    /// blocks.
    pub fn can_load_previous(&self) -> bool {
        let guarded = self.inner.guarded.lock();
        self.inner
            .boundary(&guarded.state, PaginationDirection::Previous)
            .map(|descriptor| descriptor.can_load_previous())
            .unwrap_or(false)
    }

    /// Whether a bulk load is currently driving the fetch loop
    pub fn is_loading_all(&self) -> bool {
        self.inner.guarded.lock().state.is_loading_all
    }

    /// The last published snapshot, if any
    pub fn current_snapshot(&self) -> Option<SnapshotResult<I, P>> {
        self.inner.guarded.lock().state.current.clone()
    }

    /// Register an observer for the latest snapshot and all subsequent ones.
    ///
    /// Subscribing never triggers a fetch; dropping the returned subscription
    /// never cancels one. The forwarder is a tokio task, so this must be
    /// called from within a runtime.
    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: Fn(SnapshotResult<I, P>) + Send + 'static,
    {
        subscription::forward(self.inner.broadcast.subscribe(), on_update)
    }

    /// Stream-style access to published snapshots
    pub fn snapshots(&self) -> watch::Receiver<Option<SnapshotResult<I, P>>> {
        self.inner.broadcast.subscribe()
    }

    // ==================== Fetch internals ====================

    async fn initial_fetch(&self, directive: FetchDirective) -> Result<MergeOutcome> {
        let (done_tx, done_rx) = oneshot::channel();
        let mut pending = Some(done_tx);

        let reused = {
            let mut guarded = self.inner.guarded.lock();
            match guarded.watches.initial.as_mut() {
                Some(watch) => {
                    watch.directive = directive;
                    *watch.completion.lock() = pending.take();
                    Some(watch.handle.clone())
                }
                None => None,
            }
        };

        if let Some(handle) = reused {
            tracing::debug!("Re-triggering the existing initial watch");
            handle.refetch(directive);
        } else {
            let op = Uuid::new_v4();
            let epoch = self.inner.guarded.lock().state.epoch;
            let sink = self.initial_sink(op);
            let handle = Arc::new(self.inner.engine.watch(&self.inner.initial_query, sink));
            {
                let mut guarded = self.inner.guarded.lock();
                if guarded.state.epoch != epoch {
                    drop(guarded);
                    handle.cancel();
                    return CancelledSnafu.fail();
                }
                guarded.watches.initial = Some(TrackedWatch {
                    id: op,
                    epoch,
                    directive,
                    handle: handle.clone(),
                    completion: Arc::new(Mutex::new(pending.take())),
                });
            }
            tracing::debug!("Fetching the initial page (op: {})", op);
            handle.fetch(directive);
        }

        done_rx.await.map_err(|_| PaginationError::Cancelled)
    }

    async fn paginated_fetch(
        &self,
        direction: PaginationDirection,
        directive: FetchDirective,
    ) -> Result<MergeOutcome> {
        let op = Uuid::new_v4();
        let (epoch, boundary) = {
            let mut guarded = self.inner.guarded.lock();
            ensure!(!guarded.state.is_fetching, LoadInProgressSnafu);
            let Some(boundary) = self.inner.boundary(&guarded.state, direction) else {
                return MissingInitialPageSnafu.fail();
            };
            ensure!(boundary.can_load(direction), NoMoreContentSnafu);
            guarded.state.is_fetching = true;
            (guarded.state.epoch, boundary)
        };
        let _fetch_guard = FetchGuard {
            inner: self.inner.clone(),
            epoch,
        };

        let Some(query) = (self.inner.resolver)(&boundary, direction) else {
            return NoQuerySnafu.fail();
        };
        let key = PageKey::from_variables(&query.variables());
        tracing::debug!("Loading {:?} page {} (op: {})", direction, key, op);

        let (done_tx, done_rx) = oneshot::channel();
        let sink = self.page_sink(op, direction, key);
        let handle = Arc::new(self.inner.engine.watch(&query, sink));
        {
            let mut guarded = self.inner.guarded.lock();
            if guarded.state.epoch != epoch {
                drop(guarded);
                handle.cancel();
                return CancelledSnafu.fail();
            }
            guarded.watches.paginated.push(TrackedWatch {
                id: op,
                epoch,
                directive,
                handle: handle.clone(),
                completion: Arc::new(Mutex::new(Some(done_tx))),
            });
        }
        handle.fetch(directive);

        done_rx.await.map_err(|_| PaginationError::Cancelled)
    }

    fn initial_sink(&self, op: Uuid) -> ResultSink<I::Data> {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |envelope| {
            if let Some(inner) = weak.upgrade() {
                inner.on_initial_result(op, envelope);
            }
        })
    }

    fn page_sink(&self, op: Uuid, direction: PaginationDirection, key: PageKey) -> ResultSink<P::Data> {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |envelope| {
            if let Some(inner) = weak.upgrade() {
                inner.on_page_result(op, direction, key.clone(), envelope);
            }
        })
    }

    // ==================== Bulk-load internals ====================

    /// Submit at most one drain job: a next-page fetch when the forward
    /// boundary is loadable, else a previous-page fetch when the backward one
    /// is. The forward check deliberately runs first; bidirectional
    /// connections drain forward before backward.
    fn spawn_drain_job(&self, jobs: &mut JoinSet<Result<MergeOutcome>>) {
        let directive = self.inner.config.load_all_directive;
        if self.can_load_next() {
            let this = self.clone();
            jobs.spawn(
                async move { this.paginated_fetch(PaginationDirection::Next, directive).await },
            );
        } else if self.can_load_previous() {
            let this = self.clone();
            jobs.spawn(async move {
                this.paginated_fetch(PaginationDirection::Previous, directive)
                    .await
            });
        }
    }

    fn abandon_load_all(&self, jobs: &mut JoinSet<Result<MergeOutcome>>) {
        jobs.abort_all();
        let mut guarded = self.inner.guarded.lock();
        guarded.state.is_loading_all = false;
        guarded.state.queued = None;
    }

    fn finish_load_all(&self) {
        let mut guarded = self.inner.guarded.lock();
        guarded.state.is_loading_all = false;
        if let Some(value) = guarded.state.queued.take() {
            guarded.state.current = Some(value.clone());
            self.inner.broadcast.send_replace(Some(value));
        }
        tracing::info!("Bulk load finished");
    }

    /// Drain every tracked watch and clear state, returning the handles to
    /// cancel and the completion senders to drop once the lock is released.
    /// Dropping a sender wakes its awaiting fetch with `Cancelled`.
    fn collect_teardown(
        guarded: &mut Guarded<I, P, E::Handle>,
    ) -> (Vec<Arc<E::Handle>>, Vec<oneshot::Sender<MergeOutcome>>) {
        let mut handles = Vec::new();
        let mut senders = Vec::new();
        if let Some(watch) = guarded.watches.initial.take() {
            if let Some(sender) = watch.completion.lock().take() {
                senders.push(sender);
            }
            handles.push(watch.handle);
        }
        for watch in guarded.watches.paginated.drain(..) {
            if let Some(sender) = watch.completion.lock().take() {
                senders.push(sender);
            }
            handles.push(watch.handle);
        }
        guarded.state.clear();
        (handles, senders)
    }
}

impl<I: Query, P: Query, E: QueryEngine> CoordinatorInner<I, P, E> {
    /// Derive the boundary descriptor for a direction: the most recently
    /// fetched page on that side when one exists, otherwise the initial page.
    fn boundary(
        &self,
        state: &PaginationState<I, P>,
        direction: PaginationDirection,
    ) -> Option<PageDescriptor> {
        let current = state.current_ok();
        if let Some(data) = state.last_page_data(direction) {
            return Some((self.extract)(PageSource::Paginated(data, current)));
        }
        state
            .initial_page
            .as_ref()
            .and_then(|envelope| envelope.data.as_ref())
            .map(|data| (self.extract)(PageSource::Initial(data, current)))
    }

    fn on_initial_result(&self, op: Uuid, envelope: ResultEnvelope<I::Data>) {
        let mut guarded = self.guarded.lock();
        let (directive, completion) = match guarded.watches.initial.as_ref() {
            Some(watch) if watch.id == op && watch.epoch == guarded.state.epoch => {
                (watch.directive, watch.completion.clone())
            }
            Some(watch) if watch.id == op => {
                tracing::warn!("Disregarding initial result from epoch {}", watch.epoch);
                return;
            }
            _ => {
                tracing::debug!("Disregarding result for a superseded initial watch");
                return;
            }
        };
        let should_update = terminal_for(directive, envelope.origin);

        if envelope.data.is_none() {
            let error = PaginationError::from_engine_errors(&envelope.errors);
            self.record_failure(&mut guarded, error);
            complete(&completion, MergeOutcome::Failed);
            return;
        }

        guarded.state.initial_page = Some(envelope.clone());
        if !should_update {
            tracing::debug!("Holding provisional cache result for the initial page");
            return;
        }
        let snapshot = guarded.state.assemble(LastUpdatedPage::Initial(envelope));
        self.record_success(&mut guarded, snapshot);
        complete(&completion, MergeOutcome::Published);
    }

    fn on_page_result(
        &self,
        op: Uuid,
        direction: PaginationDirection,
        key: PageKey,
        envelope: ResultEnvelope<P::Data>,
    ) {
        let mut guarded = self.guarded.lock();
        let tracked = guarded.watches.paginated.iter().find(|watch| watch.id == op);
        let (directive, completion) = match tracked {
            Some(watch) if watch.epoch == guarded.state.epoch => {
                (watch.directive, watch.completion.clone())
            }
            Some(watch) => {
                tracing::warn!("Disregarding page result from epoch {}", watch.epoch);
                return;
            }
            None => {
                tracing::debug!("Disregarding result for a cancelled page watch");
                return;
            }
        };
        let should_update = terminal_for(directive, envelope.origin);

        if envelope.data.is_none() {
            let error = PaginationError::from_engine_errors(&envelope.errors);
            self.record_failure(&mut guarded, error);
            complete(&completion, MergeOutcome::Failed);
            return;
        }

        guarded.state.store_page(direction, key, envelope.clone());
        if !should_update {
            tracing::debug!("Holding provisional cache result for a {:?} page", direction);
            return;
        }
        let snapshot = guarded
            .state
            .assemble(LastUpdatedPage::Paginated(envelope));
        self.record_success(&mut guarded, snapshot);
        complete(&completion, MergeOutcome::Published);
    }

    /// Record a failure snapshot. During a bulk load the failure is queued
    /// and the drain loop is stopped; otherwise it is published immediately.
    fn record_failure(&self, guarded: &mut Guarded<I, P, E::Handle>, error: PaginationError) {
        if guarded.state.is_loading_all {
            guarded.state.queued = Some(Err(error));
            guarded.state.is_loading_all = false;
        } else {
            guarded.state.current = Some(Err(error.clone()));
            self.broadcast.send_replace(Some(Err(error)));
        }
    }

    /// Record a success snapshot, queueing instead of publishing while a bulk
    /// load is in progress.
    fn record_success(&self, guarded: &mut Guarded<I, P, E::Handle>, snapshot: Snapshot<I, P>) {
        if guarded.state.is_loading_all {
            guarded.state.queued = Some(Ok(snapshot));
        } else {
            guarded.state.current = Some(Ok(snapshot.clone()));
            self.broadcast.send_replace(Some(Ok(snapshot)));
        }
    }
}

impl<I: Query, P: Query, E: QueryEngine> Drop for CoordinatorInner<I, P, E> {
    fn drop(&mut self) {
        let guarded = self.guarded.get_mut();
        if let Some(watch) = guarded.watches.initial.take() {
            watch.handle.cancel();
        }
        for watch in guarded.watches.paginated.drain(..) {
            watch.handle.cancel();
        }
    }
}

impl<I: Query, P: Query, E: QueryEngine> std::fmt::Debug for PagerCoordinator<I, P, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guarded = self.inner.guarded.lock();
        f.debug_struct("PagerCoordinator")
            .field("previous_pages", &guarded.state.previous_pages.len())
            .field("has_initial_page", &guarded.state.initial_page.is_some())
            .field("next_pages", &guarded.state.next_pages.len())
            .field("is_fetching", &guarded.state.is_fetching)
            .field("is_loading_all", &guarded.state.is_loading_all)
            .field("epoch", &guarded.state.epoch)
            .finish()
    }
}

/// The shouldUpdate rule: a result is provisional exactly when the directive
/// asked for cache-then-network and the result came from cache; every other
/// combination is terminal for the operation.
fn terminal_for(directive: FetchDirective, origin: DataOrigin) -> bool {
    !(directive == FetchDirective::CacheAndNetwork && origin == DataOrigin::Cache)
}

fn complete(completion: &CompletionSlot, outcome: MergeOutcome) {
    if let Some(sender) = completion.lock().take() {
        let _ = sender.send(outcome);
    }
}
