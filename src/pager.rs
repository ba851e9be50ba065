//! Transforming Pager
//!
//! Wraps a typed coordinator with an output-transform closure, so observers
//! receive application view-models instead of raw page envelopes. This is a
//! mapping layer only: all pagination behavior stays in the coordinator, and
//! one pager never duplicates another's fetches.

use crate::coordinator::PagerCoordinator;
use crate::engine::{DataOrigin, FetchDirective, QueryEngine};
use crate::error::{PaginationError, Result};
use crate::query::Query;
use crate::snapshot::{Snapshot, SnapshotResult};
use crate::subscription::{self, Subscription};
use std::sync::Arc;
use tokio::sync::watch;

/// What pager observers receive: the transformed model plus the origin of the
/// result that produced it, or the failure that replaced the snapshot
pub type PagerOutput<M> = Result<(M, DataOrigin), PaginationError>;

/// A coordinator plus an output transform.
///
/// The transform receives the payloads of `(previous pages, initial page,
/// next pages)` in display order and produces the externally-visible model.
/// Pages that completed without data are skipped; a snapshot without a usable
/// initial page produces no output.
pub struct Pager<I: Query, P: Query, E: QueryEngine, M> {
    coordinator: PagerCoordinator<I, P, E>,
    output: Arc<watch::Sender<Option<PagerOutput<M>>>>,
    _forwarder: Subscription,
}

impl<I, P, E, M> Pager<I, P, E, M>
where
    I: Query,
    P: Query,
    E: QueryEngine,
    M: Clone + Send + Sync + 'static,
{
    /// Wrap a coordinator with a whole-output transform
    pub fn new(
        coordinator: PagerCoordinator<I, P, E>,
        transform: impl Fn(&[P::Data], &I::Data, &[P::Data]) -> Result<M> + Send + Sync + 'static,
    ) -> Self {
        let (sender, _) = watch::channel(None);
        let output = Arc::new(sender);
        let forwarder = {
            let output = output.clone();
            coordinator.subscribe(move |result: SnapshotResult<I, P>| {
                let mapped = match result {
                    Ok(snapshot) => apply(&transform, &snapshot),
                    Err(error) => Some(Err(error)),
                };
                if let Some(value) = mapped {
                    output.send_replace(Some(value));
                }
            })
        };
        Self {
            coordinator,
            output,
            _forwarder: forwarder,
        }
    }

    /// Wrap a coordinator with per-page transforms, concatenating their
    /// results in display order: previous pages, then the initial page, then
    /// next pages
    pub fn with_page_transforms<T>(
        coordinator: PagerCoordinator<I, P, E>,
        initial_transform: impl Fn(&I::Data) -> Result<M> + Send + Sync + 'static,
        page_transform: impl Fn(&P::Data) -> Result<M> + Send + Sync + 'static,
    ) -> Self
    where
        M: Default + Extend<T> + IntoIterator<Item = T>,
    {
        Self::new(coordinator, move |previous, initial, next| {
            let mut merged = M::default();
            for page in previous {
                merged.extend(page_transform(page)?);
            }
            merged.extend(initial_transform(initial)?);
            for page in next {
                merged.extend(page_transform(page)?);
            }
            Ok(merged)
        })
    }

    /// The wrapped coordinator
    pub fn coordinator(&self) -> &PagerCoordinator<I, P, E> {
        &self.coordinator
    }

    /// The latest transformed output, if any
    pub fn latest(&self) -> Option<PagerOutput<M>> {
        self.output.borrow().clone()
    }

    /// Register an observer for the latest output and all subsequent ones
    pub fn subscribe<F>(&self, on_update: F) -> Subscription
    where
        F: Fn(PagerOutput<M>) + Send + 'static,
    {
        subscription::forward(self.output.subscribe(), on_update)
    }

    /// Stream-style access to transformed outputs
    pub fn outputs(&self) -> watch::Receiver<Option<PagerOutput<M>>> {
        self.output.subscribe()
    }

    // ==================== Coordinator delegation ====================

    pub async fn fetch(&self) -> Result<()> {
        self.coordinator.fetch().await
    }

    pub async fn refetch(&self, directive: FetchDirective) -> Result<()> {
        self.coordinator.refetch(directive).await
    }

    pub async fn load_next(&self, directive: FetchDirective) -> Result<()> {
        self.coordinator.load_next(directive).await
    }

    pub async fn load_previous(&self, directive: FetchDirective) -> Result<()> {
        self.coordinator.load_previous(directive).await
    }

    pub async fn load_all(&self, fetch_from_initial_page: bool) -> Result<()> {
        self.coordinator.load_all(fetch_from_initial_page).await
    }

    pub fn reset(&self) {
        self.coordinator.reset();
    }

    pub fn cancel(&self) {
        self.coordinator.cancel();
    }

    pub fn can_load_next(&self) -> bool {
        self.coordinator.can_load_next()
    }

    pub fn can_load_previous(&self) -> bool {
        self.coordinator.can_load_previous()
    }
}

/// Run the transform over a success snapshot. Returns `None` when the
/// snapshot has no usable initial page yet.
fn apply<I, P, M, F>(transform: &F, snapshot: &Snapshot<I, P>) -> Option<PagerOutput<M>>
where
    I: Query,
    P: Query,
    F: Fn(&[P::Data], &I::Data, &[P::Data]) -> Result<M>,
{
    let initial = snapshot.initial_page.as_ref()?.data.as_ref()?;
    let previous: Vec<P::Data> = snapshot
        .previous_pages
        .iter()
        .filter_map(|page| page.data.clone())
        .collect();
    let next: Vec<P::Data> = snapshot
        .next_pages
        .iter()
        .filter_map(|page| page.data.clone())
        .collect();
    let origin = snapshot.last_updated.origin();
    Some(transform(&previous, initial, &next).map(|model| (model, origin)))
}
