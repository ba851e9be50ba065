//! Strategy Factories
//!
//! Thin constructors wiring the common pagination-info shapes to a
//! coordinator, given user-supplied extraction and query-builder closures.
//! Each factory covers the single-query case where the initial and paginated
//! queries share one type; mixed-query setups use
//! [`PagerCoordinator::new`] with [`extract_with`] directly.

use crate::coordinator::PagerCoordinator;
use crate::descriptor::{
    CursorBidirectional, CursorForward, CursorReverse, OffsetForward, PageDescriptor,
    PaginationDirection,
};
use crate::engine::QueryEngine;
use crate::query::Query;
use crate::snapshot::PageSource;

/// Combine separate initial-page and paginated-page extractors into the
/// extraction function a coordinator expects
pub fn extract_with<I, P, F, G>(
    initial: F,
    paginated: G,
) -> impl for<'a> Fn(PageSource<'a, I, P>) -> PageDescriptor + Send + Sync + 'static
where
    I: Query,
    P: Query,
    F: Fn(&I::Data) -> PageDescriptor + Send + Sync + 'static,
    G: Fn(&P::Data) -> PageDescriptor + Send + Sync + 'static,
{
    move |source: PageSource<'_, I, P>| match source {
        PageSource::Initial(data, _) => initial(data),
        PageSource::Paginated(data, _) => paginated(data),
    }
}

impl<Q: Query, E: QueryEngine> PagerCoordinator<Q, Q, E> {
    /// A forward cursor-paginated coordinator.
    ///
    /// `query_provider` builds the initial query from `None` and each
    /// next-page query from the previous page's descriptor.
    pub fn forward_cursor(
        engine: E,
        query_provider: impl Fn(Option<&CursorForward>) -> Q + Send + Sync + 'static,
        extract: impl Fn(&Q::Data) -> CursorForward + Send + Sync + 'static,
    ) -> Self {
        let initial_query = query_provider(None);
        Self::new(
            engine,
            initial_query,
            move |source: PageSource<'_, Q, Q>| {
                let data = match source {
                    PageSource::Initial(data, _) | PageSource::Paginated(data, _) => data,
                };
                PageDescriptor::CursorForward(extract(data))
            },
            move |descriptor, direction| match (descriptor, direction) {
                (PageDescriptor::CursorForward(info), PaginationDirection::Next) => {
                    Some(query_provider(Some(info)))
                }
                _ => None,
            },
        )
    }

    /// A reverse cursor-paginated coordinator
    pub fn reverse_cursor(
        engine: E,
        query_provider: impl Fn(Option<&CursorReverse>) -> Q + Send + Sync + 'static,
        extract: impl Fn(&Q::Data) -> CursorReverse + Send + Sync + 'static,
    ) -> Self {
        let initial_query = query_provider(None);
        Self::new(
            engine,
            initial_query,
            move |source: PageSource<'_, Q, Q>| {
                let data = match source {
                    PageSource::Initial(data, _) | PageSource::Paginated(data, _) => data,
                };
                PageDescriptor::CursorReverse(extract(data))
            },
            move |descriptor, direction| match (descriptor, direction) {
                (PageDescriptor::CursorReverse(info), PaginationDirection::Previous) => {
                    Some(query_provider(Some(info)))
                }
                _ => None,
            },
        )
    }

    /// A bidirectional cursor-paginated coordinator.
    ///
    /// `query_provider` receives the direction being paginated so it can pick
    /// the right cursor off the descriptor.
    pub fn bidirectional_cursor(
        engine: E,
        query_provider: impl Fn(Option<&CursorBidirectional>, PaginationDirection) -> Q
        + Send
        + Sync
        + 'static,
        extract: impl Fn(&Q::Data) -> CursorBidirectional + Send + Sync + 'static,
    ) -> Self {
        let initial_query = query_provider(None, PaginationDirection::Next);
        Self::new(
            engine,
            initial_query,
            move |source: PageSource<'_, Q, Q>| {
                let data = match source {
                    PageSource::Initial(data, _) | PageSource::Paginated(data, _) => data,
                };
                PageDescriptor::CursorBidirectional(extract(data))
            },
            move |descriptor, direction| match descriptor {
                PageDescriptor::CursorBidirectional(info) => {
                    Some(query_provider(Some(info), direction))
                }
                _ => None,
            },
        )
    }

    /// A forward offset-paginated coordinator
    pub fn forward_offset(
        engine: E,
        query_provider: impl Fn(Option<&OffsetForward>) -> Q + Send + Sync + 'static,
        extract: impl Fn(&Q::Data) -> OffsetForward + Send + Sync + 'static,
    ) -> Self {
        let initial_query = query_provider(None);
        Self::new(
            engine,
            initial_query,
            move |source: PageSource<'_, Q, Q>| {
                let data = match source {
                    PageSource::Initial(data, _) | PageSource::Paginated(data, _) => data,
                };
                PageDescriptor::OffsetForward(extract(data))
            },
            move |descriptor, direction| match (descriptor, direction) {
                (PageDescriptor::OffsetForward(info), PaginationDirection::Next) => {
                    Some(query_provider(Some(info)))
                }
                _ => None,
            },
        )
    }
}
