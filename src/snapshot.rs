//! Pagination Snapshots
//!
//! A snapshot is the externally-visible merged pagination result at a point in
//! time: every previous page (earliest first), the initial page, every next
//! page (fetch order), and a tag identifying which page the triggering fetch
//! updated. Consumers only ever receive snapshots; the mutable pagination
//! state never leaves the coordinator.

use crate::engine::{DataOrigin, ResultEnvelope};
use crate::error::{EngineError, PaginationError};
use crate::query::Query;

/// Tag identifying the page a snapshot was last updated by
pub enum LastUpdatedPage<I: Query, P: Query> {
    /// The initial query's page
    Initial(ResultEnvelope<I::Data>),
    /// A paginated page
    Paginated(ResultEnvelope<P::Data>),
}

impl<I: Query, P: Query> LastUpdatedPage<I, P> {
    /// Origin of the result that produced this update
    pub fn origin(&self) -> DataOrigin {
        match self {
            Self::Initial(envelope) => envelope.origin,
            Self::Paginated(envelope) => envelope.origin,
        }
    }

    /// Errors attached to the updating result
    pub fn errors(&self) -> &[EngineError] {
        match self {
            Self::Initial(envelope) => &envelope.errors,
            Self::Paginated(envelope) => &envelope.errors,
        }
    }
}

impl<I: Query, P: Query> Clone for LastUpdatedPage<I, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Initial(envelope) => Self::Initial(envelope.clone()),
            Self::Paginated(envelope) => Self::Paginated(envelope.clone()),
        }
    }
}

/// The merged pagination result published to subscribers
pub struct Snapshot<I: Query, P: Query> {
    /// Previous pages, earliest first
    pub previous_pages: Vec<ResultEnvelope<P::Data>>,
    /// The initial page, absent until the first fetch completes
    pub initial_page: Option<ResultEnvelope<I::Data>>,
    /// Pages after the initial page, in fetch order
    pub next_pages: Vec<ResultEnvelope<P::Data>>,
    /// Which page the triggering fetch updated
    pub last_updated: LastUpdatedPage<I, P>,
}

impl<I: Query, P: Query> Snapshot<I, P> {
    /// All engine errors carried by any page, in page order
    pub fn all_errors(&self) -> Vec<EngineError> {
        let mut errors = Vec::new();
        for page in &self.previous_pages {
            errors.extend(page.errors.iter().cloned());
        }
        if let Some(initial) = &self.initial_page {
            errors.extend(initial.errors.iter().cloned());
        }
        for page in &self.next_pages {
            errors.extend(page.errors.iter().cloned());
        }
        errors
    }
}

impl<I, P> Snapshot<I, P>
where
    I: Query,
    P: Query<Data = <I as Query>::Data>,
{
    /// Every page envelope in display order, when both queries share a payload
    /// type
    pub fn all_pages(&self) -> Vec<ResultEnvelope<I::Data>> {
        let mut pages: Vec<ResultEnvelope<I::Data>> = Vec::new();
        pages.extend(self.previous_pages.iter().cloned());
        pages.extend(self.initial_page.iter().cloned());
        pages.extend(self.next_pages.iter().cloned());
        pages
    }

    /// Every page payload in display order, skipping failed pages
    pub fn all_data(&self) -> Vec<I::Data> {
        self.all_pages()
            .into_iter()
            .filter_map(|envelope| envelope.data)
            .collect()
    }
}

impl<I: Query, P: Query> Clone for Snapshot<I, P> {
    fn clone(&self) -> Self {
        Self {
            previous_pages: self.previous_pages.clone(),
            initial_page: self.initial_page.clone(),
            next_pages: self.next_pages.clone(),
            last_updated: self.last_updated.clone(),
        }
    }
}

/// A published snapshot or the failure that replaced it
pub type SnapshotResult<I, P> = Result<Snapshot<I, P>, PaginationError>;

/// The payload handed to the page-descriptor extraction function.
///
/// Carries the page being inspected plus the last successful snapshot, for
/// strategies whose capability depends on what has already been fetched
/// (offset-based extraction typically counts rows across the whole output).
pub enum PageSource<'a, I: Query, P: Query> {
    /// The initial page's payload
    Initial(&'a I::Data, Option<&'a Snapshot<I, P>>),
    /// A paginated page's payload
    Paginated(&'a P::Data, Option<&'a Snapshot<I, P>>),
}
