//! Error types for pageflow
//!
//! Centralized error handling using snafu for ergonomic error definitions.
//!
//! Precondition errors (`MissingInitialPage`, `NoMoreContent`, `LoadInProgress`,
//! `NoQuery`) are returned synchronously by the operation that hit them and are
//! never forwarded to snapshot subscribers. Query-engine failures travel the
//! other way: they become a failure snapshot on the subscription stream and the
//! triggering operation still returns `Ok`.

use snafu::Snafu;
use std::sync::Arc;

/// An error reported by the underlying query engine.
///
/// Engines deliver zero or more of these inside a [`ResultEnvelope`]; a page
/// with no data is treated as a failed fetch and its errors are folded into
/// [`PaginationError::Unknown`].
///
/// [`ResultEnvelope`]: crate::engine::ResultEnvelope
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineError {
    message: Arc<str>,
}

impl EngineError {
    /// Create a new engine error from a message
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

/// Main error type for pagination operations
#[derive(Clone, Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum PaginationError {
    /// A directional or bulk fetch was requested before any initial page exists
    #[snafu(display("No initial page has been fetched yet"))]
    MissingInitialPage,

    /// The current boundary has no more content in the requested direction
    #[snafu(display("The current page has no more content in that direction"))]
    NoMoreContent,

    /// A directional fetch was requested while another one is outstanding
    #[snafu(display("A load operation is already in progress"))]
    LoadInProgress,

    /// The page resolver declined to produce a query for a loadable boundary
    #[snafu(display("The page resolver did not produce a query"))]
    NoQuery,

    /// The operation was cancelled before completion
    #[snafu(display("The operation was cancelled"))]
    Cancelled,

    /// An underlying query-engine failure
    #[snafu(display("Query engine failure: {source}"))]
    Unknown { source: EngineError },
}

impl PaginationError {
    /// Fold a batch of engine errors into a single failure.
    ///
    /// An empty batch still yields an `Unknown` error; a page that completes
    /// without data and without errors is a malformed engine response.
    pub(crate) fn from_engine_errors(errors: &[EngineError]) -> Self {
        let source = match errors {
            [] => EngineError::new("query completed without data"),
            [only] => only.clone(),
            many => {
                let joined = many
                    .iter()
                    .map(EngineError::message)
                    .collect::<Vec<_>>()
                    .join("; ");
                EngineError::new(joined)
            }
        };
        PaginationError::Unknown { source }
    }
}

/// Result type alias for convenience
pub type Result<T, E = PaginationError> = std::result::Result<T, E>;
