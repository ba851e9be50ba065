//! Coordinator Configuration

use crate::engine::FetchDirective;

/// Tunable defaults for a pager coordinator
#[derive(Clone, Copy, Debug)]
pub struct PagerConfig {
    /// Directive used by the no-argument `fetch` operation
    pub initial_fetch_directive: FetchDirective,
    /// Directive used for every fetch issued by `load_all`
    pub load_all_directive: FetchDirective,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            initial_fetch_directive: FetchDirective::CacheAndNetwork,
            load_all_directive: FetchDirective::NetworkOnly,
        }
    }
}
