//! Page Descriptors
//!
//! A page descriptor is the capability-bearing value derived from a fetched
//! page: it answers "can another page be loaded after/before this one" and
//! carries the cursor or offset needed to build that next query. Descriptors
//! are immutable; every fetched page produces a fresh one via the
//! user-supplied extraction function.

mod cursor;
mod offset;

pub use cursor::*;
pub use offset::*;

use serde::{Deserialize, Serialize};

/// Whether a fetch paginates forward or backwards
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaginationDirection {
    /// Load the page after the boundary
    Next,
    /// Load the page before the boundary
    Previous,
}

/// Capability-plus-position value describing what more can be fetched from a
/// given page.
///
/// A closed union of the supported pagination strategies: cursor-based and
/// offset-based, each in forward, reverse, and bidirectional shape. The
/// coordinator only reads the capability bits; the strategy-specific payload
/// is consumed by the page resolver that builds the next query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageDescriptor {
    CursorForward(CursorForward),
    CursorReverse(CursorReverse),
    CursorBidirectional(CursorBidirectional),
    OffsetForward(OffsetForward),
    OffsetReverse(OffsetReverse),
    OffsetBidirectional(OffsetBidirectional),
}

impl PageDescriptor {
    /// Whether a page exists after this one
    pub fn can_load_next(&self) -> bool {
        match self {
            Self::CursorForward(info) => info.has_next,
            Self::CursorReverse(_) => false,
            Self::CursorBidirectional(info) => info.has_next,
            Self::OffsetForward(info) => info.can_load_next,
            Self::OffsetReverse(_) => false,
            Self::OffsetBidirectional(info) => info.can_load_next,
        }
    }

    /// Whether a page exists before this one
    pub fn can_load_previous(&self) -> bool {
        match self {
            Self::CursorForward(_) => false,
            Self::CursorReverse(info) => info.has_previous,
            Self::CursorBidirectional(info) => info.has_previous,
            Self::OffsetForward(_) => false,
            Self::OffsetReverse(info) => info.can_load_previous,
            Self::OffsetBidirectional(info) => info.can_load_previous,
        }
    }

    /// Capability check for an arbitrary direction
    pub fn can_load(&self, direction: PaginationDirection) -> bool {
        match direction {
            PaginationDirection::Next => self.can_load_next(),
            PaginationDirection::Previous => self.can_load_previous(),
        }
    }
}
