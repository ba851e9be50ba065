//! Offset-Based Pagination Shapes
//!
//! Offset strategies key pages by an integer position instead of an opaque
//! cursor. The engine cannot tell the coordinator whether more content exists,
//! so the extraction function decides the capability bits, typically by
//! comparing the fetched page size against the requested page size.

use serde::{Deserialize, Serialize};

/// An offset-based strategy that can only fetch following pages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetForward {
    /// Offset of the first row after this page
    pub offset: u64,
    pub can_load_next: bool,
}

impl OffsetForward {
    pub fn new(offset: u64, can_load_next: bool) -> Self {
        Self {
            offset,
            can_load_next,
        }
    }
}

/// An offset-based strategy that can only fetch preceding pages
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetReverse {
    /// Offset of the first row of this page
    pub offset: u64,
    pub can_load_previous: bool,
}

impl OffsetReverse {
    pub fn new(offset: u64, can_load_previous: bool) -> Self {
        Self {
            offset,
            can_load_previous,
        }
    }
}

/// An offset-based strategy that can fetch in both directions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetBidirectional {
    pub offset: u64,
    pub can_load_next: bool,
    pub can_load_previous: bool,
}

impl OffsetBidirectional {
    pub fn new(offset: u64, can_load_next: bool, can_load_previous: bool) -> Self {
        Self {
            offset,
            can_load_next,
            can_load_previous,
        }
    }
}
