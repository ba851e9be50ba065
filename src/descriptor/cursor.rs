//! Cursor-Based Pagination Shapes

use serde::{Deserialize, Serialize};

/// A cursor-based strategy that can only fetch following pages
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorForward {
    /// Whether a page exists after this one
    pub has_next: bool,
    /// Cursor at the end of this page, fed to the next-page query
    pub end_cursor: Option<String>,
}

impl CursorForward {
    pub fn new(has_next: bool, end_cursor: Option<impl Into<String>>) -> Self {
        Self {
            has_next,
            end_cursor: end_cursor.map(Into::into),
        }
    }
}

/// A cursor-based strategy that can only fetch preceding pages
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorReverse {
    /// Whether a page exists before this one
    pub has_previous: bool,
    /// Cursor at the start of this page, fed to the previous-page query
    pub start_cursor: Option<String>,
}

impl CursorReverse {
    pub fn new(has_previous: bool, start_cursor: Option<impl Into<String>>) -> Self {
        Self {
            has_previous,
            start_cursor: start_cursor.map(Into::into),
        }
    }
}

/// A cursor-based strategy that can fetch in both directions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorBidirectional {
    pub has_next: bool,
    pub end_cursor: Option<String>,
    pub has_previous: bool,
    pub start_cursor: Option<String>,
}

impl CursorBidirectional {
    pub fn new(
        has_next: bool,
        end_cursor: Option<impl Into<String>>,
        has_previous: bool,
        start_cursor: Option<impl Into<String>>,
    ) -> Self {
        Self {
            has_next,
            end_cursor: end_cursor.map(Into::into),
            has_previous,
            start_cursor: start_cursor.map(Into::into),
        }
    }
}
