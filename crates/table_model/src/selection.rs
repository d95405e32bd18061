//! Selection model - flat cursor index and selected length

use serde::{Deserialize, Serialize};

/// A selection in the document, expressed in flat document indices.
///
/// A zero `length` is a caret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Index of the first selected position
    pub index: usize,
    /// Number of selected positions
    pub length: usize,
}

impl Selection {
    /// Create a new selection
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// Create a collapsed selection (caret only)
    pub fn collapsed(index: usize) -> Self {
        Self { index, length: 0 }
    }

    /// Check if this selection is collapsed (just a caret)
    pub fn is_collapsed(&self) -> bool {
        self.length == 0
    }

    /// Index just past the end of the selection
    pub fn end(&self) -> usize {
        self.index + self.length
    }

    /// Clamp the selection so it stays inside a document of `doc_length`.
    ///
    /// The last position of a document is its trailing line break, so the
    /// caret never goes past `doc_length - 1`.
    pub fn clamped(self, doc_length: usize) -> Self {
        let max = doc_length.saturating_sub(1);
        let index = self.index.min(max);
        let length = self.length.min(max - index);
        Self { index, length }
    }
}
