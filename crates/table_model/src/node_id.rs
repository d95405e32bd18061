//! Node handles for the document arena

use serde::{Deserialize, Serialize};

/// Handle of a node in a [`DocumentTree`](crate::DocumentTree) arena.
///
/// Handles are plain slot indices. Slots are never reused within one tree, so
/// a handle to a removed node stays dangling instead of aliasing a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index of this node in its arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}
