//! The narrow interface the table editor consumes from its host editor
//!
//! The host owns the document, the selection, history and rendering. The
//! table editor only reaches it through [`EditorHost`].

use crate::{Result, TableConfig};
use table_model::{Attributes, DocumentTree, NodeId, NodeKind, NodeRegistry};

/// Who a change is attributed to when the host is told to re-render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeSource {
    /// Programmatic change that should not notify listeners
    Silent,
    /// Programmatic change
    Api,
    /// Change made by the user
    User,
}

/// Host editor operations used by the table engine
pub trait EditorHost {
    /// The document tree
    fn tree(&self) -> &DocumentTree;

    /// The document tree, for structural edits
    fn tree_mut(&mut self) -> &mut DocumentTree;

    /// Node behaviour records
    fn registry(&self) -> &NodeRegistry;

    /// Table editor settings
    fn config(&self) -> &TableConfig;

    /// Create a detached node
    fn create_node(&mut self, kind: NodeKind, attrs: Attributes) -> NodeId {
        self.tree_mut().create(kind, attrs)
    }

    /// Cursor position, if the editor has focus
    fn selection_index(&self) -> Option<usize>;

    /// Move the selection
    fn set_selection(&mut self, index: usize, length: usize);

    /// The leaf at a flat index and the offset inside it
    fn leaf_and_offset_at(&self, index: usize) -> Option<(NodeId, usize)> {
        self.tree().leaf_and_offset_at(index)
    }

    /// Flat index where a node starts
    fn index_of(&self, node: NodeId) -> Option<usize> {
        self.tree().index_of(node)
    }

    /// Normalize the tree and redraw after a structural change
    fn force_rerender(&mut self, source: ChangeSource) -> Result<()>;

    /// Stop recording changes in the undo history
    fn suspend_history(&mut self);

    /// Resume recording changes; pairs with [`EditorHost::suspend_history`]
    fn resume_history(&mut self);

    /// Delete a range of the document
    fn delete_range(&mut self, index: usize, length: usize) -> Result<()>;
}
