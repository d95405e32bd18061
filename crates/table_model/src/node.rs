//! Node kinds, attribute bags, and arena node records

use crate::NodeId;
use serde::{Deserialize, Serialize};

/// Enumeration of all node kinds in the document tree.
///
/// `Table`, `Body`, `Row`, `Cell` and `CellBlock` are the table structural
/// kinds. `Scroll`, `Paragraph` and `Text` are the host document kinds the
/// tables live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Document root
    Scroll,
    /// Ordinary text block outside of tables
    Paragraph,
    /// Text leaf
    Text,
    Table,
    Body,
    Row,
    Cell,
    /// Text block scoped to a single cell
    CellBlock,
}

impl NodeKind {
    /// Every node kind, in registry order
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Scroll,
        NodeKind::Paragraph,
        NodeKind::Text,
        NodeKind::Table,
        NodeKind::Body,
        NodeKind::Row,
        NodeKind::Cell,
        NodeKind::CellBlock,
    ];

    /// Position of this kind in [`NodeKind::ALL`]
    pub fn ordinal(self) -> usize {
        match self {
            NodeKind::Scroll => 0,
            NodeKind::Paragraph => 1,
            NodeKind::Text => 2,
            NodeKind::Table => 3,
            NodeKind::Body => 4,
            NodeKind::Row => 5,
            NodeKind::Cell => 6,
            NodeKind::CellBlock => 7,
        }
    }

    /// Whether this is one of the five table structural kinds
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            NodeKind::Table | NodeKind::Body | NodeKind::Row | NodeKind::Cell | NodeKind::CellBlock
        )
    }

    /// Whether this kind is a line of text ending in a line break
    pub fn is_block(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::CellBlock)
    }

    /// Whether this kind only groups other nodes
    pub fn is_container(self) -> bool {
        matches!(
            self,
            NodeKind::Scroll | NodeKind::Table | NodeKind::Body | NodeKind::Row | NodeKind::Cell
        )
    }

    pub fn is_leaf(self) -> bool {
        self == NodeKind::Text
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Scroll => "scroll",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::Table => "table",
            NodeKind::Body => "body",
            NodeKind::Row => "row",
            NodeKind::Cell => "cell",
            NodeKind::CellBlock => "cell-block",
        };
        f.write_str(name)
    }
}

/// Attribute bag carried by structural nodes.
///
/// Rows use `row`; cells use all four fields. Spans of 1 are stored as
/// `None` so that a default span never reaches the rendered markup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<usize>,
}

impl Attributes {
    /// Empty attribute bag
    pub fn none() -> Self {
        Self::default()
    }

    /// Attributes for a row at `row`
    pub fn row(row: usize) -> Self {
        Self {
            row: Some(row),
            ..Self::default()
        }
    }

    /// Attributes for a cell at `(row, col)`
    pub fn cell(row: usize, col: usize) -> Self {
        Self {
            row: Some(row),
            col: Some(col),
            ..Self::default()
        }
    }

    /// Set the column span, dropping it when it is 1 or less
    pub fn with_colspan(mut self, colspan: usize) -> Self {
        self.colspan = (colspan > 1).then_some(colspan);
        self
    }

    /// Set the row span, dropping it when it is 1 or less
    pub fn with_rowspan(mut self, rowspan: usize) -> Self {
        self.rowspan = (rowspan > 1).then_some(rowspan);
        self
    }

    /// Effective column span (at least 1)
    pub fn colspan(&self) -> usize {
        self.colspan.unwrap_or(1).max(1)
    }

    /// Effective row span (at least 1)
    pub fn rowspan(&self) -> usize {
        self.rowspan.unwrap_or(1).max(1)
    }

    /// Base coordinates, if both are present
    pub fn position(&self) -> Option<(usize, usize)> {
        Some((self.row?, self.col?))
    }
}

/// A node record stored in the arena.
///
/// Structure is expressed through handles: `parent`, the sibling links
/// `prev`/`next`, and the `first_child`/`last_child` ends of the child list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) attrs: Attributes,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub(crate) text: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, attrs: Attributes) -> Self {
        Self {
            kind,
            attrs,
            text: String::new(),
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Text content of a `Text` leaf; empty for every other kind
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn prev(&self) -> Option<NodeId> {
        self.prev
    }

    pub fn next(&self) -> Option<NodeId> {
        self.next
    }

    pub fn first_child(&self) -> Option<NodeId> {
        self.first_child
    }

    pub fn last_child(&self) -> Option<NodeId> {
        self.last_child
    }
}
