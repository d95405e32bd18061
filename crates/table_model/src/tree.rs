//! Document tree storage and operations
//!
//! The tree is an arena of [`Node`] records linked by [`NodeId`] handles.
//! Every node is created detached through [`DocumentTree::create`] and only
//! becomes part of the document once it is linked under the root.
//!
//! Flat indices follow the rich-text convention: a text leaf counts one
//! position per character, every block adds one position for its trailing
//! line break, and containers count the sum of their children.

use crate::{Attributes, ModelError, Node, NodeId, NodeKind, NodeRegistry, Result};
use serde::{Deserialize, Serialize};

/// The complete document tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTree {
    /// Node slots; removed nodes leave a tombstone
    nodes: Vec<Option<Node>>,
    /// The document root (a `Scroll` node)
    root: NodeId,
}

impl DocumentTree {
    /// Create a tree holding only an empty root
    pub fn new() -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            root: NodeId::from_index(0),
        };
        tree.root = tree.create(NodeKind::Scroll, Attributes::none());
        tree
    }

    /// Create a document with a single empty paragraph
    pub fn with_empty_paragraph() -> Self {
        let mut tree = Self::new();
        let para = tree.create(NodeKind::Paragraph, Attributes::none());
        let root = tree.root;
        tree.link(root, para, None);
        tree
    }

    /// Get the document root ID
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Get a node by ID, failing when it does not exist
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.get(id).ok_or(ModelError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ModelError::NodeNotFound(id))
    }

    /// Check whether a node exists (attached or not)
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Get the kind of a node
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Get the attributes of a node
    pub fn attrs(&self, id: NodeId) -> Option<&Attributes> {
        self.get(id).map(Node::attrs)
    }

    /// Replace the attributes of a node
    pub fn set_attrs(&mut self, id: NodeId, attrs: Attributes) -> Result<()> {
        self.node_mut(id)?.attrs = attrs;
        Ok(())
    }

    /// Number of live nodes, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    // =========================================================================
    // Node Factory
    // =========================================================================

    /// Create a detached node
    pub fn create(&mut self, kind: NodeKind, attrs: Attributes) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Some(Node::new(kind, attrs)));
        id
    }

    /// Create a detached text leaf
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.create(NodeKind::Text, Attributes::none());
        if let Some(Some(node)) = self.nodes.get_mut(id.index()) {
            node.text = text.to_string();
        }
        id
    }

    /// Replace the text of a text leaf
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        let node = self.node_mut(id)?;
        if node.kind != NodeKind::Text {
            return Err(ModelError::InvalidStructure(format!(
                "{} is a {}, not a text leaf",
                id, node.kind
            )));
        }
        node.text = text.to_string();
        Ok(())
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Iterate over the children of a node, in order
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).and_then(Node::first_child),
        }
    }

    /// Collect the children of a node
    pub fn child_ids(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Iterate over the ancestors of a node, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(Node::parent),
        }
    }

    /// All descendants of a node in document (pre-)order, excluding the node
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.child_ids(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.child_ids(current).into_iter().rev());
        }
        result
    }

    /// A node and its descendants with every child listed before its parent
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                result.push(current);
                continue;
            }
            stack.push((current, true));
            for child in self.child_ids(current).into_iter().rev() {
                stack.push((child, false));
            }
        }
        result
    }

    /// Whether a node is linked (transitively) under the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Nearest ancestor (or the node itself) of the given kind
    pub fn closest(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        if self.kind(id)? == kind {
            return Some(id);
        }
        self.ancestors(id).find(|&a| self.kind(a) == Some(kind))
    }

    /// All blocks of the document in document order
    pub fn blocks(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.kind(id).is_some_and(NodeKind::is_block))
            .collect()
    }

    /// The block that follows `block` in document order, across containers
    pub fn next_block(&self, block: NodeId) -> Option<NodeId> {
        let mut current = block;
        loop {
            let node = self.get(current)?;
            if let Some(next) = node.next {
                return self.first_block_in(next);
            }
            current = node.parent?;
        }
    }

    fn first_block_in(&self, id: NodeId) -> Option<NodeId> {
        if self.kind(id)?.is_block() {
            return Some(id);
        }
        self.descendants(id)
            .into_iter()
            .find(|&d| self.kind(d).is_some_and(NodeKind::is_block))
    }

    /// Plain text of a subtree; every block contributes a trailing `\n`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match node.kind {
            NodeKind::Text => out.push_str(&node.text),
            kind => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
                if kind.is_block() {
                    out.push('\n');
                }
            }
        }
    }

    // =========================================================================
    // Linking
    // =========================================================================

    /// Link `child` under `parent` before `reference` (append when `None`).
    /// Callers must have validated both handles.
    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(r) => self.get(r).and_then(Node::prev),
            None => self.get(parent).and_then(Node::last_child),
        };

        if let Some(Some(node)) = self.nodes.get_mut(child.index()) {
            node.parent = Some(parent);
            node.prev = prev;
            node.next = reference;
        }
        match prev {
            Some(p) => {
                if let Some(Some(node)) = self.nodes.get_mut(p.index()) {
                    node.next = Some(child);
                }
            }
            None => {
                if let Some(Some(node)) = self.nodes.get_mut(parent.index()) {
                    node.first_child = Some(child);
                }
            }
        }
        match reference {
            Some(r) => {
                if let Some(Some(node)) = self.nodes.get_mut(r.index()) {
                    node.prev = Some(child);
                }
            }
            None => {
                if let Some(Some(node)) = self.nodes.get_mut(parent.index()) {
                    node.last_child = Some(child);
                }
            }
        }
    }

    /// Insert a detached node under `parent`, before `reference`.
    ///
    /// With `reference == None` the node is appended as the last child.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.node(parent)?;
        let child_node = self.node(child)?;
        if child_node.parent.is_some() || child == self.root {
            return Err(ModelError::InvalidStructure(format!(
                "{} is already attached",
                child
            )));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(ModelError::InvalidStructure(format!(
                "cannot insert {} into its own subtree",
                child
            )));
        }
        if let Some(r) = reference {
            if self.node(r)?.parent != Some(parent) {
                return Err(ModelError::InvalidStructure(format!(
                    "{} is not a child of {}",
                    r, parent
                )));
            }
        }
        self.link(parent, child, reference);
        Ok(())
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Unlink a node from its parent, keeping its subtree intact
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        let (parent, prev, next) = {
            let node = self.node(id)?;
            (node.parent, node.prev, node.next)
        };
        let Some(parent) = parent else {
            return Ok(());
        };

        match prev {
            Some(p) => self.node_mut(p)?.next = next,
            None => self.node_mut(parent)?.first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n)?.prev = prev,
            None => self.node_mut(parent)?.last_child = prev,
        }
        let node = self.node_mut(id)?;
        node.parent = None;
        node.prev = None;
        node.next = None;
        Ok(())
    }

    /// Remove a node and its entire subtree from the arena
    pub fn remove(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(ModelError::InvalidStructure(
                "the document root cannot be removed".to_string(),
            ));
        }
        self.detach(id)?;
        let mut doomed = self.descendants(id);
        doomed.push(id);
        for gone in doomed {
            if let Some(slot) = self.nodes.get_mut(gone.index()) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// Wrap a node in a new container of `kind`, placed where the node was
    pub fn wrap(&mut self, id: NodeId, kind: NodeKind, attrs: Attributes) -> Result<NodeId> {
        let parent = self.node(id)?.parent.ok_or_else(|| {
            ModelError::InvalidStructure(format!("{} has no parent to wrap within", id))
        })?;
        let wrapper = self.create(kind, attrs);
        self.link(parent, wrapper, Some(id));
        self.detach(id)?;
        self.link(wrapper, id, None);
        Ok(wrapper)
    }

    /// Move every child of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.node(to)?;
        for child in self.child_ids(from) {
            self.detach(child)?;
            self.link(to, child, None);
        }
        Ok(())
    }

    // =========================================================================
    // Flat Indices
    // =========================================================================

    /// Length of a node in flat index positions
    pub fn length(&self, id: NodeId) -> usize {
        let Some(node) = self.get(id) else { return 0 };
        match node.kind {
            NodeKind::Text => node.text.chars().count(),
            kind => {
                let inner: usize = self.children(id).map(|c| self.length(c)).sum();
                if kind.is_block() {
                    inner + 1
                } else {
                    inner
                }
            }
        }
    }

    /// Length of the whole document
    pub fn document_length(&self) -> usize {
        self.length(self.root)
    }

    /// Flat index at which a node starts; `None` when it is not attached
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        if id == self.root {
            return Some(0);
        }
        let node = self.get(id)?;
        let parent = node.parent?;
        let mut index = self.index_of(parent)?;
        let mut sibling = node.prev;
        while let Some(s) = sibling {
            index += self.length(s);
            sibling = self.get(s).and_then(Node::prev);
        }
        Some(index)
    }

    /// Resolve a flat index to the leaf holding it and the offset inside it.
    ///
    /// Positions inside text resolve to the text leaf. The line break position
    /// of a block resolves to the block itself, with the offset equal to the
    /// length of its text.
    pub fn leaf_and_offset_at(&self, index: usize) -> Option<(NodeId, usize)> {
        let mut current = self.root;
        let mut remaining = index;
        loop {
            let kind = self.kind(current)?;
            if kind.is_leaf() {
                return Some((current, remaining));
            }
            let mut descended = false;
            for child in self.children(current) {
                let len = self.length(child);
                if remaining < len {
                    current = child;
                    descended = true;
                    break;
                }
                remaining -= len;
            }
            if !descended {
                if kind.is_block() && remaining == 0 {
                    let text_len = self.length(current) - 1;
                    return Some((current, text_len));
                }
                return None;
            }
        }
    }

    // =========================================================================
    // Text Editing
    // =========================================================================

    /// Insert text (without line breaks) at a flat index
    pub fn insert_text(&mut self, index: usize, text: &str) -> Result<()> {
        if text.contains('\n') {
            return Err(ModelError::InvalidStructure(
                "inserted text must not contain line breaks".to_string(),
            ));
        }
        if text.is_empty() {
            return Ok(());
        }
        let (leaf, offset) = self
            .leaf_and_offset_at(index)
            .ok_or(ModelError::InvalidIndex {
                index,
                length: self.document_length(),
            })?;

        if self.kind(leaf) == Some(NodeKind::Text) {
            let node = self.node_mut(leaf)?;
            let byte = char_to_byte(&node.text, offset);
            node.text.insert_str(byte, text);
            return Ok(());
        }

        // Line break of a block: extend its last text leaf or start one
        match self.get(leaf).and_then(Node::last_child) {
            Some(last) if self.kind(last) == Some(NodeKind::Text) => {
                self.node_mut(last)?.text.push_str(text);
            }
            _ => {
                let new_leaf = self.create_text(text);
                self.link(leaf, new_leaf, None);
            }
        }
        Ok(())
    }

    /// Delete `length` positions starting at `index`.
    ///
    /// Whole text leaves, blocks and tables inside the range are removed.
    /// Table bodies, rows and cells are never removed by a range deletion;
    /// only their content is. When a deleted range includes a block's line
    /// break, the block is joined with the following line if the registry's
    /// merge predicate allows it; otherwise the line break survives. The
    /// registry's compaction pass runs afterwards.
    pub fn delete_range(
        &mut self,
        index: usize,
        length: usize,
        registry: &NodeRegistry,
    ) -> Result<()> {
        if length == 0 {
            return Ok(());
        }
        let total = self.document_length();
        if index >= total {
            return Err(ModelError::InvalidIndex { index, length: total });
        }
        let end = (index + length).min(total);

        let mut joins = Vec::new();
        let root = self.root;
        self.delete_within(root, 0, index, end, &mut joins)?;

        for block in joins {
            if !self.contains(block) || !registry.can_merge(self, block) {
                continue;
            }
            if let Some(next) = self.next_block(block) {
                self.move_children(next, block)?;
                self.remove(next)?;
            }
        }

        registry.compact(self)?;
        Ok(())
    }

    fn delete_within(
        &mut self,
        id: NodeId,
        start: usize,
        from: usize,
        to: usize,
        joins: &mut Vec<NodeId>,
    ) -> Result<()> {
        let kind = self.node(id)?.kind;
        let len = self.length(id);
        let end = start + len;
        if len == 0 || to <= start || from >= end {
            return Ok(());
        }

        let covered = from <= start && end <= to;
        let removable = kind.is_leaf() || kind.is_block() || kind == NodeKind::Table;
        if covered && removable && id != self.root {
            return self.remove(id);
        }

        if kind == NodeKind::Text {
            let lo = from.max(start) - start;
            let hi = to.min(end) - start;
            let node = self.node_mut(id)?;
            node.text = node
                .text
                .chars()
                .enumerate()
                .filter(|(i, _)| *i < lo || *i >= hi)
                .map(|(_, c)| c)
                .collect();
            return Ok(());
        }

        let mut child_start = start;
        let layout: Vec<(NodeId, usize)> = self
            .children(id)
            .map(|c| {
                let at = child_start;
                child_start += self.length(c);
                (c, at)
            })
            .collect();
        for (child, at) in layout {
            self.delete_within(child, at, from, to, joins)?;
        }

        if kind.is_block() {
            let line_break = end - 1;
            if from <= line_break && line_break < to {
                joins.push(id);
            }
        }
        Ok(())
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::with_empty_paragraph()
    }
}

fn char_to_byte(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(Node::next);
        Some(current)
    }
}

/// Iterator over the ancestors of a node, nearest first
pub struct Ancestors<'a> {
    tree: &'a DocumentTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.get(current).and_then(Node::parent);
        Some(current)
    }
}
