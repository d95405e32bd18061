//! Node registry - per-kind behaviour records and the compaction pass
//!
//! Each [`NodeKind`] has one [`NodeSpec`] holding plain function pointers for
//! rendering, parsing, merge eligibility and structural repair. The registry
//! is built once when an editor is initialized and handed to every component
//! that needs it.

use crate::{Attributes, DocumentTree, ModelError, NodeId, NodeKind, Result};

/// Upper bound on compaction passes; every repair makes progress, so a
/// well-formed tree settles long before this
const MAX_COMPACTION_PASSES: usize = 16;

/// An element as it appears in rendered markup; attributes keep their order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
}

impl RenderedElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }

    /// Set an attribute, replacing an earlier value of the same name
    pub fn with_attribute(mut self, name: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn get_usize(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }
}

pub type RenderFn = fn(&Attributes) -> RenderedElement;
pub type ParseFn = fn(&RenderedElement) -> Attributes;
pub type MergeFn = fn(&DocumentTree, NodeId) -> bool;
pub type RepairFn = fn(&mut DocumentTree, NodeId) -> Result<bool>;

/// Behaviour record for one node kind
#[derive(Debug, Clone, Copy)]
pub struct NodeSpec {
    pub kind: NodeKind,
    /// Tag used in rendered markup (empty for kinds that are not elements)
    pub tag: &'static str,
    /// Kinds that may appear as children; enforced by repair, not on insert
    pub allowed_children: &'static [NodeKind],
    /// Attributes to rendered element
    pub render: RenderFn,
    /// Rendered element to attributes (inverse of `render`)
    pub parse: ParseFn,
    /// Whether the node may merge with what follows it
    pub can_merge: MergeFn,
    /// Compaction hook; returns whether the tree changed
    pub repair: RepairFn,
}

/// Registry of node specs, indexed by [`NodeKind::ordinal`]
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    specs: Vec<NodeSpec>,
}

impl NodeRegistry {
    /// Build the standard registry
    pub fn new() -> Self {
        let specs = NodeKind::ALL.iter().map(|&kind| standard_spec(kind)).collect();
        Self { specs }
    }

    /// Behaviour record for a kind
    pub fn spec(&self, kind: NodeKind) -> &NodeSpec {
        &self.specs[kind.ordinal()]
    }

    /// Map a markup tag to a node kind.
    ///
    /// `p` is a cell block inside a cell and a paragraph elsewhere; `th` is
    /// accepted as a cell.
    pub fn kind_for_tag(&self, tag: &str, inside_cell: bool) -> Option<NodeKind> {
        match tag {
            "p" if inside_cell => Some(NodeKind::CellBlock),
            "p" => Some(NodeKind::Paragraph),
            "th" => Some(NodeKind::Cell),
            other => self
                .specs
                .iter()
                .find(|s| s.kind.is_structural() && s.tag == other)
                .map(|s| s.kind),
        }
    }

    /// Whether `child` may live directly under `parent`
    pub fn allows_child(&self, parent: NodeKind, child: NodeKind) -> bool {
        self.spec(parent).allowed_children.contains(&child)
    }

    /// Render a node's tag and attributes
    pub fn render(&self, tree: &DocumentTree, id: NodeId) -> Option<RenderedElement> {
        let node = tree.get(id)?;
        Some((self.spec(node.kind()).render)(node.attrs()))
    }

    /// Parse the attributes of a rendered element of the given kind
    pub fn parse(&self, kind: NodeKind, element: &RenderedElement) -> Attributes {
        (self.spec(kind).parse)(element)
    }

    /// Whether a node may merge with what follows it
    pub fn can_merge(&self, tree: &DocumentTree, id: NodeId) -> bool {
        match tree.kind(id) {
            Some(kind) => (self.spec(kind).can_merge)(tree, id),
            None => false,
        }
    }

    /// Run repairs over the attached tree until nothing changes.
    ///
    /// Returns the number of repairs performed.
    pub fn compact(&self, tree: &mut DocumentTree) -> Result<usize> {
        let mut repairs = 0;
        for _ in 0..MAX_COMPACTION_PASSES {
            let mut changed = false;
            for id in tree.post_order(tree.root()) {
                let Some(kind) = tree.kind(id) else { continue };
                if !tree.is_attached(id) {
                    continue;
                }
                if (self.spec(kind).repair)(tree, id)? {
                    tracing::trace!(node = %id, %kind, "compaction repair");
                    changed = true;
                    repairs += 1;
                }
            }
            if !changed {
                return Ok(repairs);
            }
        }
        Err(ModelError::InvalidStructure(
            "compaction did not settle".to_string(),
        ))
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn standard_spec(kind: NodeKind) -> NodeSpec {
    match kind {
        NodeKind::Scroll => NodeSpec {
            kind,
            tag: "",
            allowed_children: &[NodeKind::Paragraph, NodeKind::Table],
            render: render_plain,
            parse: parse_nothing,
            can_merge: never_merge,
            repair: repair_scroll,
        },
        NodeKind::Paragraph => NodeSpec {
            kind,
            tag: "p",
            allowed_children: &[NodeKind::Text],
            render: render_block,
            parse: parse_nothing,
            can_merge: paragraph_can_merge,
            repair: repair_nothing,
        },
        NodeKind::Text => NodeSpec {
            kind,
            tag: "",
            allowed_children: &[],
            render: render_plain,
            parse: parse_nothing,
            can_merge: text_can_merge,
            repair: repair_text,
        },
        NodeKind::Table => NodeSpec {
            kind,
            tag: "table",
            allowed_children: &[NodeKind::Body],
            render: render_table,
            parse: parse_nothing,
            can_merge: never_merge,
            repair: repair_table,
        },
        NodeKind::Body => NodeSpec {
            kind,
            tag: "tbody",
            allowed_children: &[NodeKind::Row],
            render: render_body,
            parse: parse_nothing,
            can_merge: never_merge,
            repair: repair_body,
        },
        NodeKind::Row => NodeSpec {
            kind,
            tag: "tr",
            allowed_children: &[NodeKind::Cell],
            render: render_row,
            parse: parse_row,
            can_merge: never_merge,
            repair: repair_row,
        },
        NodeKind::Cell => NodeSpec {
            kind,
            tag: "td",
            allowed_children: &[NodeKind::CellBlock],
            render: render_cell,
            parse: parse_cell,
            can_merge: never_merge,
            repair: repair_cell,
        },
        NodeKind::CellBlock => NodeSpec {
            kind,
            tag: "p",
            allowed_children: &[NodeKind::Text],
            render: render_block,
            parse: parse_nothing,
            can_merge: cell_block_can_merge,
            repair: repair_nothing,
        },
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn render_plain(_attrs: &Attributes) -> RenderedElement {
    RenderedElement::default()
}

fn render_table(_attrs: &Attributes) -> RenderedElement {
    RenderedElement::new("table")
}

fn render_body(_attrs: &Attributes) -> RenderedElement {
    RenderedElement::new("tbody")
}

fn render_block(_attrs: &Attributes) -> RenderedElement {
    RenderedElement::new("p")
}

fn render_row(attrs: &Attributes) -> RenderedElement {
    let mut element = RenderedElement::new("tr");
    if let Some(row) = attrs.row {
        element = element.with_attribute("data-row", row);
    }
    element
}

fn render_cell(attrs: &Attributes) -> RenderedElement {
    let mut element = RenderedElement::new("td");
    if let Some(row) = attrs.row {
        element = element.with_attribute("data-row", row);
    }
    if let Some(col) = attrs.col {
        element = element.with_attribute("data-col", col);
    }
    if attrs.colspan() > 1 {
        element = element.with_attribute("colspan", attrs.colspan());
    }
    if attrs.rowspan() > 1 {
        element = element.with_attribute("rowspan", attrs.rowspan());
    }
    element
}

fn parse_nothing(_element: &RenderedElement) -> Attributes {
    Attributes::none()
}

fn parse_row(element: &RenderedElement) -> Attributes {
    Attributes {
        row: element.get_usize("data-row"),
        ..Attributes::default()
    }
}

fn parse_cell(element: &RenderedElement) -> Attributes {
    Attributes {
        row: element.get_usize("data-row"),
        col: element.get_usize("data-col"),
        ..Attributes::default()
    }
    .with_colspan(element.get_usize("colspan").unwrap_or(1))
    .with_rowspan(element.get_usize("rowspan").unwrap_or(1))
}

// =============================================================================
// Merge Eligibility
// =============================================================================

fn never_merge(_tree: &DocumentTree, _id: NodeId) -> bool {
    false
}

fn paragraph_can_merge(tree: &DocumentTree, id: NodeId) -> bool {
    tree.next_block(id)
        .is_some_and(|next| tree.kind(next) == Some(NodeKind::Paragraph))
}

fn cell_block_can_merge(tree: &DocumentTree, id: NodeId) -> bool {
    let Some(next) = tree.next_block(id) else {
        return false;
    };
    let parent = tree.get(id).and_then(|n| n.parent());
    let next_parent = tree.get(next).and_then(|n| n.parent());
    tree.kind(next) == Some(NodeKind::CellBlock) && parent.is_some() && parent == next_parent
}

fn text_can_merge(tree: &DocumentTree, id: NodeId) -> bool {
    tree.get(id)
        .and_then(|n| n.next())
        .is_some_and(|next| tree.kind(next) == Some(NodeKind::Text))
}

// =============================================================================
// Repairs
// =============================================================================

fn repair_nothing(_tree: &mut DocumentTree, _id: NodeId) -> Result<bool> {
    Ok(false)
}

fn repair_scroll(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if tree.get(id).and_then(|n| n.first_child()).is_some() {
        return Ok(false);
    }
    let para = tree.create(NodeKind::Paragraph, Attributes::none());
    tree.append_child(id, para)?;
    Ok(true)
}

fn repair_text(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if tree.node(id)?.text().is_empty() {
        tree.remove(id)?;
        return Ok(true);
    }
    if !text_can_merge(tree, id) {
        return Ok(false);
    }
    if let Some(next) = tree.node(id)?.next() {
        let merged = format!("{}{}", tree.node(id)?.text(), tree.node(next)?.text());
        tree.set_text(id, &merged)?;
        tree.remove(next)?;
    }
    Ok(true)
}

fn repair_table(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    let bodies: Vec<NodeId> = tree
        .children(id)
        .filter(|&c| tree.kind(c) == Some(NodeKind::Body))
        .collect();
    if tree.get(id).and_then(|n| n.first_child()).is_none() {
        tree.remove(id)?;
        return Ok(true);
    }
    let Some((&first, extra)) = bodies.split_first() else {
        return Ok(false);
    };
    for &body in extra {
        tree.move_children(body, first)?;
        tree.remove(body)?;
    }
    Ok(!extra.is_empty())
}

fn repair_body(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if parent_kind(tree, id) != Some(NodeKind::Table) {
        wrap_run(tree, id, NodeKind::Table, Attributes::none())?;
        return Ok(true);
    }
    remove_if_empty(tree, id)
}

fn repair_row(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if parent_kind(tree, id) != Some(NodeKind::Body) {
        wrap_run(tree, id, NodeKind::Body, Attributes::none())?;
        return Ok(true);
    }
    remove_if_empty(tree, id)
}

fn repair_cell(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if parent_kind(tree, id) != Some(NodeKind::Row) {
        let row = tree.node(id)?.attrs().row;
        let attrs = Attributes {
            row,
            ..Attributes::default()
        };
        wrap_run(tree, id, NodeKind::Row, attrs)?;
        return Ok(true);
    }
    let has_block = tree
        .children(id)
        .any(|c| tree.kind(c) == Some(NodeKind::CellBlock));
    if has_block {
        return Ok(false);
    }
    let block = tree.create(NodeKind::CellBlock, Attributes::none());
    tree.append_child(id, block)?;
    Ok(true)
}

fn parent_kind(tree: &DocumentTree, id: NodeId) -> Option<NodeKind> {
    tree.get(id)
        .and_then(|n| n.parent())
        .and_then(|p| tree.kind(p))
}

fn remove_if_empty(tree: &mut DocumentTree, id: NodeId) -> Result<bool> {
    if tree.get(id).and_then(|n| n.first_child()).is_some() {
        return Ok(false);
    }
    tree.remove(id)?;
    Ok(true)
}

/// Wrap `id` and the consecutive siblings of the same kind that follow it in
/// a single new container
fn wrap_run(tree: &mut DocumentTree, id: NodeId, kind: NodeKind, attrs: Attributes) -> Result<NodeId> {
    let own_kind = tree.node(id)?.kind();
    let mut run = Vec::new();
    let mut sibling = tree.node(id)?.next();
    while let Some(s) = sibling {
        if tree.kind(s) != Some(own_kind) {
            break;
        }
        run.push(s);
        sibling = tree.node(s)?.next();
    }

    let wrapper = tree.wrap(id, kind, attrs)?;
    for member in run {
        tree.detach(member)?;
        tree.append_child(wrapper, member)?;
    }
    Ok(wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach(tree: &mut DocumentTree, parent: NodeId, kind: NodeKind, attrs: Attributes) -> NodeId {
        let id = tree.create(kind, attrs);
        tree.append_child(parent, id).unwrap();
        id
    }

    #[test]
    fn test_cell_render_parse_inverse() {
        let registry = NodeRegistry::new();
        let attrs = Attributes::cell(2, 3).with_colspan(2).with_rowspan(4);
        let element = (registry.spec(NodeKind::Cell).render)(&attrs);

        assert_eq!(element.tag, "td");
        assert_eq!(element.get("data-row"), Some("2"));
        assert_eq!(element.get("data-col"), Some("3"));
        assert_eq!(element.get("colspan"), Some("2"));
        assert_eq!(element.get("rowspan"), Some("4"));
        assert_eq!(registry.parse(NodeKind::Cell, &element), attrs);
    }

    #[test]
    fn test_spans_of_one_are_not_rendered() {
        let registry = NodeRegistry::new();
        let element = (registry.spec(NodeKind::Cell).render)(&Attributes::cell(0, 0));
        assert!(element.get("colspan").is_none());
        assert!(element.get("rowspan").is_none());

        let parsed = registry.parse(
            NodeKind::Cell,
            &RenderedElement::new("td")
                .with_attribute("data-row", 1)
                .with_attribute("data-col", 0)
                .with_attribute("colspan", 1),
        );
        assert_eq!(parsed, Attributes::cell(1, 0));
    }

    #[test]
    fn test_row_render() {
        let registry = NodeRegistry::new();
        let element = (registry.spec(NodeKind::Row).render)(&Attributes::row(5));
        assert_eq!(element.tag, "tr");
        assert_eq!(element.get("data-row"), Some("5"));
    }

    #[test]
    fn test_kind_for_tag() {
        let registry = NodeRegistry::new();
        assert_eq!(registry.kind_for_tag("table", false), Some(NodeKind::Table));
        assert_eq!(registry.kind_for_tag("tbody", false), Some(NodeKind::Body));
        assert_eq!(registry.kind_for_tag("tr", false), Some(NodeKind::Row));
        assert_eq!(registry.kind_for_tag("th", false), Some(NodeKind::Cell));
        assert_eq!(registry.kind_for_tag("p", true), Some(NodeKind::CellBlock));
        assert_eq!(registry.kind_for_tag("p", false), Some(NodeKind::Paragraph));
        assert_eq!(registry.kind_for_tag("span", false), None);
    }

    #[test]
    fn test_structural_containers_never_merge() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        let body = attach(&mut tree, table, NodeKind::Body, Attributes::none());
        let row_a = attach(&mut tree, body, NodeKind::Row, Attributes::row(0));
        let row_b = attach(&mut tree, body, NodeKind::Row, Attributes::row(1));
        let cell_a = attach(&mut tree, row_a, NodeKind::Cell, Attributes::cell(0, 0));
        let cell_b = attach(&mut tree, row_b, NodeKind::Cell, Attributes::cell(1, 0));
        attach(&mut tree, cell_a, NodeKind::CellBlock, Attributes::none());
        attach(&mut tree, cell_b, NodeKind::CellBlock, Attributes::none());

        for id in [table, body, row_a, row_b, cell_a, cell_b] {
            assert!(!registry.can_merge(&tree, id));
        }
    }

    #[test]
    fn test_cell_block_merges_only_within_its_cell() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        let body = attach(&mut tree, table, NodeKind::Body, Attributes::none());
        let row = attach(&mut tree, body, NodeKind::Row, Attributes::row(0));
        let cell_a = attach(&mut tree, row, NodeKind::Cell, Attributes::cell(0, 0));
        let cell_b = attach(&mut tree, row, NodeKind::Cell, Attributes::cell(0, 1));
        let first = attach(&mut tree, cell_a, NodeKind::CellBlock, Attributes::none());
        let second = attach(&mut tree, cell_a, NodeKind::CellBlock, Attributes::none());
        let other = attach(&mut tree, cell_b, NodeKind::CellBlock, Attributes::none());

        assert!(registry.can_merge(&tree, first));
        assert!(!registry.can_merge(&tree, second));
        assert!(!registry.can_merge(&tree, other));
    }

    #[test]
    fn test_misplaced_rows_are_wrapped_in_one_body() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        for r in 0..3 {
            let row = attach(&mut tree, table, NodeKind::Row, Attributes::row(r));
            attach(&mut tree, row, NodeKind::Cell, Attributes::cell(r, 0));
        }

        let repairs = registry.compact(&mut tree).unwrap();
        assert!(repairs > 0);

        let bodies = tree.child_ids(table);
        assert_eq!(bodies.len(), 1);
        assert_eq!(tree.kind(bodies[0]), Some(NodeKind::Body));
        assert_eq!(tree.child_ids(bodies[0]).len(), 3);
        for row in tree.child_ids(bodies[0]) {
            let cell = tree.child_ids(row)[0];
            assert_eq!(tree.kind(tree.child_ids(cell)[0]), Some(NodeKind::CellBlock));
        }
    }

    #[test]
    fn test_orphan_body_is_wrapped_in_table() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let body = attach(&mut tree, root, NodeKind::Body, Attributes::none());
        let row = attach(&mut tree, body, NodeKind::Row, Attributes::row(0));
        attach(&mut tree, row, NodeKind::Cell, Attributes::cell(0, 0));

        registry.compact(&mut tree).unwrap();
        let table = tree.get(body).unwrap().parent().unwrap();
        assert_eq!(tree.kind(table), Some(NodeKind::Table));
        assert_eq!(tree.get(table).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_orphan_cell_is_wrapped_in_row() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        let body = attach(&mut tree, table, NodeKind::Body, Attributes::none());
        let cell = attach(&mut tree, body, NodeKind::Cell, Attributes::cell(4, 0));

        registry.compact(&mut tree).unwrap();
        let row = tree.get(cell).unwrap().parent().unwrap();
        assert_eq!(tree.kind(row), Some(NodeKind::Row));
        assert_eq!(tree.attrs(row).unwrap().row, Some(4));
    }

    #[test]
    fn test_extra_bodies_are_folded_into_the_first() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        for r in 0..2 {
            let body = attach(&mut tree, table, NodeKind::Body, Attributes::none());
            let row = attach(&mut tree, body, NodeKind::Row, Attributes::row(r));
            attach(&mut tree, row, NodeKind::Cell, Attributes::cell(r, 0));
        }

        registry.compact(&mut tree).unwrap();
        let bodies = tree.child_ids(table);
        assert_eq!(bodies.len(), 1);
        assert_eq!(tree.child_ids(bodies[0]).len(), 2);
    }

    #[test]
    fn test_empty_table_is_removed() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::with_empty_paragraph();
        let root = tree.root();
        let table = attach(&mut tree, root, NodeKind::Table, Attributes::none());
        attach(&mut tree, table, NodeKind::Body, Attributes::none());

        registry.compact(&mut tree).unwrap();
        assert!(!tree.contains(table));
        assert_eq!(tree.document_length(), 1);
    }

    #[test]
    fn test_adjacent_text_leaves_coalesce() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let para = attach(&mut tree, root, NodeKind::Paragraph, Attributes::none());
        for part in ["ab", "", "cd"] {
            let leaf = tree.create_text(part);
            tree.append_child(para, leaf).unwrap();
        }

        registry.compact(&mut tree).unwrap();
        assert_eq!(tree.child_ids(para).len(), 1);
        assert_eq!(tree.text_content(para), "abcd\n");
    }
}
