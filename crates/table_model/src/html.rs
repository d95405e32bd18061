//! HTML codec - the persisted form of a document
//!
//! Tables are written as
//! `<table><tbody><tr data-row><td data-row data-col><p>..</p></td></tr></tbody></table>`
//! with paragraphs outside tables as plain `<p>` elements. Empty blocks are
//! written as `<p><br/></p>`.
//!
//! Parsing is lenient: void elements may be left unclosed, unknown inline
//! tags are descended through (their formatting is dropped), text placed
//! directly in a cell or at the top level gets an implicit block, and
//! misplaced table parts are left for the compaction pass to repair.

use crate::coords::{row_cells, table_rows};
use crate::{
    Attributes, DocumentTree, ModelError, NodeId, NodeKind, NodeRegistry, RenderedElement, Result,
};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Elements that never have content
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "wbr", "col", "meta", "link"];

// =============================================================================
// Writing
// =============================================================================

/// Serialize a document to HTML
pub fn to_html(tree: &DocumentTree, registry: &NodeRegistry) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    for child in tree.children(tree.root()) {
        write_node(&mut writer, tree, registry, child)?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| ModelError::Html(e.to_string()))
}

fn write_node(
    writer: &mut Writer<Vec<u8>>,
    tree: &DocumentTree,
    registry: &NodeRegistry,
    id: NodeId,
) -> Result<()> {
    let node = tree.node(id)?;
    if node.kind() == NodeKind::Text {
        return write_event(writer, Event::Text(BytesText::new(node.text())));
    }
    let Some(element) = registry.render(tree, id) else {
        return Ok(());
    };
    if element.tag.is_empty() {
        for child in tree.children(id) {
            write_node(writer, tree, registry, child)?;
        }
        return Ok(());
    }

    let mut start = BytesStart::new(element.tag.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    write_event(writer, Event::Start(start))?;

    if node.kind().is_block() && tree.length(id) == 1 {
        write_event(writer, Event::Empty(BytesStart::new("br")))?;
    } else {
        for child in tree.children(id) {
            write_node(writer, tree, registry, child)?;
        }
    }

    write_event(writer, Event::End(BytesEnd::new(element.tag.as_str())))
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ModelError::Html(e.to_string()))
}

// =============================================================================
// Parsing
// =============================================================================

/// An open element during parsing; inline tags we do not model have no node
struct Frame {
    tag: String,
    node: Option<NodeId>,
}

/// Parse HTML into a compacted document
pub fn from_html(html: &str, registry: &NodeRegistry) -> Result<DocumentTree> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut tree = DocumentTree::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut implicit: Option<NodeId> = None;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let tag = tag_name(e);
                if VOID_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                let node = open_element(&mut tree, registry, &stack, e, &tag)?;
                if node.is_some() {
                    implicit = None;
                }
                stack.push(Frame { tag, node });
            }
            Event::Empty(ref e) => {
                let tag = tag_name(e);
                if VOID_TAGS.contains(&tag.as_str()) {
                    continue;
                }
                if open_element(&mut tree, registry, &stack, e, &tag)?.is_some() {
                    implicit = None;
                }
            }
            Event::End(ref e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if let Some(pos) = stack.iter().rposition(|f| f.tag == tag) {
                    stack.truncate(pos);
                }
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape_with(resolve_entity)
                    .map_err(|err| ModelError::Html(err.to_string()))?;
                add_text(&mut tree, &stack, &mut implicit, &text)?;
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                add_text(&mut tree, &stack, &mut implicit, &text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    registry.compact(&mut tree)?;
    assign_missing_coordinates(&mut tree)?;
    tracing::trace!(nodes = tree.node_count(), "parsed html document");
    Ok(tree)
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

fn resolve_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "ensp" => Some("\u{2002}"),
        "emsp" => Some("\u{2003}"),
        "thinsp" => Some("\u{2009}"),
        "ndash" => Some("\u{2013}"),
        "mdash" => Some("\u{2014}"),
        "hellip" => Some("\u{2026}"),
        "copy" => Some("\u{a9}"),
        _ => None,
    }
}

/// The node new content goes into
fn current_container(tree: &DocumentTree, stack: &[Frame]) -> NodeId {
    stack
        .iter()
        .rev()
        .find_map(|f| f.node)
        .unwrap_or_else(|| tree.root())
}

/// Nesting depth of a kind inside a document
fn depth(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Scroll => 0,
        NodeKind::Table => 1,
        NodeKind::Body => 2,
        NodeKind::Row => 3,
        NodeKind::Cell => 4,
        NodeKind::Paragraph | NodeKind::CellBlock => 5,
        NodeKind::Text => 6,
    }
}

/// Whether a `child` opened while `parent` is current implicitly closes
/// `parent` (an unclosed `<p>` before a `<table>`, a `<td>` after a `<td>`)
fn must_climb(parent: NodeKind, child: NodeKind) -> bool {
    if parent == NodeKind::Scroll {
        return false;
    }
    if child.is_block() {
        return !matches!(parent, NodeKind::Cell);
    }
    depth(parent) >= depth(child)
}

/// Create the node for a start tag; `None` for tags that are not modelled
fn open_element(
    tree: &mut DocumentTree,
    registry: &NodeRegistry,
    stack: &[Frame],
    start: &BytesStart<'_>,
    tag: &str,
) -> Result<Option<NodeId>> {
    let mut parent = current_container(tree, stack);
    let inside_cell = tree.closest(parent, NodeKind::Cell).is_some();
    let Some(kind) = registry.kind_for_tag(tag, inside_cell) else {
        return Ok(None);
    };
    if kind == NodeKind::Table && inside_cell {
        return Err(ModelError::Html(
            "tables nested inside table cells are not supported".to_string(),
        ));
    }

    while let Some(parent_kind) = tree.kind(parent) {
        if !must_climb(parent_kind, kind) {
            break;
        }
        match tree.get(parent).and_then(|n| n.parent()) {
            Some(up) => parent = up,
            None => break,
        }
    }

    let mut element = RenderedElement::new(tag);
    for attr in start.html_attributes() {
        let attr = attr.map_err(|e| ModelError::Html(e.to_string()))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value()?;
        element = element.with_attribute(&name, value);
    }

    let attrs = registry.parse(kind, &element);
    let id = tree.create(kind, attrs);
    tree.append_child(parent, id)?;
    Ok(Some(id))
}

fn add_text(
    tree: &mut DocumentTree,
    stack: &[Frame],
    implicit: &mut Option<NodeId>,
    text: &str,
) -> Result<()> {
    // Line breaks in markup are formatting, not content
    let text: String = text.chars().filter(|&c| c != '\n' && c != '\r').collect();
    if text.is_empty() {
        return Ok(());
    }
    let container = current_container(tree, stack);
    let block = match tree.kind(container) {
        Some(kind) if kind.is_block() => container,
        Some(kind @ (NodeKind::Scroll | NodeKind::Cell)) => {
            if text.trim().is_empty() {
                return Ok(());
            }
            let reusable = implicit.filter(|&b| {
                tree.get(container).and_then(|n| n.last_child()) == Some(b)
            });
            match reusable {
                Some(b) => b,
                None => {
                    let block_kind = if kind == NodeKind::Cell {
                        NodeKind::CellBlock
                    } else {
                        NodeKind::Paragraph
                    };
                    let b = tree.create(block_kind, Attributes::none());
                    tree.append_child(container, b)?;
                    *implicit = Some(b);
                    b
                }
            }
        }
        // Whitespace between table parts
        _ => return Ok(()),
    };
    let leaf = tree.create_text(&text);
    tree.append_child(block, leaf)?;
    Ok(())
}

/// Fill in `row`/`col` attributes that the markup left out, from the grid
/// position of each cell. Spans of earlier rows are not taken into account.
fn assign_missing_coordinates(tree: &mut DocumentTree) -> Result<()> {
    let tables: Vec<NodeId> = tree
        .descendants(tree.root())
        .into_iter()
        .filter(|&id| tree.kind(id) == Some(NodeKind::Table))
        .collect();

    for table in tables {
        let mut previous: Option<usize> = None;
        for row in table_rows(tree, table) {
            let cells = row_cells(tree, row);
            let row_value = tree
                .attrs(row)
                .and_then(|a| a.row)
                .or_else(|| cells.iter().find_map(|&c| tree.attrs(c).and_then(|a| a.row)))
                .unwrap_or_else(|| previous.map_or(0, |p| p + 1));

            let mut row_attrs = tree.attrs(row).copied().unwrap_or_default();
            if row_attrs.row.is_none() {
                row_attrs.row = Some(row_value);
                tree.set_attrs(row, row_attrs)?;
            }

            let mut next_col = 0;
            for cell in cells {
                let mut attrs = tree.attrs(cell).copied().unwrap_or_default();
                let col = attrs.col.unwrap_or(next_col);
                if attrs.row.is_none() || attrs.col.is_none() {
                    attrs.row = attrs.row.or(Some(row_value));
                    attrs.col = Some(col);
                    tree.set_attrs(cell, attrs)?;
                }
                next_col = col + attrs.colspan();
            }
            previous = Some(row_value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{all_cells, check_coordinates, table_dimensions};

    fn span_tuples(tree: &DocumentTree) -> Vec<(usize, usize, usize, usize)> {
        let mut tuples: Vec<_> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|&id| tree.kind(id) == Some(NodeKind::Table))
            .flat_map(|table| all_cells(tree, table))
            .filter_map(|cell| {
                let a = tree.attrs(cell)?;
                Some((a.row?, a.col?, a.colspan(), a.rowspan()))
            })
            .collect();
        tuples.sort_unstable();
        tuples
    }

    fn first_table(tree: &DocumentTree) -> NodeId {
        tree.descendants(tree.root())
            .into_iter()
            .find(|&id| tree.kind(id) == Some(NodeKind::Table))
            .unwrap()
    }

    #[test]
    fn test_writes_expected_markup() {
        let registry = NodeRegistry::new();
        let html = "<p>hi</p><table><tbody><tr data-row=\"0\">\
                    <td data-row=\"0\" data-col=\"0\"><p><br/></p></td>\
                    <td data-row=\"0\" data-col=\"1\"><p>a &amp; b</p></td>\
                    </tr></tbody></table><p><br/></p>";
        let tree = from_html(html, &registry).unwrap();
        assert_eq!(to_html(&tree, &registry).unwrap(), html);
    }

    #[test]
    fn test_round_trip_preserves_spans() {
        let registry = NodeRegistry::new();
        let html = "<table><tbody>\
            <tr data-row=\"0\"><td data-row=\"0\" data-col=\"0\" colspan=\"2\"><p>wide</p></td>\
            <td data-row=\"0\" data-col=\"2\" rowspan=\"2\"><p>tall</p></td></tr>\
            <tr data-row=\"1\"><td data-row=\"1\" data-col=\"0\"><p>x</p></td>\
            <td data-row=\"1\" data-col=\"1\"><p>y</p></td></tr>\
            </tbody></table>";
        let tree = from_html(html, &registry).unwrap();
        let expected = vec![(0, 0, 2, 1), (0, 2, 1, 2), (1, 0, 1, 1), (1, 1, 1, 1)];
        assert_eq!(span_tuples(&tree), expected);

        let again = from_html(&to_html(&tree, &registry).unwrap(), &registry).unwrap();
        assert_eq!(span_tuples(&again), expected);
        assert_eq!(check_coordinates(&again, first_table(&again)), Ok(()));
    }

    #[test]
    fn test_lenient_markup() {
        let registry = NodeRegistry::new();
        let html = "<p>a<br>b<strong>c</strong></p>\
                    <table><tr><td>x</td><th>&nbsp;y</th></tr>\
                    <tr><td><p>1</p><p>2</p></td><td></td></tr></table>";
        let tree = from_html(html, &registry).unwrap();
        assert_eq!(
            tree.text_content(tree.root()),
            "abc\nx\n\u{a0}y\n1\n2\n\n"
        );

        let table = first_table(&tree);
        assert_eq!(table_dimensions(&tree, table), (2, 2));
        assert_eq!(check_coordinates(&tree, table), Ok(()));
        assert_eq!(tree.child_ids(table).len(), 1);
    }

    #[test]
    fn test_empty_input_gives_one_empty_line() {
        let registry = NodeRegistry::new();
        let tree = from_html("", &registry).unwrap();
        assert_eq!(tree.document_length(), 1);
        assert_eq!(to_html(&tree, &registry).unwrap(), "<p><br/></p>");
    }

    #[test]
    fn test_nested_table_is_rejected() {
        let registry = NodeRegistry::new();
        let html = "<table><tr><td><table><tr><td>x</td></tr></table></td></tr></table>";
        assert!(matches!(
            from_html(html, &registry),
            Err(ModelError::Html(_))
        ));
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        let registry = NodeRegistry::new();
        assert!(from_html("<p>a</p><td data-row=\"0", &registry).is_err());
    }

    #[test]
    fn test_text_is_escaped() {
        let registry = NodeRegistry::new();
        let mut tree = DocumentTree::with_empty_paragraph();
        tree.insert_text(0, "<b> & co").unwrap();
        let html = to_html(&tree, &registry).unwrap();
        assert_eq!(html, "<p>&lt;b&gt; &amp; co</p>");
        let parsed = from_html(&html, &registry).unwrap();
        assert_eq!(parsed.text_content(parsed.root()), "<b> & co\n");
    }
}
