//! Table editing commands
//!
//! This module implements the structural edits on the table under the cursor:
//! - insert_table: Create a new table after the cursor's line
//! - insert_row_above/insert_row_below: Add rows
//! - insert_column_left/insert_column_right: Add columns
//! - delete_row/delete_column/delete_table: Remove table elements
//!
//! Every edit runs with history suspended and forces a re-render before
//! history resumes. A cursor outside a table makes an edit a no-op
//! ([`EditOutcome::NotApplicable`]) rather than an error.
//!
//! Rows are renumbered when a row is inserted but not when one is deleted, so
//! `row` values may have gaps. Rows are therefore located by their `row`
//! value only for splicing and by rank everywhere else.

use crate::{ChangeSource, EditorHost, HistoryGuard, Result, TableError};
use serde::{Deserialize, Serialize};
use table_model::{
    all_cells, cell_at, cell_position, find_table_anchor, row_cells, table_body,
    table_dimensions, table_rows, Attributes, CellGrid, DocumentTree, NodeId, NodeKind,
    TableAnchor,
};

/// Result of a table command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The document changed
    Applied,
    /// The cursor was not somewhere the command applies; nothing changed
    NotApplicable,
}

impl EditOutcome {
    pub fn is_applied(self) -> bool {
        self == EditOutcome::Applied
    }
}

/// The cell under the cursor
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellContext {
    pub table: NodeId,
    pub row: NodeId,
    pub cell: NodeId,
    /// The cell's `row` attribute
    pub row_value: usize,
    pub col: usize,
    /// Flat cursor index
    pub cursor: usize,
}

/// Resolve the table (and cell) holding the cursor
pub(crate) fn current_anchor<H: EditorHost + ?Sized>(host: &H) -> Option<(TableAnchor, usize)> {
    let index = host.selection_index()?;
    let (leaf, _) = host.leaf_and_offset_at(index)?;
    let anchor = find_table_anchor(host.tree(), leaf)?;
    Some((anchor, index))
}

pub(crate) fn current_cell<H: EditorHost + ?Sized>(host: &H) -> Option<CellContext> {
    let (anchor, cursor) = current_anchor(host)?;
    let TableAnchor::Cell { table, cell } = anchor else {
        return None;
    };
    let tree = host.tree();
    let row = tree
        .get(cell)?
        .parent()
        .filter(|&r| tree.kind(r) == Some(NodeKind::Row))?;
    let (row_value, col) = cell_position(tree, cell)?;
    Some(CellContext {
        table,
        row,
        cell,
        row_value,
        col,
        cursor,
    })
}

/// A row's `row` value, read from its cells when the row itself has none
pub(crate) fn row_value(tree: &DocumentTree, row: NodeId) -> Option<usize> {
    tree.attrs(row).and_then(|a| a.row).or_else(|| {
        row_cells(tree, row)
            .into_iter()
            .find_map(|c| tree.attrs(c).and_then(|a| a.row))
    })
}

/// Create a detached cell holding one empty block
fn create_cell<H: EditorHost + ?Sized>(host: &mut H, attrs: Attributes) -> Result<NodeId> {
    let cell = host.create_node(NodeKind::Cell, attrs);
    let block = host.create_node(NodeKind::CellBlock, Attributes::none());
    host.tree_mut().append_child(cell, block)?;
    Ok(cell)
}

fn update_attrs(
    tree: &mut DocumentTree,
    id: NodeId,
    update: impl FnOnce(&mut Attributes),
) -> Result<()> {
    let mut attrs = tree.attrs(id).copied().unwrap_or_default();
    update(&mut attrs);
    tree.set_attrs(id, attrs)?;
    Ok(())
}

/// Caret offset of the cursor from the start of its cell
fn offset_in_cell<H: EditorHost + ?Sized>(host: &H, ctx: &CellContext) -> usize {
    host.index_of(ctx.cell)
        .map_or(0, |start| ctx.cursor.saturating_sub(start))
}

/// Put the caret back at the same offset inside a cell that survived an edit
fn restore_cursor<H: EditorHost + ?Sized>(host: &mut H, cell: NodeId, offset: usize) {
    if let Some(start) = host.index_of(cell) {
        host.set_selection(start + offset, 0);
    }
}

/// Put the caret at `prior`, or on the last line when the document shrank
fn clamp_cursor<H: EditorHost + ?Sized>(host: &mut H, prior: usize) {
    let last = host.tree().document_length().saturating_sub(1);
    host.set_selection(prior.min(last), 0);
}

fn not_in_cell(operation: &str) -> Result<EditOutcome> {
    tracing::trace!(operation, "cursor is not inside a table cell");
    Ok(EditOutcome::NotApplicable)
}

// =============================================================================
// Insert Table
// =============================================================================

/// Insert a `rows × cols` table after the cursor's line and put the cursor in
/// its first cell
pub fn insert_table<H: EditorHost + ?Sized>(
    host: &mut H,
    rows: usize,
    cols: usize,
) -> Result<EditOutcome> {
    let config = host.config();
    if !config.accepts_dimensions(rows, cols) {
        return Err(TableError::InvalidDimensions {
            rows,
            cols,
            max_rows: config.max_rows,
            max_cols: config.max_cols,
        });
    }
    let Some(index) = host.selection_index() else {
        tracing::trace!("insert_table without a cursor");
        return Ok(EditOutcome::NotApplicable);
    };
    let Some((leaf, _)) = host.leaf_and_offset_at(index) else {
        return Ok(EditOutcome::NotApplicable);
    };
    if find_table_anchor(host.tree(), leaf).is_some() {
        return Err(TableError::NestedTable);
    }

    let tree = host.tree();
    let root = tree.root();
    let Some(line) = std::iter::once(leaf)
        .chain(tree.ancestors(leaf))
        .find(|&id| tree.get(id).and_then(|n| n.parent()) == Some(root))
    else {
        return Ok(EditOutcome::NotApplicable);
    };
    let after = tree.get(line).and_then(|n| n.next());

    let mut host = HistoryGuard::new(host);
    let table = host.create_node(NodeKind::Table, Attributes::none());
    let body = host.create_node(NodeKind::Body, Attributes::none());
    host.tree_mut().append_child(table, body)?;
    for r in 0..rows {
        let row = host.create_node(NodeKind::Row, Attributes::row(r));
        host.tree_mut().append_child(body, row)?;
        for c in 0..cols {
            let cell = create_cell(&mut *host, Attributes::cell(r, c))?;
            host.tree_mut().append_child(row, cell)?;
        }
    }
    host.tree_mut().insert_before(root, table, after)?;
    if after.is_none() {
        // Keep a line after the table for the caret to reach
        let para = host.create_node(NodeKind::Paragraph, Attributes::none());
        host.tree_mut().append_child(root, para)?;
    }

    host.force_rerender(ChangeSource::User)?;
    let first_block = cell_at(host.tree(), table, 0, 0)
        .and_then(|cell| host.tree().get(cell).and_then(|n| n.first_child()));
    if let Some(start) = first_block.and_then(|block| host.index_of(block)) {
        host.set_selection(start, 0);
    }
    tracing::debug!(operation = "insert_table", rows, cols, "table inserted");
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Insert Row
// =============================================================================

/// Insert a row above the cursor's row
pub fn insert_row_above<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    insert_row(host, false)
}

/// Insert a row below the cursor's row
pub fn insert_row_below<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    insert_row(host, true)
}

fn insert_row<H: EditorHost + ?Sized>(host: &mut H, below: bool) -> Result<EditOutcome> {
    let operation = if below {
        "insert_row_below"
    } else {
        "insert_row_above"
    };
    let Some(ctx) = current_cell(host) else {
        return not_in_cell(operation);
    };

    let tree = host.tree();
    let Some(body) = table_body(tree, ctx.table) else {
        return not_in_cell(operation);
    };
    let before = table_dimensions(tree, ctx.table);
    let grid = CellGrid::build(tree, ctx.table);
    let rows = table_rows(tree, ctx.table);
    let Some(own_rank) = grid.rank_of(ctx.row) else {
        return not_in_cell(operation);
    };
    // Below a cell means below every row it spans
    let (rank, target) = if below {
        let rowspan = tree.attrs(ctx.cell).map_or(1, |a| a.rowspan());
        let last = (own_rank + rowspan).min(rows.len()) - 1;
        let last_value = row_value(tree, rows[last]).unwrap_or(ctx.row_value);
        (last + 1, last_value + 1)
    } else {
        (own_rank, ctx.row_value)
    };

    // Cells spanning across the new row grow instead of getting a neighbour
    let mut stretched: Vec<NodeId> = Vec::new();
    let mut new_cells: Vec<(usize, usize)> = Vec::new();
    for col in 0..grid.width() {
        let above = rank.checked_sub(1).and_then(|r| grid.at(r, col));
        let under = grid.at(rank, col);
        if let (Some(a), Some(u)) = (above, under) {
            if a == u {
                if !stretched.contains(&a) {
                    stretched.push(a);
                }
                continue;
            }
        }
        match under.or(above) {
            Some(anchor) => {
                if grid.origin(anchor).is_some_and(|(_, c)| c == col) {
                    let colspan = tree.attrs(anchor).map_or(1, |a| a.colspan());
                    new_cells.push((col, colspan));
                }
            }
            None => new_cells.push((col, 1)),
        }
    }
    if new_cells.is_empty() {
        tracing::trace!(operation, "every column spans the insertion point");
        return Ok(EditOutcome::NotApplicable);
    }

    let offset = offset_in_cell(host, &ctx);
    let mut host = HistoryGuard::new(host);
    let tree = host.tree_mut();
    for cell in all_cells(tree, ctx.table) {
        if tree.attrs(cell).and_then(|a| a.row).is_some_and(|r| r >= target) {
            update_attrs(tree, cell, |a| a.row = a.row.map(|r| r + 1))?;
        }
    }
    for &row in &rows {
        if tree.attrs(row).and_then(|a| a.row).is_some_and(|r| r >= target) {
            update_attrs(tree, row, |a| a.row = a.row.map(|r| r + 1))?;
        }
    }
    for cell in stretched {
        update_attrs(tree, cell, |a| *a = a.with_rowspan(a.rowspan() + 1))?;
    }

    let new_row = host.create_node(NodeKind::Row, Attributes::row(target));
    for (col, colspan) in new_cells {
        let cell = create_cell(&mut *host, Attributes::cell(target, col).with_colspan(colspan))?;
        host.tree_mut().append_child(new_row, cell)?;
    }
    let tree = host.tree_mut();
    let reference = table_rows(tree, ctx.table)
        .into_iter()
        .find(|&r| row_value(tree, r).is_some_and(|v| v > target));
    tree.insert_before(body, new_row, reference)?;

    host.force_rerender(ChangeSource::User)?;
    restore_cursor(&mut *host, ctx.cell, offset);
    let after = table_dimensions(host.tree(), ctx.table);
    tracing::debug!(
        operation,
        rows_before = before.0,
        rows_after = after.0,
        cols = after.1,
        "table row inserted"
    );
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Insert Column
// =============================================================================

/// Insert a column left of the cursor's cell
pub fn insert_column_left<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    insert_column(host, false)
}

/// Insert a column right of the cursor's cell
pub fn insert_column_right<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    insert_column(host, true)
}

fn insert_column<H: EditorHost + ?Sized>(host: &mut H, right: bool) -> Result<EditOutcome> {
    let operation = if right {
        "insert_column_right"
    } else {
        "insert_column_left"
    };
    let Some(ctx) = current_cell(host) else {
        return not_in_cell(operation);
    };

    let tree = host.tree();
    let target = if right {
        ctx.col + tree.attrs(ctx.cell).map_or(1, |a| a.colspan())
    } else {
        ctx.col
    };
    let before = table_dimensions(tree, ctx.table);
    let grid = CellGrid::build(tree, ctx.table);

    let mut stretched: Vec<NodeId> = Vec::new();
    let mut new_cells: Vec<(NodeId, usize, usize)> = Vec::new();
    for rank in 0..grid.height() {
        let Some(row) = grid.row(rank) else { continue };
        let left = target.checked_sub(1).and_then(|c| grid.at(rank, c));
        let right_of = grid.at(rank, target);
        if let (Some(l), Some(r)) = (left, right_of) {
            if l == r {
                if !stretched.contains(&l) {
                    stretched.push(l);
                }
                continue;
            }
        }
        let row_val = row_value(tree, row).unwrap_or(rank);
        match right_of.or(left) {
            Some(anchor) => {
                if grid.origin(anchor).is_some_and(|(r, _)| r == rank) {
                    let rowspan = tree.attrs(anchor).map_or(1, |a| a.rowspan());
                    new_cells.push((row, row_val, rowspan));
                }
            }
            None => new_cells.push((row, row_val, 1)),
        }
    }

    let offset = offset_in_cell(host, &ctx);
    let mut host = HistoryGuard::new(host);
    let tree = host.tree_mut();
    for cell in all_cells(tree, ctx.table) {
        if tree.attrs(cell).and_then(|a| a.col).is_some_and(|c| c >= target) {
            update_attrs(tree, cell, |a| a.col = a.col.map(|c| c + 1))?;
        }
    }
    for cell in stretched {
        update_attrs(tree, cell, |a| *a = a.with_colspan(a.colspan() + 1))?;
    }

    for (row, row_val, rowspan) in new_cells {
        let cell = create_cell(&mut *host, Attributes::cell(row_val, target).with_rowspan(rowspan))?;
        let tree = host.tree_mut();
        let reference = row_cells(tree, row)
            .into_iter()
            .find(|&c| tree.attrs(c).and_then(|a| a.col).is_some_and(|col| col > target));
        tree.insert_before(row, cell, reference)?;
    }

    host.force_rerender(ChangeSource::User)?;
    restore_cursor(&mut *host, ctx.cell, offset);
    let after = table_dimensions(host.tree(), ctx.table);
    tracing::debug!(
        operation,
        cols_before = before.1,
        cols_after = after.1,
        rows = after.0,
        "table column inserted"
    );
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Delete Row / Column / Table
// =============================================================================

/// Delete the cursor's row; a table with a single row is deleted entirely.
///
/// The `row` values of the remaining rows are left as they are.
pub fn delete_row<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    let Some(ctx) = current_cell(host) else {
        return not_in_cell("delete_row");
    };
    let tree = host.tree();
    if table_rows(tree, ctx.table).len() <= 1 {
        return remove_table(host, ctx.table, "delete_row");
    }
    let before = table_dimensions(tree, ctx.table);
    let grid = CellGrid::build(tree, ctx.table);
    let Some(rank) = grid.rank_of(ctx.row) else {
        return not_in_cell("delete_row");
    };
    let next_row = grid.row(rank + 1);

    // Cells from rows above that span into the deleted row
    let mut shrunk: Vec<NodeId> = Vec::new();
    for col in 0..grid.width() {
        if let Some(cell) = grid.at(rank, col) {
            if grid.origin(cell).is_some_and(|(r, _)| r < rank) && !shrunk.contains(&cell) {
                shrunk.push(cell);
            }
        }
    }

    let mut host = HistoryGuard::new(host);
    let tree = host.tree_mut();
    for cell in shrunk {
        update_attrs(tree, cell, |a| *a = a.with_rowspan(a.rowspan() - 1))?;
    }
    // Cells of the deleted row that span further down move to the next row
    if let Some(next) = next_row {
        let next_val = row_value(tree, next);
        for cell in row_cells(tree, ctx.row) {
            let attrs = tree.attrs(cell).copied().unwrap_or_default();
            if attrs.rowspan() <= 1 {
                continue;
            }
            tree.detach(cell)?;
            update_attrs(tree, cell, |a| {
                a.row = next_val.or(a.row);
                *a = a.with_rowspan(a.rowspan() - 1);
            })?;
            let own_col = attrs.col.unwrap_or(0);
            let reference = row_cells(tree, next).into_iter().find(|&other| {
                tree.attrs(other)
                    .and_then(|a| a.col)
                    .is_some_and(|col| col > own_col)
            });
            tree.insert_before(next, cell, reference)?;
        }
    }
    tree.remove(ctx.row)?;

    host.force_rerender(ChangeSource::User)?;
    clamp_cursor(&mut *host, ctx.cursor);
    let after = table_dimensions(host.tree(), ctx.table);
    tracing::debug!(
        operation = "delete_row",
        rows_before = before.0,
        rows_after = after.0,
        cols = after.1,
        "table row deleted"
    );
    Ok(EditOutcome::Applied)
}

/// Delete the cursor's column; a table with a single column is deleted
/// entirely. Columns to the right shift left by one, and rows left without
/// cells of their own are removed.
pub fn delete_column<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    let Some(ctx) = current_cell(host) else {
        return not_in_cell("delete_column");
    };
    let before = table_dimensions(host.tree(), ctx.table);
    if before.1 <= 1 {
        return remove_table(host, ctx.table, "delete_column");
    }
    let target = ctx.col;

    // Rows whose own cells all go away disappear with the column, so cells
    // spanning down through them lose one row per emptied row
    let tree = host.tree();
    let grid = CellGrid::build(tree, ctx.table);
    let emptied: Vec<usize> = (0..grid.height())
        .filter(|&rank| {
            grid.row(rank).is_some_and(|row| {
                row_cells(tree, row)
                    .into_iter()
                    .all(|cell| removed_with_column(tree, cell, target))
            })
        })
        .collect();
    if emptied.len() == grid.height() {
        return remove_table(host, ctx.table, "delete_column");
    }
    let mut shrunk: Vec<NodeId> = Vec::new();
    for &rank in &emptied {
        let mut crossing: Vec<NodeId> = Vec::new();
        for col in 0..grid.width() {
            let Some(cell) = grid.at(rank, col) else { continue };
            if !crossing.contains(&cell) && !removed_with_column(tree, cell, target) {
                crossing.push(cell);
            }
        }
        shrunk.extend(crossing);
    }
    let emptied_rows: Vec<NodeId> = emptied.iter().filter_map(|&rank| grid.row(rank)).collect();

    let mut host = HistoryGuard::new(host);
    let tree = host.tree_mut();
    for cell in all_cells(tree, ctx.table) {
        let attrs = tree.attrs(cell).copied().unwrap_or_default();
        let Some(col) = attrs.col else { continue };
        let colspan = attrs.colspan();
        if removed_with_column(tree, cell, target) {
            tree.remove(cell)?;
        } else if col <= target && target < col + colspan {
            update_attrs(tree, cell, |a| *a = a.with_colspan(colspan - 1))?;
        } else if col > target {
            update_attrs(tree, cell, |a| a.col = Some(col - 1))?;
        }
    }
    for cell in shrunk {
        update_attrs(tree, cell, |a| *a = a.with_rowspan(a.rowspan() - 1))?;
    }
    for row in emptied_rows {
        tree.remove(row)?;
    }

    host.force_rerender(ChangeSource::User)?;
    clamp_cursor(&mut *host, ctx.cursor);
    let after = table_dimensions(host.tree(), ctx.table);
    tracing::debug!(
        operation = "delete_column",
        cols_before = before.1,
        cols_after = after.1,
        rows = after.0,
        "table column deleted"
    );
    Ok(EditOutcome::Applied)
}

/// Whether deleting column `target` removes `cell` outright
fn removed_with_column(tree: &DocumentTree, cell: NodeId, target: usize) -> bool {
    tree.attrs(cell)
        .is_some_and(|a| a.col == Some(target) && a.colspan() <= 1)
}

/// Delete the table holding the cursor
pub fn delete_table<H: EditorHost + ?Sized>(host: &mut H) -> Result<EditOutcome> {
    let Some((anchor, _)) = current_anchor(host) else {
        tracing::trace!(operation = "delete_table", "cursor is not inside a table");
        return Ok(EditOutcome::NotApplicable);
    };
    remove_table(host, anchor.table(), "delete_table")
}

/// Remove a table with one range deletion over its full length
fn remove_table<H: EditorHost + ?Sized>(
    host: &mut H,
    table: NodeId,
    operation: &str,
) -> Result<EditOutcome> {
    let Some(index) = host.index_of(table) else {
        return Ok(EditOutcome::NotApplicable);
    };
    let length = host.tree().length(table);
    let dimensions = table_dimensions(host.tree(), table);

    let mut host = HistoryGuard::new(host);
    host.delete_range(index, length)?;
    host.force_rerender(ChangeSource::User)?;
    clamp_cursor(&mut *host, index);
    tracing::debug!(
        operation,
        rows = dimensions.0,
        cols = dimensions.1,
        "table deleted"
    );
    Ok(EditOutcome::Applied)
}

// =============================================================================
// Command Values
// =============================================================================

/// A table edit as a value, for dispatch from menus and toolbars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableCommand {
    InsertTable { rows: usize, cols: usize },
    InsertRowAbove,
    InsertRowBelow,
    InsertColumnLeft,
    InsertColumnRight,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
}

impl TableCommand {
    /// Run this command against the host's cursor
    pub fn apply<H: EditorHost + ?Sized>(&self, host: &mut H) -> Result<EditOutcome> {
        match *self {
            TableCommand::InsertTable { rows, cols } => insert_table(host, rows, cols),
            TableCommand::InsertRowAbove => insert_row_above(host),
            TableCommand::InsertRowBelow => insert_row_below(host),
            TableCommand::InsertColumnLeft => insert_column_left(host),
            TableCommand::InsertColumnRight => insert_column_right(host),
            TableCommand::DeleteRow => delete_row(host),
            TableCommand::DeleteColumn => delete_column(host),
            TableCommand::DeleteTable => delete_table(host),
        }
    }

    /// Get a display name for this command
    pub fn display_name(&self) -> &'static str {
        match self {
            TableCommand::InsertTable { .. } => "Insert Table",
            TableCommand::InsertRowAbove => "Insert Row Above",
            TableCommand::InsertRowBelow => "Insert Row Below",
            TableCommand::InsertColumnLeft => "Insert Column Left",
            TableCommand::InsertColumnRight => "Insert Column Right",
            TableCommand::DeleteRow => "Delete Row",
            TableCommand::DeleteColumn => "Delete Column",
            TableCommand::DeleteTable => "Delete Table",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Editor;
    use table_model::check_coordinates;

    fn editor_with_table(rows: usize, cols: usize) -> Editor {
        let mut editor = Editor::new();
        editor.set_selection(0, 0);
        assert_eq!(insert_table(&mut editor, rows, cols).unwrap(), EditOutcome::Applied);
        editor
    }

    fn only_table(editor: &Editor) -> NodeId {
        let tree = editor.tree();
        tree.child_ids(tree.root())
            .into_iter()
            .find(|&id| tree.kind(id) == Some(NodeKind::Table))
            .unwrap()
    }

    fn put_cursor_in(editor: &mut Editor, row: usize, col: usize) {
        let table = only_table(editor);
        let cell = cell_at(editor.tree(), table, row, col).unwrap();
        let index = editor.index_of(cell).unwrap();
        editor.set_selection(index, 0);
    }

    fn cursor_cell(editor: &Editor) -> Option<(usize, usize)> {
        current_cell(editor).map(|ctx| (ctx.row_value, ctx.col))
    }

    #[test]
    fn test_insert_table() {
        let editor = editor_with_table(2, 3);
        let tree = editor.tree();
        let table = only_table(&editor);

        assert_eq!(table_dimensions(tree, table), (2, 3));
        assert_eq!(tree.child_ids(table).len(), 1);
        assert_eq!(table_rows(tree, table).len(), 2);
        assert_eq!(all_cells(tree, table).len(), 6);
        assert_eq!(check_coordinates(tree, table), Ok(()));
        assert_eq!(cursor_cell(&editor), Some((0, 0)));
        // Leading line, six empty cells, trailing line
        assert_eq!(editor.text(), "\n".repeat(8));
        assert!(!editor.history().is_suspended());
    }

    #[test]
    fn test_insert_table_rejects_bad_dimensions() {
        let mut editor = Editor::new();
        editor.set_selection(0, 0);
        assert!(matches!(
            insert_table(&mut editor, 0, 2),
            Err(TableError::InvalidDimensions { rows: 0, cols: 2, .. })
        ));
        assert!(matches!(
            insert_table(&mut editor, 2, 21),
            Err(TableError::InvalidDimensions { .. })
        ));
        assert_eq!(editor.text(), "\n");
    }

    #[test]
    fn test_insert_table_inside_table_is_rejected() {
        let mut editor = editor_with_table(1, 1);
        assert!(matches!(
            insert_table(&mut editor, 2, 2),
            Err(TableError::NestedTable)
        ));
    }

    #[test]
    fn test_insert_table_between_lines() {
        let mut editor = Editor::new();
        editor.insert_text(0, "ab").unwrap();
        editor.set_selection(1, 0);
        insert_table(&mut editor, 1, 1).unwrap();
        assert_eq!(editor.text(), "ab\n\n\n");

        // A second table after the first line goes before the existing one
        editor.set_selection(0, 0);
        insert_table(&mut editor, 1, 2).unwrap();
        assert_eq!(editor.text(), "ab\n\n\n\n\n");
        let kinds: Vec<_> = editor
            .tree()
            .child_ids(editor.tree().root())
            .into_iter()
            .filter_map(|id| editor.tree().kind(id))
            .collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Paragraph, NodeKind::Table, NodeKind::Table, NodeKind::Paragraph]
        );
    }

    #[test]
    fn test_insert_without_focus_is_not_applicable() {
        let mut editor = Editor::new();
        assert_eq!(
            insert_table(&mut editor, 2, 2).unwrap(),
            EditOutcome::NotApplicable
        );
    }

    #[test]
    fn test_insert_row_above() {
        let mut editor = editor_with_table(3, 2);
        put_cursor_in(&mut editor, 1, 1);
        editor.insert_text(editor.selection().unwrap().index, "x").unwrap();

        assert!(insert_row_above(&mut editor).unwrap().is_applied());
        let tree = editor.tree();
        let table = only_table(&editor);
        assert_eq!(table_dimensions(tree, table), (4, 2));
        assert_eq!(check_coordinates(tree, table), Ok(()));

        let values: Vec<_> = table_rows(tree, table)
            .into_iter()
            .map(|r| tree.attrs(r).unwrap().row)
            .collect();
        assert_eq!(values, vec![Some(0), Some(1), Some(2), Some(3)]);
        let new_row = table_rows(tree, table)[1];
        assert_eq!(row_cells(tree, new_row).len(), 2);
        assert_eq!(tree.text_content(new_row), "\n\n");

        // The cursor stays in the cell it was in, now at (2, 1)
        assert_eq!(cursor_cell(&editor), Some((2, 1)));
        let cell = cell_at(tree, table, 2, 1).unwrap();
        assert_eq!(tree.text_content(cell), "x\n");
        assert_eq!(editor.selection().unwrap().index, editor.index_of(cell).unwrap() + 1);
    }

    #[test]
    fn test_insert_row_below_last_row() {
        let mut editor = editor_with_table(2, 2);
        put_cursor_in(&mut editor, 1, 0);
        insert_row_below(&mut editor).unwrap();

        let tree = editor.tree();
        let table = only_table(&editor);
        assert_eq!(table_dimensions(tree, table), (3, 2));
        let last = *table_rows(tree, table).last().unwrap();
        assert_eq!(tree.attrs(last).unwrap().row, Some(2));
        assert_eq!(cursor_cell(&editor), Some((1, 0)));
        assert_eq!(editor.renders().last(), Some(&ChangeSource::User));
    }

    #[test]
    fn test_insert_column_left_and_right() {
        let mut editor = editor_with_table(2, 2);
        put_cursor_in(&mut editor, 0, 1);

        insert_column_left(&mut editor).unwrap();
        let table = only_table(&editor);
        assert_eq!(table_dimensions(editor.tree(), table), (2, 3));
        assert_eq!(cursor_cell(&editor), Some((0, 2)));

        insert_column_right(&mut editor).unwrap();
        let tree = editor.tree();
        assert_eq!(table_dimensions(tree, table), (2, 4));
        assert_eq!(check_coordinates(tree, table), Ok(()));
        for row in table_rows(tree, table) {
            let cols: Vec<_> = row_cells(tree, row)
                .into_iter()
                .map(|c| tree.attrs(c).unwrap().col.unwrap())
                .collect();
            assert_eq!(cols, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_delete_row_keeps_row_values() {
        let mut editor = editor_with_table(3, 2);
        put_cursor_in(&mut editor, 1, 0);
        let prior = editor.selection().unwrap().index;

        assert!(delete_row(&mut editor).unwrap().is_applied());
        let tree = editor.tree();
        let table = only_table(&editor);
        let values: Vec<_> = table_rows(tree, table)
            .into_iter()
            .map(|r| tree.attrs(r).unwrap().row)
            .collect();
        assert_eq!(values, vec![Some(0), Some(2)]);
        assert_eq!(check_coordinates(tree, table), Ok(()));
        assert_eq!(editor.selection().unwrap().index, prior);
        assert_eq!(editor.history().depth(), 0);
    }

    #[test]
    fn test_delete_only_row_deletes_table() {
        let mut editor = editor_with_table(1, 3);
        delete_row(&mut editor).unwrap();
        assert_eq!(editor.text(), "\n\n");
        assert!(editor
            .tree()
            .descendants(editor.tree().root())
            .iter()
            .all(|&id| editor.tree().kind(id) != Some(NodeKind::Table)));
    }

    #[test]
    fn test_delete_column_renumbers() {
        let mut editor = editor_with_table(2, 3);
        put_cursor_in(&mut editor, 1, 1);
        delete_column(&mut editor).unwrap();

        let tree = editor.tree();
        let table = only_table(&editor);
        assert_eq!(table_dimensions(tree, table), (2, 2));
        assert_eq!(check_coordinates(tree, table), Ok(()));
    }

    #[test]
    fn test_delete_column_of_single_cell_table() {
        let mut editor = editor_with_table(1, 1);
        assert!(delete_column(&mut editor).unwrap().is_applied());
        assert_eq!(editor.text(), "\n\n");
        assert_eq!(editor.selection().unwrap().index, 1);
    }

    #[test]
    fn test_delete_table_between_paragraphs_does_not_merge_them() {
        let mut editor = Editor::new();
        editor.insert_text(0, "ab").unwrap();
        editor.set_selection(0, 0);
        insert_table(&mut editor, 2, 2).unwrap();
        editor.insert_text(editor.selection().unwrap().index, "cell").unwrap();
        delete_table(&mut editor).unwrap();
        assert_eq!(editor.text(), "ab\n\n");
    }

    #[test]
    fn test_commands_outside_table_are_no_ops() {
        let mut editor = Editor::new();
        editor.set_selection(0, 0);
        let commands = [
            TableCommand::InsertRowAbove,
            TableCommand::InsertRowBelow,
            TableCommand::InsertColumnLeft,
            TableCommand::InsertColumnRight,
            TableCommand::DeleteRow,
            TableCommand::DeleteColumn,
            TableCommand::DeleteTable,
        ];
        for command in commands {
            assert_eq!(command.apply(&mut editor).unwrap(), EditOutcome::NotApplicable);
        }
        assert_eq!(editor.text(), "\n");
        assert!(editor.renders().is_empty());
    }

    #[test]
    fn test_structural_edits_are_not_recorded() {
        let mut editor = editor_with_table(2, 2);
        insert_row_below(&mut editor).unwrap();
        insert_column_right(&mut editor).unwrap();
        delete_row(&mut editor).unwrap();
        delete_table(&mut editor).unwrap();
        assert_eq!(editor.history().recorded(), 0);
        assert!(!editor.history().is_suspended());
    }

    #[test]
    fn test_spanning_cell_grows_on_row_insert() {
        let html = "<table><tbody>\
            <tr data-row=\"0\"><td data-row=\"0\" data-col=\"0\" rowspan=\"2\"><p>a</p></td>\
            <td data-row=\"0\" data-col=\"1\"><p>b</p></td></tr>\
            <tr data-row=\"1\"><td data-row=\"1\" data-col=\"1\"><p>c</p></td></tr>\
            </tbody></table>";
        let mut editor = Editor::from_html(html, Default::default()).unwrap();
        put_cursor_in(&mut editor, 1, 1);
        insert_row_above(&mut editor).unwrap();

        let tree = editor.tree();
        let table = only_table(&editor);
        let tall = cell_at(tree, table, 0, 0).unwrap();
        assert_eq!(tree.attrs(tall).unwrap().rowspan(), 3);
        assert_eq!(check_coordinates(tree, table), Ok(()));
        assert_eq!(row_cells(tree, table_rows(tree, table)[1]).len(), 1);
    }

    const TALL_FIRST_COLUMN: &str = "<table><tbody>\
        <tr data-row=\"0\"><td data-row=\"0\" data-col=\"0\" rowspan=\"2\"><p>a</p></td>\
        <td data-row=\"0\" data-col=\"1\"><p>b</p></td></tr>\
        <tr data-row=\"1\"><td data-row=\"1\" data-col=\"1\"><p>c</p></td></tr>\
        </tbody></table>";

    #[test]
    fn test_insert_row_below_spanning_cell_goes_under_its_span() {
        let mut editor = Editor::from_html(TALL_FIRST_COLUMN, Default::default()).unwrap();
        put_cursor_in(&mut editor, 0, 0);
        assert!(insert_row_below(&mut editor).unwrap().is_applied());

        let tree = editor.tree();
        let table = only_table(&editor);
        let tall = cell_at(tree, table, 0, 0).unwrap();
        assert_eq!(tree.attrs(tall).unwrap().rowspan(), 2);
        assert_eq!(table_dimensions(tree, table), (3, 2));
        let last = *table_rows(tree, table).last().unwrap();
        assert_eq!(tree.attrs(last).unwrap().row, Some(2));
        assert_eq!(row_cells(tree, last).len(), 2);
        assert_eq!(check_coordinates(tree, table), Ok(()));
        assert_eq!(cursor_cell(&editor), Some((0, 0)));
    }

    #[test]
    fn test_delete_column_drops_rows_left_without_cells() {
        let mut editor = Editor::from_html(TALL_FIRST_COLUMN, Default::default()).unwrap();
        put_cursor_in(&mut editor, 1, 1);
        assert!(delete_column(&mut editor).unwrap().is_applied());

        let tree = editor.tree();
        let table = only_table(&editor);
        let tall = cell_at(tree, table, 0, 0).unwrap();
        assert_eq!(tree.attrs(tall).unwrap().rowspan(), 1);
        assert_eq!(table_rows(tree, table).len(), 1);
        assert_eq!(check_coordinates(tree, table), Ok(()));
        assert_eq!(
            editor.to_html().unwrap(),
            "<table><tbody><tr data-row=\"0\"><td data-row=\"0\" data-col=\"0\"><p>a</p></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_command_display_names_and_serde() {
        assert_eq!(TableCommand::InsertRowAbove.display_name(), "Insert Row Above");
        assert_eq!(
            TableCommand::InsertTable { rows: 2, cols: 3 }.display_name(),
            "Insert Table"
        );
        let json = serde_json::to_string(&TableCommand::InsertTable { rows: 2, cols: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"insert_table","rows":2,"cols":3}"#);
        let parsed: TableCommand = serde_json::from_str(r#"{"type":"delete_column"}"#).unwrap();
        assert_eq!(parsed, TableCommand::DeleteColumn);
    }
}
