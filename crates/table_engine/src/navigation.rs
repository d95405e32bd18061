//! Keyboard navigation between table cells
//!
//! Tab moves to the next cell in reading order and Shift+Tab to the previous
//! one. Tab in the last cell appends a row first (unless configured off).
//! Inside a table the default key behaviour is always suppressed, even when
//! the cursor cannot move.

use crate::table_commands::{current_anchor, current_cell, insert_row_below};
use crate::{EditorHost, Result};
use table_model::{row_cells, table_rows, DocumentTree, NodeId};

/// Keys the editor forwards to the table controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Enter,
    Backspace,
    Delete,
    Character(char),
}

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn with_shift(key: Key) -> Self {
        Self { key, shift: true }
    }
}

/// Whether the controller consumed a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHandling {
    /// Consumed; the host must not run its default behaviour
    Handled,
    /// Not ours; the host proceeds as usual
    NotHandled,
}

/// Offer a key press to the navigation controller
pub fn handle_key<H: EditorHost + ?Sized>(host: &mut H, event: KeyEvent) -> Result<KeyHandling> {
    if event.key != Key::Tab {
        return Ok(KeyHandling::NotHandled);
    }
    if event.shift {
        previous_cell(host)
    } else {
        next_cell(host)
    }
}

/// Cells of a table in reading order: rows by rank, cells in row order
fn reading_order(tree: &DocumentTree, table: NodeId) -> Vec<NodeId> {
    table_rows(tree, table)
        .into_iter()
        .flat_map(|row| row_cells(tree, row))
        .collect()
}

fn move_to_cell<H: EditorHost + ?Sized>(host: &mut H, cell: NodeId) {
    if let Some(index) = host.index_of(cell) {
        host.set_selection(index, 0);
    }
}

/// Handle Tab
pub fn next_cell<H: EditorHost + ?Sized>(host: &mut H) -> Result<KeyHandling> {
    let Some(ctx) = current_cell(host) else {
        return Ok(outside_cell(host));
    };
    let cells = reading_order(host.tree(), ctx.table);
    let next = cells
        .iter()
        .position(|&c| c == ctx.cell)
        .and_then(|i| cells.get(i + 1).copied());
    if let Some(cell) = next {
        move_to_cell(host, cell);
        return Ok(KeyHandling::Handled);
    }

    if !host.config().tab_inserts_row {
        return Ok(KeyHandling::Handled);
    }
    let rank = table_rows(host.tree(), ctx.table)
        .iter()
        .position(|&r| r == ctx.row);
    if insert_row_below(host)?.is_applied() {
        let new_row = rank.and_then(|r| table_rows(host.tree(), ctx.table).get(r + 1).copied());
        if let Some(cell) = new_row.and_then(|row| row_cells(host.tree(), row).first().copied()) {
            move_to_cell(host, cell);
        }
    }
    Ok(KeyHandling::Handled)
}

/// Handle Shift+Tab
pub fn previous_cell<H: EditorHost + ?Sized>(host: &mut H) -> Result<KeyHandling> {
    let Some(ctx) = current_cell(host) else {
        return Ok(outside_cell(host));
    };
    let cells = reading_order(host.tree(), ctx.table);
    let previous = cells
        .iter()
        .position(|&c| c == ctx.cell)
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| cells.get(i).copied());
    if let Some(cell) = previous {
        move_to_cell(host, cell);
    }
    Ok(KeyHandling::Handled)
}

/// Inside a table but not a cell the key is still swallowed
fn outside_cell<H: EditorHost + ?Sized>(host: &H) -> KeyHandling {
    if current_anchor(host).is_some() {
        KeyHandling::Handled
    } else {
        KeyHandling::NotHandled
    }
}
