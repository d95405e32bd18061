//! Table UI glue - the context menu and the dimension picker

use crate::table_commands::current_cell;
use crate::{insert_table, EditOutcome, EditorHost, Result, TableCommand, TableConfig};
use serde::{Deserialize, Serialize};

/// Entries of the table context menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableMenuAction {
    InsertRowAbove,
    InsertRowBelow,
    InsertColumnLeft,
    InsertColumnRight,
    DeleteRow,
    DeleteColumn,
    DeleteTable,
}

impl TableMenuAction {
    /// Every action, in menu order
    pub const ALL: [TableMenuAction; 7] = [
        TableMenuAction::InsertRowAbove,
        TableMenuAction::InsertRowBelow,
        TableMenuAction::InsertColumnLeft,
        TableMenuAction::InsertColumnRight,
        TableMenuAction::DeleteRow,
        TableMenuAction::DeleteColumn,
        TableMenuAction::DeleteTable,
    ];

    pub fn command(self) -> TableCommand {
        match self {
            TableMenuAction::InsertRowAbove => TableCommand::InsertRowAbove,
            TableMenuAction::InsertRowBelow => TableCommand::InsertRowBelow,
            TableMenuAction::InsertColumnLeft => TableCommand::InsertColumnLeft,
            TableMenuAction::InsertColumnRight => TableCommand::InsertColumnRight,
            TableMenuAction::DeleteRow => TableCommand::DeleteRow,
            TableMenuAction::DeleteColumn => TableCommand::DeleteColumn,
            TableMenuAction::DeleteTable => TableCommand::DeleteTable,
        }
    }

    pub fn label(self) -> &'static str {
        self.command().display_name()
    }

    pub fn perform<H: EditorHost + ?Sized>(self, host: &mut H) -> Result<EditOutcome> {
        self.command().apply(host)
    }

    /// Actions to offer for the current cursor; empty outside table cells
    pub fn available<H: EditorHost + ?Sized>(host: &H) -> Vec<TableMenuAction> {
        if current_cell(host).is_some() {
            Self::ALL.to_vec()
        } else {
            Vec::new()
        }
    }
}

/// Grid for choosing the size of a new table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionPicker {
    rows: usize,
    cols: usize,
    /// Highlighted size as `(rows, cols)`
    highlighted: Option<(usize, usize)>,
}

impl DimensionPicker {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            rows: config.picker_rows.min(config.max_rows).max(1),
            cols: config.picker_cols.min(config.max_cols).max(1),
            highlighted: None,
        }
    }

    /// Grid size as `(rows, cols)`
    pub fn grid(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Pointer over the zero-based grid square `(row, col)`
    pub fn hover(&mut self, row: usize, col: usize) {
        self.highlighted = Some((row.min(self.rows - 1) + 1, col.min(self.cols - 1) + 1));
    }

    /// Pointer left the grid
    pub fn leave(&mut self) {
        self.highlighted = None;
    }

    pub fn highlighted(&self) -> Option<(usize, usize)> {
        self.highlighted
    }

    /// Whether a grid square is inside the highlighted size
    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        self.highlighted
            .is_some_and(|(rows, cols)| row < rows && col < cols)
    }

    /// Caption for the highlighted size, e.g. `3 × 4`
    pub fn caption(&self) -> Option<String> {
        self.highlighted
            .map(|(rows, cols)| format!("{} \u{d7} {}", rows, cols))
    }

    /// Insert a table of the highlighted size
    pub fn choose<H: EditorHost + ?Sized>(&mut self, host: &mut H) -> Result<EditOutcome> {
        let Some((rows, cols)) = self.highlighted.take() else {
            return Ok(EditOutcome::NotApplicable);
        };
        insert_table(host, rows, cols)
    }
}
