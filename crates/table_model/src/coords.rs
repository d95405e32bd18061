//! Coordinate model - mapping cells to `(row, col)` and measuring tables
//!
//! Coordinates live on the nodes themselves as the `row`/`col` attributes of
//! cells (mirrored by `row` on rows). Everything here is a pure read over the
//! tree.
//!
//! Row values are only shifted on insert and never renumbered on delete, so a
//! table may carry gaps in its `row` values. Code that needs a dense row index
//! uses the row's rank in body order instead.

use crate::{DocumentTree, NodeId, NodeKind};
use std::collections::HashMap;
use thiserror::Error;

/// Where a cursor sits relative to a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAnchor {
    /// Inside a cell of `table`
    Cell { table: NodeId, cell: NodeId },
    /// Inside `table` but not inside any cell
    Table(NodeId),
}

impl TableAnchor {
    pub fn table(&self) -> NodeId {
        match *self {
            TableAnchor::Cell { table, .. } => table,
            TableAnchor::Table(table) => table,
        }
    }

    pub fn cell(&self) -> Option<NodeId> {
        match *self {
            TableAnchor::Cell { cell, .. } => Some(cell),
            TableAnchor::Table(_) => None,
        }
    }
}

/// A break in the coordinate consistency invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinateViolation {
    #[error("cell {0} has no row/col attributes")]
    MissingCoordinates(NodeId),

    #[error("cells of row {row} disagree on their row value")]
    RowMismatch { row: NodeId },

    #[error("row values are not increasing at row {row}")]
    RowOrder { row: NodeId },

    #[error("position ({row}, {col}) is covered more than once")]
    Overlap { row: usize, col: usize },

    #[error("position ({row}, {col}) is not covered by any cell")]
    Gap { row: usize, col: usize },

    #[error("cell {cell} spans past the last row")]
    SpanOutOfBounds { cell: NodeId },
}

/// Read the `(row, col)` of a cell; `None` when either attribute is absent
pub fn cell_position(tree: &DocumentTree, cell: NodeId) -> Option<(usize, usize)> {
    let node = tree.get(cell)?;
    if node.kind() != NodeKind::Cell {
        return None;
    }
    node.attrs().position()
}

/// All cells of a table in document order (not sorted by coordinates)
pub fn all_cells(tree: &DocumentTree, table: NodeId) -> Vec<NodeId> {
    tree.descendants(table)
        .into_iter()
        .filter(|&id| tree.kind(id) == Some(NodeKind::Cell))
        .collect()
}

/// `(max(row) + 1, max(col) + 1)` over the table's cells; `(0, 0)` when empty
pub fn table_dimensions(tree: &DocumentTree, table: NodeId) -> (usize, usize) {
    all_cells(tree, table)
        .into_iter()
        .filter_map(|cell| cell_position(tree, cell))
        .fold((0, 0), |(rows, cols), (row, col)| {
            (rows.max(row + 1), cols.max(col + 1))
        })
}

/// The body of a table
pub fn table_body(tree: &DocumentTree, table: NodeId) -> Option<NodeId> {
    tree.children(table)
        .find(|&c| tree.kind(c) == Some(NodeKind::Body))
}

/// Rows of a table in body (visual) order
pub fn table_rows(tree: &DocumentTree, table: NodeId) -> Vec<NodeId> {
    match table_body(tree, table) {
        Some(body) => tree
            .children(body)
            .filter(|&c| tree.kind(c) == Some(NodeKind::Row))
            .collect(),
        None => Vec::new(),
    }
}

/// Cells of a row in order
pub fn row_cells(tree: &DocumentTree, row: NodeId) -> Vec<NodeId> {
    tree.children(row)
        .filter(|&c| tree.kind(c) == Some(NodeKind::Cell))
        .collect()
}

/// The cell whose base coordinates are exactly `(row, col)`
pub fn cell_at(tree: &DocumentTree, table: NodeId, row: usize, col: usize) -> Option<NodeId> {
    all_cells(tree, table)
        .into_iter()
        .find(|&cell| cell_position(tree, cell) == Some((row, col)))
}

/// The cell of `row` that covers column `col`, honouring column spans.
///
/// Falls back to the last cell starting before `col` when nothing covers it.
pub fn cell_covering(tree: &DocumentTree, row: NodeId, col: usize) -> Option<NodeId> {
    let cells = row_cells(tree, row);
    let covers = |cell: &NodeId| {
        tree.attrs(*cell).is_some_and(|a| match a.col {
            Some(start) => start <= col && col < start + a.colspan(),
            None => false,
        })
    };
    cells.iter().copied().find(covers).or_else(|| {
        cells
            .iter()
            .copied()
            .filter(|&c| tree.attrs(c).and_then(|a| a.col).is_some_and(|start| start <= col))
            .last()
    })
}

/// Walk from `node` up its ancestors until a cell or a table is found
pub fn find_table_anchor(tree: &DocumentTree, node: NodeId) -> Option<TableAnchor> {
    std::iter::once(node)
        .chain(tree.ancestors(node))
        .find_map(|id| match tree.kind(id)? {
            NodeKind::Cell => {
                let table = tree.closest(id, NodeKind::Table)?;
                Some(TableAnchor::Cell { table, cell: id })
            }
            NodeKind::Table => Some(TableAnchor::Table(id)),
            _ => None,
        })
}

/// Occupancy of a table by rank: which cell covers each `(rank, col)` slot.
///
/// Rows are addressed by their rank in body order. Spans past the last row
/// are clipped and a slot claimed twice keeps its first owner.
#[derive(Debug, Clone, Default)]
pub struct CellGrid {
    rows: Vec<NodeId>,
    slots: Vec<Vec<Option<NodeId>>>,
    origins: HashMap<NodeId, (usize, usize)>,
}

impl CellGrid {
    pub fn build(tree: &DocumentTree, table: NodeId) -> Self {
        let rows = table_rows(tree, table);
        let mut origins = HashMap::new();
        let mut width = 0;
        for (rank, &row) in rows.iter().enumerate() {
            for cell in row_cells(tree, row) {
                let Some((_, col)) = cell_position(tree, cell) else { continue };
                let colspan = tree.attrs(cell).map_or(1, |a| a.colspan());
                width = width.max(col + colspan);
                origins.insert(cell, (rank, col));
            }
        }

        let mut slots = vec![vec![None; width]; rows.len()];
        for (rank, &row) in rows.iter().enumerate() {
            for cell in row_cells(tree, row) {
                let Some(&(_, col)) = origins.get(&cell) else { continue };
                let attrs = tree.attrs(cell).copied().unwrap_or_default();
                for line in slots.iter_mut().skip(rank).take(attrs.rowspan()) {
                    for slot in line.iter_mut().skip(col).take(attrs.colspan()) {
                        if slot.is_none() {
                            *slot = Some(cell);
                        }
                    }
                }
            }
        }
        Self { rows, slots, origins }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.slots.first().map_or(0, Vec::len)
    }

    /// Row node at a rank
    pub fn row(&self, rank: usize) -> Option<NodeId> {
        self.rows.get(rank).copied()
    }

    /// Rank of a row node
    pub fn rank_of(&self, row: NodeId) -> Option<usize> {
        self.rows.iter().position(|&r| r == row)
    }

    /// Cell covering a slot
    pub fn at(&self, rank: usize, col: usize) -> Option<NodeId> {
        self.slots.get(rank)?.get(col).copied().flatten()
    }

    /// `(rank, col)` of a cell's top-left slot
    pub fn origin(&self, cell: NodeId) -> Option<(usize, usize)> {
        self.origins.get(&cell).copied()
    }
}

/// Check the coordinate consistency invariant of a table.
///
/// Row values are compared by rank: every row's cells must agree on one row
/// value and those values must increase in body order. Columns are checked
/// literally. Spans expand coverage; the covered positions must tile the
/// `rows × cols` rectangle exactly.
pub fn check_coordinates(
    tree: &DocumentTree,
    table: NodeId,
) -> std::result::Result<(), CoordinateViolation> {
    let rows = table_rows(tree, table);
    let mut placed: Vec<(NodeId, usize, usize, usize, usize)> = Vec::new();
    let mut last_value: Option<usize> = None;

    for (rank, &row) in rows.iter().enumerate() {
        let mut value = None;
        for cell in row_cells(tree, row) {
            let (r, c) = cell_position(tree, cell)
                .ok_or(CoordinateViolation::MissingCoordinates(cell))?;
            if value.is_some_and(|v| v != r) {
                return Err(CoordinateViolation::RowMismatch { row });
            }
            value = Some(r);
            let attrs = tree.attrs(cell).copied().unwrap_or_default();
            placed.push((cell, rank, c, attrs.rowspan(), attrs.colspan()));
        }
        if let (Some(prev), Some(v)) = (last_value, value) {
            if v <= prev {
                return Err(CoordinateViolation::RowOrder { row });
            }
        }
        last_value = value.or(last_value);
    }

    let width = placed
        .iter()
        .map(|&(_, _, col, _, colspan)| col + colspan)
        .max()
        .unwrap_or(0);
    let height = rows.len();
    let mut covered = vec![vec![false; width]; height];

    for (cell, rank, col, rowspan, colspan) in placed {
        if rank + rowspan > height {
            return Err(CoordinateViolation::SpanOutOfBounds { cell });
        }
        for r in rank..rank + rowspan {
            for c in col..col + colspan {
                if covered[r][c] {
                    return Err(CoordinateViolation::Overlap { row: r, col: c });
                }
                covered[r][c] = true;
            }
        }
    }

    for (r, line) in covered.iter().enumerate() {
        if let Some(c) = line.iter().position(|&hit| !hit) {
            return Err(CoordinateViolation::Gap { row: r, col: c });
        }
    }
    Ok(())
}
