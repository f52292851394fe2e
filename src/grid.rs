//! Fixed-grid placement of tiles.
//!
//! A grid's `order` always has exactly `rows` rows of `columns` cells; each
//! cell is a tile id present on the board or empty.

use serde::{Deserialize, Serialize};

use crate::model::{Tile, TileId};

pub const DEFAULT_ROWS: usize = 4;
pub const DEFAULT_COLUMNS: usize = 6;
pub const MIN_DIMENSION: usize = 1;
pub const MAX_DIMENSION: usize = 12;

pub type Order = Vec<Vec<Option<TileId>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    #[serde(default)]
    pub order: Order,
}

impl Grid {
    /// Default-sized grid filled row-major from `tiles`.
    #[must_use]
    pub fn from_tiles(tiles: &[Tile]) -> Self {
        Self { rows: DEFAULT_ROWS, columns: DEFAULT_COLUMNS, order: default_order(tiles, DEFAULT_ROWS, DEFAULT_COLUMNS) }
    }

    /// Exact dimensions, and every occupied cell names a tile in `tiles`.
    #[must_use]
    pub fn is_consistent(&self, tiles: &[Tile]) -> bool {
        self.order.len() == self.rows
            && self.order.iter().all(|row| row.len() == self.columns)
            && self
                .order
                .iter()
                .flatten()
                .flatten()
                .all(|id| tiles.iter().any(|t| &t.id == id))
    }

    /// Change the row count by one. Returns `false` at the bounds.
    pub fn step_rows(&mut self, grow: bool, tiles: &[Tile]) -> bool {
        let Some(rows) = step(self.rows, grow) else {
            return false;
        };
        self.rows = rows;
        self.reshape(tiles);
        true
    }

    /// Change the column count by one. Returns `false` at the bounds.
    pub fn step_columns(&mut self, grow: bool, tiles: &[Tile]) -> bool {
        let Some(columns) = step(self.columns, grow) else {
            return false;
        };
        self.columns = columns;
        self.reshape(tiles);
        true
    }

    fn reshape(&mut self, tiles: &[Tile]) {
        self.order = if self.order.is_empty() {
            default_order(tiles, self.rows, self.columns)
        } else {
            resize_order(&self.order, self.rows, self.columns)
        };
    }
}

fn step(current: usize, grow: bool) -> Option<usize> {
    if grow && current < MAX_DIMENSION {
        Some(current + 1)
    } else if !grow && current > MIN_DIMENSION {
        Some(current - 1)
    } else {
        None
    }
}

/// Fill `rows × columns` row-major with tile ids, padding with empty cells.
#[must_use]
pub fn default_order(tiles: &[Tile], rows: usize, columns: usize) -> Order {
    let mut ids = tiles.iter().map(|t| t.id.clone());
    (0..rows)
        .map(|_| (0..columns).map(|_| ids.next()).collect())
        .collect()
}

/// Resize keeping every cell at its `(row, column)` position; cells outside
/// the new bounds are dropped and new cells are empty.
#[must_use]
pub fn resize_order(order: &Order, rows: usize, columns: usize) -> Order {
    (0..rows)
        .map(|r| {
            (0..columns)
                .map(|c| order.get(r).and_then(|row| row.get(c)).cloned().flatten())
                .collect()
        })
        .collect()
}

fn position_of(order: &Order, tile_id: &str) -> Option<(usize, usize)> {
    order.iter().enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|cell| cell.as_deref() == Some(tile_id))
            .map(|c| (r, c))
    })
}

/// Move a tile to `(row, column)`, swapping with the current occupant.
/// A tile not yet placed only lands on an empty cell.
#[must_use]
pub fn move_order_item(order: &Order, tile_id: &str, (row, column): (usize, usize)) -> Order {
    let mut next = order.clone();
    let Some(target) = next.get(row).and_then(|r| r.get(column)).cloned() else {
        return next;
    };
    match position_of(order, tile_id) {
        Some((from_row, from_column)) => {
            next[from_row][from_column] = target;
            next[row][column] = Some(tile_id.to_string());
        }
        None if target.is_none() => next[row][column] = Some(tile_id.to_string()),
        None => {}
    }
    next
}

/// Empty every cell holding one of `tile_ids`.
pub fn clear_cells(order: &mut Order, tile_ids: &[TileId]) {
    for cell in order.iter_mut().flatten() {
        if cell.as_ref().is_some_and(|id| tile_ids.contains(id)) {
            *cell = None;
        }
    }
}

/// Place `tile_id` in the first empty cell. Returns `false` when full.
pub fn place_in_first_empty(order: &mut Order, tile_id: &str) -> bool {
    match order.iter_mut().flatten().find(|cell| cell.is_none()) {
        Some(cell) => {
            *cell = Some(tile_id.to_string());
            true
        }
        None => false,
    }
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod tests;
