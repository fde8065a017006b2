//! Neighbourhood helpers over the tile grid.

use bomb_arena_core::{CellCoord, TileMap};

/// Orthogonal neighbours of `cell` that lie inside the board, in
/// north, east, south, west order.
pub fn cardinal_neighbors(map: &TileMap, cell: CellCoord) -> impl Iterator<Item = CellCoord> {
    let width = map.columns();
    let height = map.rows();
    let mut candidates = [None; 4];
    let mut count = 0;

    if let Some(row) = cell.row().checked_sub(1) {
        if cell.column() < width && row < height {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_add(1) {
        if column < width && cell.row() < height {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    if let Some(row) = cell.row().checked_add(1) {
        if row < height && cell.column() < width {
            candidates[count] = Some(CellCoord::new(cell.column(), row));
            count += 1;
        }
    }

    if let Some(column) = cell.column().checked_sub(1) {
        if column < width && cell.row() < height {
            candidates[count] = Some(CellCoord::new(column, cell.row()));
            count += 1;
        }
    }

    candidates.into_iter().take(count).flatten()
}

/// Number of neighbours of `cell` accepted by `is_free`.
///
/// Used as an enclosure measure: a tile with four free neighbours is fully
/// open, a tile with one is a dead end.
#[must_use]
pub fn openness<F>(map: &TileMap, cell: CellCoord, mut is_free: F) -> usize
where
    F: FnMut(CellCoord) -> bool,
{
    cardinal_neighbors(map, cell)
        .filter(|neighbor| is_free(*neighbor))
        .count()
}
