//! Weighted best-first route planning that may cross destructible walls.

use bomb_arena_core::{CellCoord, TileKind, TileMap};
use pathfinding::prelude::astar;

use crate::grid::cardinal_neighbors;

/// Cost of stepping onto an open tile.
pub const OPEN_STEP_COST: u32 = 1;

/// Default cost of stepping onto a destructible wall.
pub const DEFAULT_WALL_COST: u32 = 2;

/// Full route from a start tile to a goal tile, inclusive on both ends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Ordered tiles from start to goal.
    pub cells: Vec<CellCoord>,
    /// Accumulated move cost of the route.
    pub cost: u32,
}

impl Route {
    /// First destructible wall encountered along the route, with its index.
    #[must_use]
    pub fn first_obstacle(&self, map: &TileMap) -> Option<(usize, CellCoord)> {
        self.cells
            .iter()
            .enumerate()
            .find(|(_, cell)| map.is_destructible(**cell))
            .map(|(index, cell)| (index, *cell))
    }

    /// Number of moves the route takes.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    /// Final tile of the route.
    #[must_use]
    pub fn goal(&self) -> Option<CellCoord> {
        self.cells.last().copied()
    }
}

/// Plans a route over open and destructible tiles.
///
/// Moving onto an open tile costs one, moving onto a destructible wall costs
/// `wall_cost` (raised to at least two so walls are always dearer than floor).
/// Solid tiles are never expanded. The Manhattan heuristic is admissible for
/// these weights and the frontier breaks `f` ties toward lower `h`.
///
/// Returns `None` when the goal is unreachable, solid or off the board.
#[must_use]
pub fn plan_route(
    map: &TileMap,
    start: CellCoord,
    goal: CellCoord,
    wall_cost: u32,
) -> Option<Route> {
    if !map.contains(start) || !map.contains(goal) || map.is_solid(goal) {
        return None;
    }

    let wall_cost = wall_cost.max(OPEN_STEP_COST + 1);

    let (cells, cost) = astar(
        &start,
        |cell| {
            cardinal_neighbors(map, *cell)
                .filter_map(|neighbor| match map.kind(neighbor) {
                    TileKind::Open => Some((neighbor, OPEN_STEP_COST)),
                    TileKind::DestructibleWall => Some((neighbor, wall_cost)),
                    TileKind::SolidWall => None,
                })
                .collect::<Vec<_>>()
        },
        |cell| cell.manhattan_distance(goal),
        |cell| *cell == goal,
    )?;

    Some(Route { cells, cost })
}
