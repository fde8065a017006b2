//! Time-windowed hazard prediction.

use std::time::Duration;

use bomb_arena_core::{ArenaSnapshot, BlastRegion, CellCoord, Direction, HazardSource, TileMap};

/// Tiles a hazard placed at `origin` is predicted to cover.
///
/// The projection includes the origin and walks up to `radius` tiles along
/// each axis, stopping before the first solid tile. Destructible walls do not
/// stop the projected line.
#[must_use]
pub fn projected_blast(map: &TileMap, origin: CellCoord, radius: u32) -> Vec<CellCoord> {
    let mut cells = Vec::with_capacity(1 + 4 * radius as usize);
    cells.push(origin);

    for direction in Direction::ALL {
        let mut cursor = origin;
        for _ in 0..radius {
            let Some(next) = cursor.step(direction) else {
                break;
            };
            if map.is_solid(next) {
                break;
            }
            cells.push(next);
            cursor = next;
        }
    }

    cells
}

/// Reports whether a hazard at `origin` with `radius` is predicted to reach `cell`.
///
/// Equivalent to `projected_blast(..).contains(&cell)` without allocating.
#[must_use]
pub fn blast_covers(map: &TileMap, origin: CellCoord, radius: u32, cell: CellCoord) -> bool {
    if cell == origin {
        return true;
    }

    let same_column = cell.column() == origin.column();
    let same_row = cell.row() == origin.row();
    if !same_column && !same_row {
        return false;
    }

    if origin.manhattan_distance(cell) > radius {
        return false;
    }

    let Some(direction) = axis_direction(origin, cell) else {
        return false;
    };

    let mut cursor = origin;
    while cursor != cell {
        let Some(next) = cursor.step(direction) else {
            return false;
        };
        if map.is_solid(next) {
            return false;
        }
        cursor = next;
    }

    true
}

fn axis_direction(from: CellCoord, to: CellCoord) -> Option<Direction> {
    if from.column() == to.column() {
        if to.row() < from.row() {
            Some(Direction::North)
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            None
        }
    } else if from.row() == to.row() {
        if to.column() > from.column() {
            Some(Direction::East)
        } else {
            Some(Direction::West)
        }
    } else {
        None
    }
}

/// Answers "is this tile unsafe within the given horizon" for one snapshot.
///
/// The predictor borrows the snapshot's board and hazard lists and holds no
/// state of its own, so it may be queried any number of times per decision.
#[derive(Clone, Copy, Debug)]
pub struct HazardPredictor<'a> {
    map: &'a TileMap,
    hazards: &'a [HazardSource],
    blasts: &'a [BlastRegion],
    now: Duration,
}

impl<'a> HazardPredictor<'a> {
    /// Creates a predictor over the provided board state.
    #[must_use]
    pub fn new(
        map: &'a TileMap,
        hazards: &'a [HazardSource],
        blasts: &'a [BlastRegion],
        now: Duration,
    ) -> Self {
        Self {
            map,
            hazards,
            blasts,
            now,
        }
    }

    /// Creates a predictor over the board state captured in a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &ArenaSnapshot<'a>) -> Self {
        Self::new(snapshot.map, snapshot.hazards, snapshot.blasts, snapshot.now)
    }

    /// Board the predictor reads.
    #[must_use]
    pub fn map(&self) -> &'a TileMap {
        self.map
    }

    /// Simulation time the predictor evaluates against.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Live hazards considered by the predictor.
    #[must_use]
    pub fn hazards(&self) -> &'a [HazardSource] {
        self.hazards
    }

    /// Reports whether `cell` is inside an active blast, or inside the
    /// projected blast of a hazard whose remaining fuse is shorter than
    /// `horizon`.
    #[must_use]
    pub fn is_dangerous(&self, cell: CellCoord, horizon: Duration) -> bool {
        if self.in_active_blast(cell) {
            return true;
        }

        self.hazards.iter().any(|hazard| {
            hazard.remaining_fuse(self.now) < horizon
                && blast_covers(self.map, hazard.origin, hazard.radius, cell)
        })
    }

    /// Reports whether an active blast currently covers `cell`.
    #[must_use]
    pub fn in_active_blast(&self, cell: CellCoord) -> bool {
        self.blasts
            .iter()
            .any(|blast| blast.is_active(self.now) && blast.contains(cell))
    }

    /// Time until `cell` becomes dangerous, if any hazard or blast threatens it.
    ///
    /// Active blasts report zero. Tiles threatened by nothing report `None`.
    #[must_use]
    pub fn time_to_danger(&self, cell: CellCoord) -> Option<Duration> {
        if self.in_active_blast(cell) {
            return Some(Duration::ZERO);
        }

        self.hazards
            .iter()
            .filter(|hazard| blast_covers(self.map, hazard.origin, hazard.radius, cell))
            .map(|hazard| hazard.remaining_fuse(self.now))
            .min()
    }

    /// Reports whether a live hazard sits on `cell`.
    #[must_use]
    pub fn is_occupied(&self, cell: CellCoord) -> bool {
        self.hazards.iter().any(|hazard| hazard.origin == cell)
    }
}
