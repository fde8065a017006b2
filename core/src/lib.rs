#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bomb Arena engine.
//!
//! This crate defines the vocabulary that connects the authoritative arena
//! world, the navigation services and the agent controllers. The world
//! executes [`Command`] values through its `apply` entry point and broadcasts
//! [`Event`] values describing what happened. Agents never touch the world
//! directly: every tick they receive an immutable [`ArenaSnapshot`] and answer
//! with an [`AgentIntent`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests that an agent advance a single tile in the specified direction.
    StepAgent {
        /// Identifier of the agent attempting to move.
        agent: AgentId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Requests that an agent drop a hazard on the tile it currently occupies.
    PlaceHazard {
        /// Identifier of the agent placing the hazard.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent moved between two tiles.
    AgentMoved {
        /// Identifier of the agent that moved.
        agent: AgentId,
        /// Tile the agent occupied before moving.
        from: CellCoord,
        /// Tile the agent occupies after the move.
        to: CellCoord,
    },
    /// Reports that a step request was refused.
    StepRejected {
        /// Identifier of the agent whose step was refused.
        agent: AgentId,
        /// Direction the agent attempted to travel.
        direction: Direction,
        /// Specific reason the step failed.
        reason: StepRejection,
    },
    /// Confirms that a hazard was armed on the board.
    HazardPlaced {
        /// Identifier of the agent that placed the hazard.
        agent: AgentId,
        /// Tile holding the hazard.
        origin: CellCoord,
        /// Simulation time at which the fuse expires.
        detonates_at: Duration,
    },
    /// Reports that a placement request was refused.
    PlacementRejected {
        /// Identifier of the agent whose placement was refused.
        agent: AgentId,
        /// Specific reason the placement failed.
        reason: PlacementRejection,
    },
    /// Announces that a hazard detonated and produced a blast region.
    HazardTriggered {
        /// Agent that originally placed the hazard.
        owner: AgentId,
        /// Tile the hazard occupied.
        origin: CellCoord,
        /// Tiles covered by the resulting blast.
        cells: Vec<CellCoord>,
    },
    /// Confirms that a destructible wall was cleared by a blast.
    TileDestroyed {
        /// Tile that became open.
        cell: CellCoord,
    },
    /// Announces that a collectible appeared on the board.
    ItemDropped {
        /// Item that was dropped.
        item: Item,
    },
    /// Confirms that an agent picked up a collectible.
    ItemCollected {
        /// Agent that collected the item.
        agent: AgentId,
        /// Item that was collected.
        item: Item,
    },
    /// Reports that a collectible was consumed by a blast.
    ItemDestroyed {
        /// Item that was destroyed.
        item: Item,
    },
    /// Reports that an agent was caught in an active blast.
    AgentHit {
        /// Agent that was hit.
        agent: AgentId,
        /// Lives the agent retains after the hit.
        lives: u32,
    },
    /// Reports that an agent ran out of lives and left the match.
    AgentEliminated {
        /// Agent that was eliminated.
        agent: AgentId,
    },
}

/// Reasons a step request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepRejection {
    /// The agent has not accumulated enough time for another step.
    NotReady,
    /// The destination is a wall or holds a live hazard.
    Blocked,
    /// The destination lies outside the board.
    OutOfBounds,
    /// The agent is not part of the match any more.
    Eliminated,
}

/// Reasons a hazard placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementRejection {
    /// Every hazard the agent may hold is already armed.
    NoCapacity,
    /// A hazard already sits on the agent's tile.
    TileOccupied,
    /// The agent is not part of the match any more.
    Eliminated,
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Cardinal movement directions available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All four directions in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Direction leading from `from` to the orthogonally adjacent `to`.
    ///
    /// Returns `None` when the two cells are not exactly one step apart.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let column_diff = from.column().abs_diff(to.column());
        let row_diff = from.row().abs_diff(to.row());
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column() > from.column() {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row() > from.row() {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Location of a single board tile expressed as column and row coordinates.
///
/// The column is the `x` axis and the row the `y` axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Neighbouring coordinate in the provided direction.
    ///
    /// Returns `None` when the step would leave the non-negative quadrant.
    /// Upper bounds are the caller's responsibility.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

/// Kind of terrain stored in a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Walkable floor.
    Open,
    /// Indestructible wall. Stops blasts and movement.
    SolidWall,
    /// Wall that blocks movement until a blast clears it.
    DestructibleWall,
}

/// Errors produced while parsing an ASCII board description.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapParseError {
    /// The description contained no rows.
    #[error("board description is empty")]
    Empty,
    /// Rows of the description differ in length.
    #[error("row {row} has {found} tiles, expected {expected}")]
    RaggedRow {
        /// Index of the offending row.
        row: usize,
        /// Number of tiles in the first row.
        expected: usize,
        /// Number of tiles found in the offending row.
        found: usize,
    },
    /// The description used a character with no tile meaning.
    #[error("unknown tile symbol `{symbol}` at column {column}, row {row}")]
    UnknownSymbol {
        /// Character that could not be interpreted.
        symbol: char,
        /// Column of the character.
        column: usize,
        /// Row of the character.
        row: usize,
    },
    /// The tile vector does not match the declared dimensions.
    #[error("expected {expected} tiles for the declared dimensions, found {found}")]
    DimensionMismatch {
        /// Number of tiles implied by the dimensions.
        expected: usize,
        /// Number of tiles provided.
        found: usize,
    },
}

/// Dense row-major tile grid describing the board terrain.
///
/// Agents only ever see the grid through a shared reference; the world owns
/// the single mutable copy and applies destruction deltas through
/// [`TileMap::destroy`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
}

impl TileMap {
    /// Creates a grid of the provided dimensions filled with a single kind.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, kind: TileKind) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![kind; capacity],
        }
    }

    /// Creates a grid from an explicit row-major tile vector.
    pub fn from_kinds(columns: u32, rows: u32, tiles: Vec<TileKind>) -> Result<Self, MapParseError> {
        let expected = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(usize::MAX);
        if tiles.len() != expected {
            return Err(MapParseError::DimensionMismatch {
                expected,
                found: tiles.len(),
            });
        }

        Ok(Self {
            columns,
            rows,
            tiles,
        })
    }

    /// Parses an ASCII board where `#` is solid, `+` destructible and `.` open.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MapParseError> {
        let Some(first) = rows.first() else {
            return Err(MapParseError::Empty);
        };
        let expected = first.chars().count();
        if expected == 0 {
            return Err(MapParseError::Empty);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        for (row_index, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != expected {
                return Err(MapParseError::RaggedRow {
                    row: row_index,
                    expected,
                    found,
                });
            }

            for (column_index, symbol) in row.chars().enumerate() {
                let kind = match symbol {
                    '.' => TileKind::Open,
                    '#' => TileKind::SolidWall,
                    '+' => TileKind::DestructibleWall,
                    other => {
                        return Err(MapParseError::UnknownSymbol {
                            symbol: other,
                            column: column_index,
                            row: row_index,
                        })
                    }
                };
                tiles.push(kind);
            }
        }

        let columns = u32::try_from(expected).unwrap_or(u32::MAX);
        let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        Self::from_kinds(columns, row_count, tiles)
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Terrain stored at the provided tile. Out-of-bounds reads as solid.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> TileKind {
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
            .unwrap_or(TileKind::SolidWall)
    }

    /// Reports whether the tile is walkable floor.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.kind(cell) == TileKind::Open
    }

    /// Reports whether the tile stops blast propagation.
    ///
    /// Out-of-bounds coordinates count as solid.
    #[must_use]
    pub fn is_solid(&self, cell: CellCoord) -> bool {
        self.kind(cell) == TileKind::SolidWall
    }

    /// Reports whether the tile is a destructible wall.
    #[must_use]
    pub fn is_destructible(&self, cell: CellCoord) -> bool {
        self.kind(cell) == TileKind::DestructibleWall
    }

    /// Converts a destructible wall into open floor.
    ///
    /// Returns `true` when the tile changed.
    pub fn destroy(&mut self, cell: CellCoord) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        match self.tiles.get_mut(index) {
            Some(slot) if *slot == TileKind::DestructibleWall => {
                *slot = TileKind::Open;
                true
            }
            _ => false,
        }
    }

    /// Iterates every coordinate of the grid in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |column| CellCoord::new(column, row))
        })
    }

    /// Iterates the coordinates of every remaining destructible wall.
    pub fn destructible_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells().filter(move |cell| self.is_destructible(*cell))
    }

    /// Number of destructible walls still standing.
    #[must_use]
    pub fn destructible_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|kind| **kind == TileKind::DestructibleWall)
            .count()
    }

    /// Row-major index of the provided tile, if it lies within the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Number of tiles stored in the grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Reports whether the grid has no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

/// A placed hazard whose fuse has not yet expired.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardSource {
    /// Agent that placed the hazard.
    pub owner: AgentId,
    /// Tile holding the hazard.
    pub origin: CellCoord,
    /// Number of tiles the blast reaches in each cardinal direction.
    pub radius: u32,
    /// Simulation time at which the hazard was placed.
    pub placed_at: Duration,
    /// Fixed fuse duration measured from placement.
    pub fuse: Duration,
}

impl HazardSource {
    /// Simulation time at which the fuse expires.
    #[must_use]
    pub fn detonates_at(&self) -> Duration {
        self.placed_at.saturating_add(self.fuse)
    }

    /// Fuse time left at `now`, saturating at zero.
    #[must_use]
    pub fn remaining_fuse(&self, now: Duration) -> Duration {
        self.detonates_at().saturating_sub(now)
    }
}

/// Tiles rendered dangerous by an already-triggered hazard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastRegion {
    /// Tiles covered by the blast.
    pub cells: Vec<CellCoord>,
    /// Simulation time at which the blast stops being dangerous.
    pub expires_at: Duration,
}

impl BlastRegion {
    /// Reports whether the blast covers the provided tile.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }

    /// Reports whether the blast is still dangerous at `now`.
    #[must_use]
    pub fn is_active(&self, now: Duration) -> bool {
        now < self.expires_at
    }
}

/// Types of collectibles that may appear on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// Plain score pickup.
    Score,
    /// Raises the number of hazards an agent may hold at once.
    Capacity,
    /// Raises the blast radius of the agent's hazards.
    Range,
    /// Grants an extra life.
    Life,
}

impl ItemKind {
    /// Every collectible kind.
    pub const ALL: [ItemKind; 4] = [
        ItemKind::Score,
        ItemKind::Capacity,
        ItemKind::Range,
        ItemKind::Life,
    ];

    /// Reports whether the item upgrades the agent rather than only scoring.
    #[must_use]
    pub const fn is_upgrade(self) -> bool {
        !matches!(self, ItemKind::Score)
    }
}

/// Collectible lying on a board tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    /// Tile holding the item.
    pub cell: CellCoord,
    /// Kind of collectible.
    pub kind: ItemKind,
}

/// Read-only description of the deciding agent's own resources.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentStatus {
    /// Identifier of the agent.
    pub id: AgentId,
    /// Tile the agent currently occupies.
    pub cell: CellCoord,
    /// Number of hazards the agent may have armed simultaneously.
    pub capacity: u32,
    /// Number of the agent's hazards currently armed.
    pub active_hazards: u32,
    /// Blast radius of hazards placed by the agent.
    pub blast_radius: u32,
    /// Lives the agent has left.
    pub lives: u32,
    /// Points accumulated by the agent.
    pub score: u32,
}

impl AgentStatus {
    /// Number of hazards the agent can still place right now.
    #[must_use]
    pub fn remaining_placements(&self) -> u32 {
        self.capacity.saturating_sub(self.active_hazards)
    }
}

/// Immutable per-tick view of the arena handed to an agent.
#[derive(Clone, Debug)]
pub struct ArenaSnapshot<'a> {
    /// Simulation time the snapshot was captured at.
    pub now: Duration,
    /// Board terrain.
    pub map: &'a TileMap,
    /// Hazards still waiting for their fuse to expire.
    pub hazards: &'a [HazardSource],
    /// Blasts that are currently dangerous.
    pub blasts: &'a [BlastRegion],
    /// Collectibles lying on the board.
    pub items: &'a [Item],
    /// Tiles occupied by the agent's living opponents.
    pub opponents: Vec<CellCoord>,
    /// The deciding agent's own status.
    pub me: AgentStatus,
}

impl ArenaSnapshot<'_> {
    /// Hazard armed on the provided tile, if any.
    #[must_use]
    pub fn hazard_at(&self, cell: CellCoord) -> Option<&HazardSource> {
        self.hazards.iter().find(|hazard| hazard.origin == cell)
    }

    /// Collectible lying on the provided tile, if any.
    #[must_use]
    pub fn item_at(&self, cell: CellCoord) -> Option<&Item> {
        self.items.iter().find(|item| item.cell == cell)
    }
}

/// A single orthogonal move between two adjacent tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileStep {
    /// Tile the move starts from.
    pub from: CellCoord,
    /// Tile the move ends on.
    pub to: CellCoord,
    /// Direction of travel.
    pub direction: Direction,
}

impl TileStep {
    /// Builds the step between two adjacent tiles.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        Direction::between(from, to).map(|direction| Self {
            from,
            to,
            direction,
        })
    }
}

/// Decision emitted by an agent for a single physical tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentIntent {
    /// Next grid step to take, if any.
    pub motion: Option<TileStep>,
    /// Whether to drop a hazard on the current tile before moving.
    pub place_hazard: bool,
}

impl AgentIntent {
    /// Intent that neither moves nor places anything.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            motion: None,
            place_hazard: false,
        }
    }
}
