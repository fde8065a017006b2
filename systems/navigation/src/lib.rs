#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Grid, hazard and pathfinding services shared by every agent archetype.
//!
//! All services are pure functions of an immutable board view: they borrow the
//! [`TileMap`](bomb_arena_core::TileMap) and hazard lists captured in an
//! [`ArenaSnapshot`](bomb_arena_core::ArenaSnapshot), never mutate them, and
//! complete within the call that invoked them. Searches are bounded either by
//! the board size or by an explicit depth.

pub mod evasion;
pub mod grid;
pub mod hazard;
pub mod long_range;
pub mod placement;
pub mod short_range;

pub use evasion::{find_escape, Escape, EscapePreference, EscapeSearch};
pub use hazard::{blast_covers, projected_blast, HazardPredictor};
pub use long_range::{plan_route, Route, DEFAULT_WALL_COST};
pub use placement::{
    in_blast_line, PlacementAdvisor, PlacementError, PlacementPlan, PlacementPolicy, Withdrawal,
};
pub use short_range::{DirectSearch, Flood};
