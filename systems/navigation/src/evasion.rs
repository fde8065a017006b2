//! Escape search for agents standing in or near a predicted blast.

use std::time::Duration;

use bomb_arena_core::CellCoord;
use rand::Rng;
use serde::Deserialize;

use crate::grid::openness;
use crate::hazard::HazardPredictor;
use crate::short_range::DirectSearch;

/// How an escape target is chosen among the safe tiles found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapePreference {
    /// The closest safe tile wins.
    #[default]
    Nearest,
    /// The least enclosed safe tile wins, distance breaking ties.
    MostOpen,
}

/// Parameters of a single escape search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscapeSearch {
    /// Maximum number of steps the escape may take.
    pub max_depth: usize,
    /// Horizon tiles along the way must stay safe for.
    pub transit_horizon: Duration,
    /// Horizon the destination must stay safe for.
    pub safety_horizon: Duration,
    /// Candidate ranking.
    pub preference: EscapePreference,
}

/// Outcome of an escape search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Escape {
    /// Path from the agent's tile to the chosen destination, inclusive.
    pub path: Vec<CellCoord>,
    /// `false` when no tile safe at the safety horizon was reachable and the
    /// path leads to the tile that stays safe the longest instead.
    pub safe: bool,
}

impl Escape {
    /// Destination tile of the escape.
    #[must_use]
    pub fn destination(&self) -> Option<CellCoord> {
        self.path.last().copied()
    }
}

/// Searches for somewhere to flee from `start`.
///
/// Tiles on the way only need to be safe at the transit horizon, while the
/// destination must be safe at the safety horizon. When nothing qualifies the
/// search falls back to the reachable tile whose danger arrives last.
/// Returns `None` only when `start` lies off the board.
pub fn find_escape<R>(
    predictor: HazardPredictor<'_>,
    start: CellCoord,
    search: EscapeSearch,
    rng: &mut R,
) -> Option<Escape>
where
    R: Rng + ?Sized,
{
    let map = predictor.map();
    if !map.contains(start) {
        return None;
    }

    let direct = DirectSearch::new(predictor, search.max_depth, search.transit_horizon);
    let flood = direct.flood(start, rng);

    let is_safe = |cell: CellCoord| !predictor.is_dangerous(cell, search.safety_horizon);
    let depth_of = |cell: CellCoord| flood.depth(cell).unwrap_or(usize::MAX);

    let safe_target = match search.preference {
        EscapePreference::Nearest => flood.order().iter().copied().find(|cell| is_safe(*cell)),
        EscapePreference::MostOpen => flood
            .order()
            .iter()
            .copied()
            .filter(|cell| is_safe(*cell))
            .max_by(|a, b| {
                let open_a = openness(map, *a, |n| direct.is_passable(n) && is_safe(n));
                let open_b = openness(map, *b, |n| direct.is_passable(n) && is_safe(n));
                open_a
                    .cmp(&open_b)
                    .then_with(|| depth_of(*b).cmp(&depth_of(*a)))
            }),
    };

    if let Some(target) = safe_target {
        return flood
            .path_to(target)
            .map(|path| Escape { path, safe: true });
    }

    let fallback = flood.order().iter().copied().max_by(|a, b| {
        let danger_a = predictor.time_to_danger(*a).unwrap_or(Duration::MAX);
        let danger_b = predictor.time_to_danger(*b).unwrap_or(Duration::MAX);
        danger_a
            .cmp(&danger_b)
            .then_with(|| depth_of(*b).cmp(&depth_of(*a)))
    })?;

    flood
        .path_to(fallback)
        .map(|path| Escape { path, safe: false })
}
