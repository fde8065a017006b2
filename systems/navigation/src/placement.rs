//! Stand-tile selection with a verified withdrawal for hazard placement.

use std::time::Duration;

use bomb_arena_core::{CellCoord, TileMap};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;

use crate::grid::cardinal_neighbors;
use crate::hazard::{blast_covers, HazardPredictor};
use crate::short_range::DirectSearch;

/// Thresholds a stand tile must satisfy before a placement is endorsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlacementPolicy {
    /// Minimum number of distinct withdrawal tiles that must be reachable.
    pub min_withdrawal_options: usize,
    /// Depth of the withdrawal search from the stand tile.
    pub withdrawal_depth: usize,
    /// Depth of the approach search from the agent to the stand tile.
    pub approach_depth: usize,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            min_withdrawal_options: 1,
            withdrawal_depth: 6,
            approach_depth: 12,
        }
    }
}

/// Reasons the advisor refused to endorse a placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The target lies outside the board.
    #[error("target {0:?} lies outside the board")]
    TargetOutOfBounds(CellCoord),
    /// None of the tiles adjacent to the target can be reached safely.
    #[error("no stand tile next to {0:?} is reachable")]
    NoCandidate(CellCoord),
    /// Stand tiles were reachable but none offered enough withdrawal options.
    #[error("no stand tile next to {0:?} offers a safe withdrawal")]
    NoWithdrawal(CellCoord),
}

/// A verified withdrawal from a hypothetical placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    /// Tile to retreat to.
    pub tile: CellCoord,
    /// Path from the stand tile to the withdrawal tile, inclusive.
    pub path: Vec<CellCoord>,
    /// Number of qualifying withdrawal tiles found.
    pub options: usize,
}

/// An endorsed placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Tile the placement is meant to hit.
    pub target: CellCoord,
    /// Tile to stand on when placing.
    pub stand: CellCoord,
    /// Tile to retreat to after placing.
    pub withdrawal: CellCoord,
    /// Path from the agent to the stand tile, inclusive.
    pub approach: Vec<CellCoord>,
    /// Path from the stand tile to the withdrawal tile, inclusive.
    pub retreat: Vec<CellCoord>,
    /// Number of qualifying withdrawal tiles found from the stand tile.
    pub withdrawal_options: usize,
}

impl PlacementPlan {
    /// Reports whether the agent is already on the stand tile.
    #[must_use]
    pub fn is_in_position(&self) -> bool {
        self.approach.len() <= 1
    }

    fn total_length(&self) -> usize {
        self.approach.len() + self.retreat.len()
    }
}

/// Reports whether a hazard placed at `from` with `radius` would reach `target`.
#[must_use]
pub fn in_blast_line(map: &TileMap, from: CellCoord, target: CellCoord, radius: u32) -> bool {
    blast_covers(map, from, radius, target)
}

/// Searches stand tiles around a target and verifies a withdrawal exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementAdvisor {
    /// Thresholds applied to every candidate.
    pub policy: PlacementPolicy,
    /// Horizon tiles on the approach and retreat paths must stay safe for.
    pub transit_horizon: Duration,
    /// Horizon withdrawal tiles must stay safe for.
    pub safety_horizon: Duration,
}

impl PlacementAdvisor {
    /// Creates an advisor with the provided thresholds and horizons.
    #[must_use]
    pub fn new(policy: PlacementPolicy, transit_horizon: Duration, safety_horizon: Duration) -> Self {
        Self {
            policy,
            transit_horizon,
            safety_horizon,
        }
    }

    /// Picks the best stand tile next to `target` for an agent at
    /// `agent_cell` whose hazards reach `radius` tiles.
    ///
    /// Candidates are ranked by total approach plus retreat length, ties
    /// going to the candidate with the shorter approach.
    pub fn advise<R>(
        &self,
        predictor: HazardPredictor<'_>,
        agent_cell: CellCoord,
        target: CellCoord,
        radius: u32,
        rng: &mut R,
    ) -> Result<PlacementPlan, PlacementError>
    where
        R: Rng + ?Sized,
    {
        let map = predictor.map();
        if !map.contains(target) {
            return Err(PlacementError::TargetOutOfBounds(target));
        }

        let approach_search =
            DirectSearch::new(predictor, self.policy.approach_depth, self.transit_horizon);

        let mut reachable_any = false;
        let mut best: Option<PlacementPlan> = None;

        for stand in cardinal_neighbors(map, target) {
            if !map.is_open(stand) || predictor.is_occupied(stand) {
                continue;
            }

            let Some(approach) = approach_search.path_to(agent_cell, stand, rng) else {
                continue;
            };
            reachable_any = true;

            let Some(withdrawal) = self.evaluate_stand(predictor, stand, radius, rng) else {
                continue;
            };

            let plan = PlacementPlan {
                target,
                stand,
                withdrawal: withdrawal.tile,
                approach,
                retreat: withdrawal.path,
                withdrawal_options: withdrawal.options,
            };

            let better = match &best {
                None => true,
                Some(current) => {
                    (plan.total_length(), plan.approach.len())
                        < (current.total_length(), current.approach.len())
                }
            };
            if better {
                best = Some(plan);
            }
        }

        let error = match best {
            Some(plan) => return Ok(plan),
            None if reachable_any => PlacementError::NoWithdrawal(target),
            None => PlacementError::NoCandidate(target),
        };
        trace!(?agent_cell, %error, "placement refused");
        Err(error)
    }

    /// Verifies that a hazard placed at `stand` leaves enough withdrawal
    /// options and returns the nearest one.
    ///
    /// A withdrawal tile lies outside the hypothetical blast, is not
    /// independently dangerous at the safety horizon and is reachable by the
    /// direct planner within the withdrawal depth.
    pub fn evaluate_stand<R>(
        &self,
        predictor: HazardPredictor<'_>,
        stand: CellCoord,
        radius: u32,
        rng: &mut R,
    ) -> Option<Withdrawal>
    where
        R: Rng + ?Sized,
    {
        let map = predictor.map();
        if predictor.is_dangerous(stand, self.transit_horizon) {
            return None;
        }

        let search = DirectSearch::new(predictor, self.policy.withdrawal_depth, self.transit_horizon);
        let flood = search.flood(stand, rng);

        let options: Vec<CellCoord> = flood
            .order()
            .iter()
            .copied()
            .filter(|cell| {
                !blast_covers(map, stand, radius, *cell)
                    && !predictor.is_dangerous(*cell, self.safety_horizon)
            })
            .collect();

        if options.len() < self.policy.min_withdrawal_options.max(1) {
            return None;
        }

        let tile = *options.first()?;
        let path = flood.path_to(tile)?;
        Some(Withdrawal {
            tile,
            path,
            options: options.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn advisor(min_options: usize, depth: usize) -> PlacementAdvisor {
        PlacementAdvisor::new(
            PlacementPolicy {
                min_withdrawal_options: min_options,
                withdrawal_depth: depth,
                approach_depth: 12,
            },
            Duration::from_millis(250),
            Duration::from_millis(3_000),
        )
    }

    #[test]
    fn corridor_dead_end_is_refused() {
        let map = TileMap::from_rows(&["#####", "#..+#", "#####"]).expect("valid board");
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let result = advisor(1, 6).advise(
            predictor,
            CellCoord::new(1, 1),
            CellCoord::new(3, 1),
            2,
            &mut rng,
        );
        assert_eq!(result, Err(PlacementError::NoWithdrawal(CellCoord::new(3, 1))));
    }

    #[test]
    fn corner_pocket_qualifies_stand() {
        let map = TileMap::from_rows(&["######", "#...+#", "#.####", "######"])
            .expect("valid board");
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let plan = advisor(1, 6)
            .advise(
                predictor,
                CellCoord::new(1, 1),
                CellCoord::new(4, 1),
                1,
                &mut rng,
            )
            .expect("stand at (3,1) with withdrawal around the corner");
        assert_eq!(plan.stand, CellCoord::new(3, 1));
        assert!(!blast_covers(&map, plan.stand, 1, plan.withdrawal));
        assert_eq!(plan.retreat.first(), Some(&plan.stand));
        assert_eq!(plan.retreat.last(), Some(&plan.withdrawal));
        assert!(!plan.is_in_position());
    }

    #[test]
    fn stricter_policy_needs_more_options() {
        let map = TileMap::from_rows(&["######", "#...+#", "#.####", "######"])
            .expect("valid board");
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let result = advisor(3, 8).advise(
            predictor,
            CellCoord::new(1, 1),
            CellCoord::new(4, 1),
            1,
            &mut rng,
        );
        assert_eq!(result, Err(PlacementError::NoWithdrawal(CellCoord::new(4, 1))));
    }

    #[test]
    fn unreachable_target_reports_no_candidate() {
        let map = TileMap::from_rows(&["#######", "#..#.+#", "#######"]).expect("valid board");
        let predictor = HazardPredictor::new(&map, &[], &[], Duration::ZERO);
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        let result = advisor(1, 6).advise(
            predictor,
            CellCoord::new(1, 1),
            CellCoord::new(5, 1),
            1,
            &mut rng,
        );
        assert_eq!(result, Err(PlacementError::NoCandidate(CellCoord::new(5, 1))));
        assert_eq!(
            advisor(1, 6).advise(
                predictor,
                CellCoord::new(1, 1),
                CellCoord::new(40, 1),
                1,
                &mut rng,
            ),
            Err(PlacementError::TargetOutOfBounds(CellCoord::new(40, 1)))
        );
    }

    #[test]
    fn blast_line_respects_solid_tiles() {
        let map = TileMap::from_rows(&["#####", "#.#.#", "#...#", "#####"]).expect("valid board");
        assert!(in_blast_line(&map, CellCoord::new(1, 2), CellCoord::new(3, 2), 2));
        assert!(!in_blast_line(&map, CellCoord::new(1, 1), CellCoord::new(3, 1), 2));
        assert!(!in_blast_line(&map, CellCoord::new(1, 2), CellCoord::new(3, 2), 1));
    }
}
