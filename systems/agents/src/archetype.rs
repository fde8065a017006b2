//! Strategy seam between the shared agent core and the archetype state machines.

use std::fmt;
use std::time::Duration;

use bomb_arena_core::{ArenaSnapshot, CellCoord, Item};
use bomb_arena_navigation::{
    find_escape, grid::cardinal_neighbors, plan_route, DirectSearch, Escape, EscapePreference,
    EscapeSearch, HazardPredictor, PlacementAdvisor, PlacementError, PlacementPlan, Route,
    Withdrawal,
};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::CommonTuning;
use crate::memory::AgentMemory;
use crate::ArchetypeKind;

/// Closed set of behaviour states of one archetype.
pub trait BehaviorState: Copy + Eq + fmt::Debug {
    /// Human-readable state name used for logging and debug views.
    fn name(self) -> &'static str;
}

/// What a handler wants done with the committed sub-path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubPathUpdate {
    /// Keep the current sub-path. A state change still clears it.
    Keep,
    /// Commit a new sub-path that starts on the agent's tile.
    Replace(Vec<CellCoord>),
    /// Drop the current sub-path.
    Clear,
}

/// Placement request attached to a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementOrder {
    /// Tile to withdraw to.
    pub withdrawal: CellCoord,
    /// Path from the agent's tile to the withdrawal tile, inclusive.
    pub retreat: Vec<CellCoord>,
}

/// Result of one state handler invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition<S> {
    /// State to be in after the decision.
    pub next: S,
    /// Sub-path update.
    pub sub_path: SubPathUpdate,
    /// Hazard placement request, if any.
    pub placement: Option<PlacementOrder>,
}

impl<S> Transition<S> {
    /// Remains in `state` and keeps the sub-path.
    #[must_use]
    pub fn stay(state: S) -> Self {
        Self {
            next: state,
            sub_path: SubPathUpdate::Keep,
            placement: None,
        }
    }

    /// Moves to `state`. The sub-path is cleared if the state changes.
    #[must_use]
    pub fn to(state: S) -> Self {
        Self::stay(state)
    }

    /// Commits `cells` as the new sub-path.
    #[must_use]
    pub fn with_path(mut self, cells: Vec<CellCoord>) -> Self {
        self.sub_path = SubPathUpdate::Replace(cells);
        self
    }

    /// Drops the sub-path.
    #[must_use]
    pub fn clearing_path(mut self) -> Self {
        self.sub_path = SubPathUpdate::Clear;
        self
    }

    /// Requests a placement on the agent's tile followed by `retreat`.
    #[must_use]
    pub fn placing(mut self, withdrawal: CellCoord, retreat: Vec<CellCoord>) -> Self {
        self.placement = Some(PlacementOrder {
            withdrawal,
            retreat,
        });
        self
    }
}

/// Archetype-specific strategy driven by the shared agent core.
pub trait Archetype {
    /// Behaviour states of the archetype.
    type State: BehaviorState;

    /// Which archetype this is.
    fn kind(&self) -> ArchetypeKind;

    /// Knobs consumed by the shared core.
    fn tuning(&self) -> &CommonTuning;

    /// State a fresh or reset agent starts in.
    fn default_state(&self) -> Self::State;

    /// Planning state entered after the stuck monitor trips.
    fn fallback_state(&self) -> Self::State;

    /// State entered when the agent's tile becomes dangerous.
    fn evading_state(&self) -> Self::State;

    /// State the agent is held in after placing a hazard.
    fn retreat_state(&self) -> Self::State;

    /// Clears archetype-private scratch state.
    fn reset(&mut self) {}

    /// Runs the handler of `state`.
    fn decide_in_state(
        &mut self,
        state: Self::State,
        memory: &mut AgentMemory<Self::State>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<Self::State>;
}

/// Per-decision bundle of everything a handler may observe.
pub struct Senses<'s, 'a> {
    /// Snapshot the decision is based on.
    pub snapshot: &'s ArenaSnapshot<'a>,
    /// Hazard predictor over the snapshot.
    pub predictor: HazardPredictor<'a>,
    /// Shared knobs of the deciding agent.
    pub tuning: CommonTuning,
    rng: &'s mut ChaCha8Rng,
}

impl fmt::Debug for Senses<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Senses")
            .field("now", &self.snapshot.now)
            .field("position", &self.snapshot.me.cell)
            .finish_non_exhaustive()
    }
}

impl<'s, 'a> Senses<'s, 'a> {
    /// Bundles the inputs of one decision.
    pub fn new(
        snapshot: &'s ArenaSnapshot<'a>,
        tuning: CommonTuning,
        rng: &'s mut ChaCha8Rng,
    ) -> Self {
        Self {
            snapshot,
            predictor: HazardPredictor::from_snapshot(snapshot),
            tuning,
            rng,
        }
    }

    /// Tile the agent occupies.
    #[must_use]
    pub fn position(&self) -> CellCoord {
        self.snapshot.me.cell
    }

    /// Simulation time of the snapshot.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.snapshot.now
    }

    /// Random source of the deciding agent.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut *self.rng
    }

    /// Returns `true` with probability `probability`.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Reports whether `cell` becomes dangerous within `horizon`.
    #[must_use]
    pub fn is_dangerous(&self, cell: CellCoord, horizon: Duration) -> bool {
        self.predictor.is_dangerous(cell, horizon)
    }

    /// Reports whether the agent's own tile is threatened within the danger
    /// horizon.
    #[must_use]
    pub fn in_danger(&self) -> bool {
        self.is_dangerous(self.position(), self.tuning.danger_horizon())
    }

    /// Reports whether `cell` stays safe for the safety horizon.
    #[must_use]
    pub fn is_safe_haven(&self, cell: CellCoord) -> bool {
        !self.is_dangerous(cell, self.tuning.safety_horizon())
    }

    /// Direct planner bounded to `depth` steps at the transit horizon.
    #[must_use]
    pub fn direct(&self, depth: usize) -> DirectSearch<'a> {
        DirectSearch::new(self.predictor, depth, self.tuning.transit_horizon())
    }

    /// Direct path from the agent to `goal` within the approach depth.
    pub fn direct_path(&mut self, goal: CellCoord) -> Option<Vec<CellCoord>> {
        let search = self.direct(self.tuning.approach_depth);
        search.path_to(self.position(), goal, &mut *self.rng)
    }

    /// Direct path from the agent to the nearest tile accepted by `is_goal`.
    pub fn direct_path_to_first<F>(&mut self, depth: usize, is_goal: F) -> Option<Vec<CellCoord>>
    where
        F: FnMut(CellCoord) -> bool,
    {
        let search = self.direct(depth);
        search.path_to_first(self.position(), is_goal, &mut *self.rng)
    }

    /// Reports whether every remaining step of `path` is still walkable and
    /// its destination still safe.
    #[must_use]
    pub fn path_still_valid(&self, path: &[CellCoord]) -> bool {
        let search = self.direct(path.len());
        let steps_ok = path.iter().skip(1).all(|cell| search.is_passable(*cell));
        steps_ok && path.last().is_some_and(|goal| self.is_safe_haven(*goal))
    }

    /// Long-range route from the agent to `goal` at the configured wall cost.
    #[must_use]
    pub fn route_to(&self, goal: CellCoord) -> Option<Route> {
        self.route_to_with(goal, self.tuning.wall_cost)
    }

    /// Long-range route from the agent to `goal` at a specific wall cost.
    #[must_use]
    pub fn route_to_with(&self, goal: CellCoord, wall_cost: u32) -> Option<Route> {
        plan_route(self.snapshot.map, self.position(), goal, wall_cost)
    }

    /// Escape search from the agent's tile.
    pub fn escape(&mut self, preference: EscapePreference) -> Option<Escape> {
        let search = EscapeSearch {
            max_depth: self.tuning.escape_depth,
            transit_horizon: self.tuning.transit_horizon(),
            safety_horizon: self.tuning.safety_horizon(),
            preference,
        };
        find_escape(self.predictor, self.position(), search, &mut *self.rng)
    }

    /// Placement advisor configured with the agent's policy and horizons.
    #[must_use]
    pub fn advisor(&self) -> PlacementAdvisor {
        PlacementAdvisor::new(
            self.tuning.placement,
            self.tuning.transit_horizon(),
            self.tuning.safety_horizon(),
        )
    }

    /// Asks the placement advisor for a stand tile next to `target`.
    pub fn advise(&mut self, target: CellCoord) -> Result<PlacementPlan, PlacementError> {
        let advisor = self.advisor();
        advisor.advise(
            self.predictor,
            self.position(),
            target,
            self.snapshot.me.blast_radius,
            &mut *self.rng,
        )
    }

    /// Verifies a withdrawal from a placement on `stand`.
    pub fn evaluate_stand(&mut self, stand: CellCoord) -> Option<Withdrawal> {
        let advisor = self.advisor();
        advisor.evaluate_stand(
            self.predictor,
            stand,
            self.snapshot.me.blast_radius,
            &mut *self.rng,
        )
    }

    /// Path to a uniformly chosen safe tile within the roam radius.
    pub fn roam_path(&mut self) -> Option<Vec<CellCoord>> {
        let search = self.direct(self.tuning.roam_radius);
        let start = self.position();
        let flood = search.flood(start, &mut *self.rng);
        let candidates: Vec<CellCoord> = flood
            .order()
            .iter()
            .copied()
            .filter(|cell| *cell != start && self.is_safe_haven(*cell))
            .collect();
        let target = *candidates.choose(&mut *self.rng)?;
        flood.path_to(target)
    }

    /// Closest living opponent by Manhattan distance.
    #[must_use]
    pub fn nearest_opponent(&self) -> Option<CellCoord> {
        let position = self.position();
        self.snapshot
            .opponents
            .iter()
            .copied()
            .min_by_key(|opponent| opponent.manhattan_distance(position))
    }

    /// Direct path to a tile adjacent to, or on, `target`.
    pub fn path_next_to(&mut self, target: CellCoord) -> Option<Vec<CellCoord>> {
        let map = self.snapshot.map;
        let adjacent: Vec<CellCoord> = cardinal_neighbors(map, target).collect();
        let depth = self.tuning.approach_depth;
        self.direct_path_to_first(depth, |cell| cell == target || adjacent.contains(&cell))
    }

    /// Reports whether the agent may place a hazard right now.
    #[must_use]
    pub fn can_place(&self) -> bool {
        self.snapshot.me.remaining_placements() > 0
            && self.snapshot.hazard_at(self.position()).is_none()
    }

    /// Collectible lying on `cell`, if any.
    #[must_use]
    pub fn item_at(&self, cell: CellCoord) -> Option<Item> {
        self.snapshot.item_at(cell).copied()
    }
}
