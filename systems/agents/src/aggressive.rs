//! Archetype that closes distance on the opponent at almost any cost.

use bomb_arena_core::CellCoord;
use bomb_arena_navigation::in_blast_line;
use tracing::trace;

use crate::archetype::{Archetype, BehaviorState, Senses, Transition};
use crate::config::{AggressiveTuning, CommonTuning};
use crate::memory::{AgentMemory, CommittedPath};
use crate::tactics::{begin_engagement, evade, hold_retreat, pursue_engagement, EngagementStep};
use crate::ArchetypeKind;

/// Behaviour states of the aggressive archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggressiveState {
    /// Looks for an opponent, roaming while none is known.
    IdleScan,
    /// Plans a route toward the opponent.
    PlanningPlayer,
    /// Clears a wall on the route toward the opponent.
    ExecuteClearance,
    /// Moves to a stand tile next to the opponent and places.
    Engage,
    /// Close-quarters play with frequent placements.
    Cqc,
    /// Short post-placement withdrawal.
    RetreatShort,
    /// Flees a threatened tile.
    Evading,
}

impl BehaviorState for AggressiveState {
    fn name(self) -> &'static str {
        match self {
            AggressiveState::IdleScan => "idle_scan",
            AggressiveState::PlanningPlayer => "planning_player",
            AggressiveState::ExecuteClearance => "execute_clearance",
            AggressiveState::Engage => "engage",
            AggressiveState::Cqc => "cqc",
            AggressiveState::RetreatShort => "retreat_short",
            AggressiveState::Evading => "evading",
        }
    }
}

/// Aggressive archetype strategy.
#[derive(Clone, Debug)]
pub struct Aggressive {
    tuning: AggressiveTuning,
}

impl Aggressive {
    /// Creates the strategy with the provided knobs.
    #[must_use]
    pub fn new(tuning: AggressiveTuning) -> Self {
        Self { tuning }
    }

    fn within_cqc(&self, senses: &Senses<'_, '_>, opponent: CellCoord) -> bool {
        opponent.manhattan_distance(senses.position()) <= self.tuning.cqc_distance
    }

    fn idle_scan(
        &mut self,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        if senses.nearest_opponent().is_some() {
            return Transition::to(AggressiveState::PlanningPlayer);
        }
        if memory.has_active_path() {
            return Transition::stay(AggressiveState::IdleScan);
        }
        match senses.roam_path() {
            Some(path) => Transition::stay(AggressiveState::IdleScan).with_path(path),
            None => Transition::stay(AggressiveState::IdleScan).clearing_path(),
        }
    }

    fn plan_toward_player(
        &mut self,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        let Some(opponent) = senses.nearest_opponent() else {
            return Transition::to(AggressiveState::IdleScan);
        };
        memory.target = Some(opponent);

        if self.within_cqc(senses, opponent) {
            return Transition::to(AggressiveState::Cqc);
        }

        let Some(route) = senses.route_to_with(opponent, self.tuning.clearance_wall_cost) else {
            trace!(?opponent, "no route toward opponent");
            return Transition::to(AggressiveState::IdleScan);
        };

        if let Some((_, wall)) = route.first_obstacle(senses.snapshot.map) {
            if senses.can_place() {
                match senses.advise(wall) {
                    Ok(plan) => {
                        memory.route = CommittedPath::new(route.cells);
                        return begin_engagement(memory, plan, AggressiveState::ExecuteClearance);
                    }
                    Err(error) => trace!(%error, ?wall, "cannot clear route"),
                }
            }
        } else if senses.can_place() {
            if let Ok(plan) = senses.advise(opponent) {
                memory.route = CommittedPath::new(route.cells);
                return begin_engagement(memory, plan, AggressiveState::Engage);
            }
        }

        let step_target = advance_along(&route.cells, self.tuning.common.approach_depth, |cell| {
            senses.snapshot.map.is_open(cell)
        });
        memory.route = CommittedPath::new(route.cells);
        match step_target.and_then(|cell| senses.direct_path(cell)) {
            Some(path) if path.len() > 1 => {
                Transition::stay(AggressiveState::PlanningPlayer).with_path(path)
            }
            _ => Transition::to(AggressiveState::IdleScan),
        }
    }

    fn clearance(
        &mut self,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        let Some(engagement) = memory.engagement else {
            return Transition::to(AggressiveState::PlanningPlayer);
        };
        if !senses.snapshot.map.is_destructible(engagement.target) {
            return Transition::to(AggressiveState::PlanningPlayer);
        }
        match pursue_engagement(memory, senses, engagement, AggressiveState::ExecuteClearance) {
            EngagementStep::Act(transition) => transition,
            EngagementStep::Replan => Transition::to(AggressiveState::PlanningPlayer),
        }
    }

    fn engage(
        &mut self,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        let Some(opponent) = senses.nearest_opponent() else {
            return Transition::to(AggressiveState::IdleScan);
        };
        if self.within_cqc(senses, opponent) {
            return Transition::to(AggressiveState::Cqc);
        }
        let Some(engagement) = memory.engagement else {
            return Transition::to(AggressiveState::PlanningPlayer);
        };
        if opponent.manhattan_distance(engagement.target) > 1 {
            return Transition::to(AggressiveState::PlanningPlayer);
        }
        match pursue_engagement(memory, senses, engagement, AggressiveState::Engage) {
            EngagementStep::Act(transition) => transition,
            EngagementStep::Replan => Transition::to(AggressiveState::PlanningPlayer),
        }
    }

    fn close_quarters(
        &mut self,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        let Some(opponent) = senses.nearest_opponent() else {
            return Transition::to(AggressiveState::IdleScan);
        };
        let position = senses.position();
        memory.target = Some(opponent);
        if opponent.manhattan_distance(position) > self.tuning.cqc_distance + 1 {
            return Transition::to(AggressiveState::PlanningPlayer);
        }

        let interval_elapsed = memory.last_placement.map_or(true, |last| {
            senses.now().saturating_sub(last) >= self.tuning.cqc_placement_interval()
        });
        let in_line = in_blast_line(
            senses.snapshot.map,
            position,
            opponent,
            senses.snapshot.me.blast_radius,
        );
        if in_line && interval_elapsed && senses.can_place() {
            if let Some(withdrawal) = senses.evaluate_stand(position) {
                return Transition::stay(AggressiveState::Cqc)
                    .placing(withdrawal.tile, withdrawal.path);
            }
        }

        if senses.can_place() {
            if let Ok(plan) = senses.advise(opponent) {
                if plan.is_in_position() {
                    return begin_engagement(memory, plan, AggressiveState::Cqc);
                }
                return Transition::stay(AggressiveState::Cqc).with_path(plan.approach);
            }
        }

        if memory.has_active_path() {
            return Transition::stay(AggressiveState::Cqc);
        }
        match senses.path_next_to(opponent) {
            Some(path) if path.len() > 1 => Transition::stay(AggressiveState::Cqc).with_path(path),
            _ => Transition::stay(AggressiveState::Cqc).clearing_path(),
        }
    }
}

/// Furthest tile along `route`, within `depth` steps, that `is_walkable`
/// accepts without crossing a tile it rejects.
fn advance_along<F>(route: &[CellCoord], depth: usize, mut is_walkable: F) -> Option<CellCoord>
where
    F: FnMut(CellCoord) -> bool,
{
    route
        .iter()
        .take(depth + 1)
        .skip(1)
        .take_while(|cell| is_walkable(**cell))
        .last()
        .copied()
}

impl Archetype for Aggressive {
    type State = AggressiveState;

    fn kind(&self) -> ArchetypeKind {
        ArchetypeKind::Aggressive
    }

    fn tuning(&self) -> &CommonTuning {
        &self.tuning.common
    }

    fn default_state(&self) -> AggressiveState {
        AggressiveState::IdleScan
    }

    fn fallback_state(&self) -> AggressiveState {
        AggressiveState::IdleScan
    }

    fn evading_state(&self) -> AggressiveState {
        AggressiveState::Evading
    }

    fn retreat_state(&self) -> AggressiveState {
        AggressiveState::RetreatShort
    }

    fn decide_in_state(
        &mut self,
        state: AggressiveState,
        memory: &mut AgentMemory<AggressiveState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<AggressiveState> {
        match state {
            AggressiveState::IdleScan => self.idle_scan(memory, senses),
            AggressiveState::PlanningPlayer => self.plan_toward_player(memory, senses),
            AggressiveState::ExecuteClearance => self.clearance(memory, senses),
            AggressiveState::Engage => self.engage(memory, senses),
            AggressiveState::Cqc => self.close_quarters(memory, senses),
            AggressiveState::RetreatShort => hold_retreat(
                memory,
                senses,
                AggressiveState::RetreatShort,
                AggressiveState::PlanningPlayer,
            ),
            AggressiveState::Evading => {
                let safe = if memory.cooldown.is_ready() {
                    AggressiveState::PlanningPlayer
                } else {
                    AggressiveState::RetreatShort
                };
                let preference = senses.tuning.escape_preference;
                evade(memory, senses, preference, AggressiveState::Evading, safe)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_stops_before_the_first_wall() {
        let route = [
            CellCoord::new(1, 1),
            CellCoord::new(2, 1),
            CellCoord::new(3, 1),
            CellCoord::new(4, 1),
        ];
        let wall = CellCoord::new(3, 1);
        assert_eq!(
            advance_along(&route, 10, |cell| cell != wall),
            Some(CellCoord::new(2, 1))
        );
        assert_eq!(
            advance_along(&route, 1, |_| true),
            Some(CellCoord::new(2, 1))
        );
        assert_eq!(advance_along(&route, 10, |cell| cell != route[1]), None);
    }
}
