//! Cautious archetype.
//!
//! Roams between safe tiles and only occasionally bombs a nearby wall, and
//! then only when the withdrawal leaves several safe options. After its own
//! blast clears it waits a little longer before moving on.

use bomb_arena_core::CellCoord;
use tracing::trace;

use crate::archetype::{Archetype, BehaviorState, Senses, Transition};
use crate::config::{CommonTuning, ConservativeTuning};
use crate::memory::AgentMemory;
use crate::tactics::{begin_engagement, evade, hold_retreat, pursue_engagement, EngagementStep};
use crate::ArchetypeKind;

/// Behaviour states of the conservative archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConservativeState {
    /// Picks the next roam destination or decides to bomb a wall.
    PlanningRoam,
    /// Walks to a roam destination.
    Roaming,
    /// Looks for a wall worth bombing.
    AssessingObstacle,
    /// Moves to the stand tile of a chosen wall.
    MovingToBombObstacle,
    /// Withdraws after placing and waits until the blast is over.
    TacticalRetreatAndWait,
    /// Flees a threatened tile toward open ground.
    EvadingDanger,
    /// Pauses when there is nowhere to go.
    Idle,
}

impl BehaviorState for ConservativeState {
    fn name(self) -> &'static str {
        match self {
            ConservativeState::PlanningRoam => "planning_roam",
            ConservativeState::Roaming => "roaming",
            ConservativeState::AssessingObstacle => "assessing_obstacle",
            ConservativeState::MovingToBombObstacle => "moving_to_bomb_obstacle",
            ConservativeState::TacticalRetreatAndWait => "tactical_retreat_and_wait",
            ConservativeState::EvadingDanger => "evading_danger",
            ConservativeState::Idle => "idle",
        }
    }
}

/// Conservative archetype strategy.
#[derive(Clone, Debug)]
pub struct Conservative {
    tuning: ConservativeTuning,
}

impl Conservative {
    /// Creates the strategy with the provided knobs.
    #[must_use]
    pub fn new(tuning: ConservativeTuning) -> Self {
        Self { tuning }
    }

    fn plan_roam(
        &mut self,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        if senses.in_danger() {
            return Transition::to(ConservativeState::EvadingDanger);
        }
        if !memory.cooldown.is_ready() {
            return Transition::to(ConservativeState::TacticalRetreatAndWait);
        }
        memory.clear_plans();

        if senses.can_place() && senses.chance(self.tuning.obstacle_probability) {
            return Transition::to(ConservativeState::AssessingObstacle).clearing_path();
        }

        match senses.roam_path() {
            Some(path) => Transition::to(ConservativeState::Roaming).with_path(path),
            None => Transition::to(ConservativeState::Idle).clearing_path(),
        }
    }

    fn assess_obstacle(
        &mut self,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        if !senses.can_place() {
            return Transition::to(ConservativeState::PlanningRoam);
        }

        for wall in nearby_walls(senses, self.tuning.obstacle_scan_radius) {
            match senses.advise(wall) {
                Ok(plan) => {
                    return begin_engagement(memory, plan, ConservativeState::MovingToBombObstacle)
                }
                Err(error) => trace!(%error, ?wall, "wall rejected"),
            }
        }
        Transition::to(ConservativeState::PlanningRoam).clearing_path()
    }

    fn move_to_obstacle(
        &mut self,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        let Some(engagement) = memory.engagement else {
            return Transition::to(ConservativeState::PlanningRoam);
        };
        if !senses.snapshot.map.is_destructible(engagement.target) {
            return Transition::to(ConservativeState::PlanningRoam);
        }
        match pursue_engagement(
            memory,
            senses,
            engagement,
            ConservativeState::MovingToBombObstacle,
        ) {
            EngagementStep::Act(transition) => transition,
            EngagementStep::Replan => Transition::to(ConservativeState::PlanningRoam),
        }
    }

    fn retreat_and_wait(
        &mut self,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        if !memory.cooldown.is_ready() {
            return hold_retreat(
                memory,
                senses,
                ConservativeState::TacticalRetreatAndWait,
                ConservativeState::TacticalRetreatAndWait,
            );
        }
        let waited_enough = memory.cooldown_cleared_at.map_or(true, |cleared| {
            senses.now().saturating_sub(cleared) >= self.tuning.wait_after_blast()
        });
        if waited_enough {
            Transition::to(ConservativeState::PlanningRoam)
        } else {
            Transition::stay(ConservativeState::TacticalRetreatAndWait).clearing_path()
        }
    }

    fn idle(
        &mut self,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        if senses.now().saturating_sub(memory.state_entered) >= self.tuning.idle_duration() {
            return Transition::to(ConservativeState::PlanningRoam);
        }
        Transition::stay(ConservativeState::Idle).clearing_path()
    }
}

/// Destructible walls within `radius` of the agent, nearest first.
fn nearby_walls(senses: &Senses<'_, '_>, radius: u32) -> Vec<CellCoord> {
    let position = senses.position();
    let mut walls: Vec<CellCoord> = senses
        .snapshot
        .map
        .destructible_cells()
        .filter(|wall| wall.manhattan_distance(position) <= radius)
        .collect();
    walls.sort_by_key(|wall| (wall.manhattan_distance(position), wall.row(), wall.column()));
    walls
}

impl Archetype for Conservative {
    type State = ConservativeState;

    fn kind(&self) -> ArchetypeKind {
        ArchetypeKind::Conservative
    }

    fn tuning(&self) -> &CommonTuning {
        &self.tuning.common
    }

    fn default_state(&self) -> ConservativeState {
        ConservativeState::PlanningRoam
    }

    fn fallback_state(&self) -> ConservativeState {
        ConservativeState::PlanningRoam
    }

    fn evading_state(&self) -> ConservativeState {
        ConservativeState::EvadingDanger
    }

    fn retreat_state(&self) -> ConservativeState {
        ConservativeState::TacticalRetreatAndWait
    }

    fn decide_in_state(
        &mut self,
        state: ConservativeState,
        memory: &mut AgentMemory<ConservativeState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ConservativeState> {
        match state {
            ConservativeState::PlanningRoam => self.plan_roam(memory, senses),
            ConservativeState::Roaming => {
                if memory.has_active_path() {
                    Transition::stay(ConservativeState::Roaming)
                } else {
                    Transition::to(ConservativeState::PlanningRoam)
                }
            }
            ConservativeState::AssessingObstacle => self.assess_obstacle(memory, senses),
            ConservativeState::MovingToBombObstacle => self.move_to_obstacle(memory, senses),
            ConservativeState::TacticalRetreatAndWait => self.retreat_and_wait(memory, senses),
            ConservativeState::EvadingDanger => {
                let safe = if memory.cooldown.is_ready() {
                    ConservativeState::PlanningRoam
                } else {
                    ConservativeState::TacticalRetreatAndWait
                };
                let preference = senses.tuning.escape_preference;
                evade(memory, senses, preference, ConservativeState::EvadingDanger, safe)
            }
            ConservativeState::Idle => self.idle(memory, senses),
        }
    }
}
