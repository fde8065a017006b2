//! Priority-cascade controller.
//!
//! Each evaluation walks a fixed priority list: own danger, post-placement
//! retreat, engaging a reachable opponent, collecting a nearby item, clearing
//! walls toward an unreachable opponent, waiting and finally patrolling.

use bomb_arena_core::CellCoord;
use bomb_arena_navigation::in_blast_line;
use tracing::trace;

use crate::archetype::{Archetype, BehaviorState, Senses, Transition};
use crate::config::{BaselineTuning, CommonTuning};
use crate::memory::{AgentMemory, CommittedPath};
use crate::tactics::{begin_engagement, evade, hold_retreat, pursue_engagement, EngagementStep};
use crate::ArchetypeKind;

/// Behaviour states of the baseline controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BaselineState {
    /// Runs the priority cascade.
    EvaluateSituation,
    /// Flees a threatened tile.
    CriticalEscape,
    /// Withdraws after placing a hazard.
    TacticalRetreat,
    /// Moves to a stand tile next to the opponent and places.
    EngageTarget,
    /// Walks to an item.
    CollectPowerup,
    /// Clears a wall that blocks the way to the opponent.
    StrategicBombingForPath,
    /// Waits briefly for the situation to change.
    AwaitOpportunity,
    /// Walks to a random safe tile.
    Patrol,
}

impl BehaviorState for BaselineState {
    fn name(self) -> &'static str {
        match self {
            BaselineState::EvaluateSituation => "evaluate_situation",
            BaselineState::CriticalEscape => "critical_escape",
            BaselineState::TacticalRetreat => "tactical_retreat",
            BaselineState::EngageTarget => "engage_target",
            BaselineState::CollectPowerup => "collect_powerup",
            BaselineState::StrategicBombingForPath => "strategic_bombing_for_path",
            BaselineState::AwaitOpportunity => "await_opportunity",
            BaselineState::Patrol => "patrol",
        }
    }
}

/// Baseline archetype strategy.
#[derive(Clone, Debug)]
pub struct Baseline {
    tuning: BaselineTuning,
    unreachable_for: u32,
}

impl Baseline {
    /// Creates the strategy with the provided knobs.
    #[must_use]
    pub fn new(tuning: BaselineTuning) -> Self {
        Self {
            tuning,
            unreachable_for: 0,
        }
    }

    fn evaluate(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        if senses.in_danger() {
            return Transition::to(BaselineState::CriticalEscape);
        }
        if !memory.cooldown.is_ready() {
            return Transition::to(BaselineState::TacticalRetreat);
        }

        memory.clear_plans();
        let position = senses.position();
        let opponent = senses.nearest_opponent();

        if let Some(opponent) = opponent {
            let close = opponent.manhattan_distance(position) <= self.tuning.engage_distance;
            if close && senses.can_place() {
                match senses.advise(opponent) {
                    Ok(plan) => {
                        self.unreachable_for = 0;
                        return begin_engagement(memory, plan, BaselineState::EngageTarget);
                    }
                    Err(error) => trace!(%error, "engagement not possible"),
                }
            }
        }

        if let Some((item, path)) = self.nearest_item(senses) {
            memory.target = Some(item);
            return Transition::to(BaselineState::CollectPowerup).with_path(path);
        }

        if let Some(opponent) = opponent {
            if senses.path_next_to(opponent).is_none() {
                self.unreachable_for += 1;
            } else {
                self.unreachable_for = 0;
            }

            if self.unreachable_for >= self.tuning.unreachable_patience && senses.can_place() {
                if let Some(transition) = self.clear_path_toward(memory, senses, opponent) {
                    self.unreachable_for = 0;
                    return transition;
                }
            }
        }

        if senses.chance(self.tuning.await_probability) {
            return Transition::to(BaselineState::AwaitOpportunity).clearing_path();
        }

        match senses.roam_path() {
            Some(path) => Transition::to(BaselineState::Patrol).with_path(path),
            None => Transition::stay(BaselineState::EvaluateSituation).clearing_path(),
        }
    }

    fn nearest_item(&self, senses: &mut Senses<'_, '_>) -> Option<(CellCoord, Vec<CellCoord>)> {
        let position = senses.position();
        let radius = self.tuning.item_radius;
        let mut candidates: Vec<CellCoord> = senses
            .snapshot
            .items
            .iter()
            .map(|item| item.cell)
            .filter(|cell| cell.manhattan_distance(position) <= radius)
            .collect();
        candidates.sort_by_key(|cell| cell.manhattan_distance(position));

        let depth = senses.tuning.approach_depth;
        let path = senses.direct_path_to_first(depth, |cell| candidates.contains(&cell))?;
        let goal = *path.last()?;
        (goal != position).then_some((goal, path))
    }

    fn clear_path_toward(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
        opponent: CellCoord,
    ) -> Option<Transition<BaselineState>> {
        let route = senses.route_to(opponent)?;
        let (_, wall) = route.first_obstacle(senses.snapshot.map)?;
        match senses.advise(wall) {
            Ok(plan) => {
                memory.route = CommittedPath::new(route.cells);
                Some(begin_engagement(
                    memory,
                    plan,
                    BaselineState::StrategicBombingForPath,
                ))
            }
            Err(error) => {
                trace!(%error, ?wall, "cannot clear wall toward opponent");
                None
            }
        }
    }

    fn engage(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        let Some(engagement) = memory.engagement else {
            return Transition::to(BaselineState::EvaluateSituation);
        };

        let position = senses.position();
        let map = senses.snapshot.map;
        let radius = senses.snapshot.me.blast_radius;
        let opponents = &senses.snapshot.opponents;
        let target_valid = if position == engagement.stand {
            opponents
                .iter()
                .any(|opponent| in_blast_line(map, position, *opponent, radius))
        } else {
            opponents
                .iter()
                .any(|opponent| opponent.manhattan_distance(engagement.target) <= 1)
        };

        if !target_valid {
            memory.attempts += 1;
            if memory.attempts > self.tuning.engage_attempts || !senses.can_place() {
                return Transition::to(BaselineState::EvaluateSituation);
            }
            let Some(opponent) = senses.nearest_opponent() else {
                return Transition::to(BaselineState::EvaluateSituation);
            };
            return match senses.advise(opponent) {
                Ok(plan) => begin_engagement(memory, plan, BaselineState::EngageTarget),
                Err(_) => Transition::to(BaselineState::EvaluateSituation),
            };
        }

        match pursue_engagement(memory, senses, engagement, BaselineState::EngageTarget) {
            EngagementStep::Act(transition) => transition,
            EngagementStep::Replan => Transition::to(BaselineState::EvaluateSituation),
        }
    }

    fn bomb_for_path(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        let Some(engagement) = memory.engagement else {
            return Transition::to(BaselineState::EvaluateSituation);
        };
        if !senses.snapshot.map.is_destructible(engagement.target) {
            return Transition::to(BaselineState::EvaluateSituation);
        }

        match pursue_engagement(
            memory,
            senses,
            engagement,
            BaselineState::StrategicBombingForPath,
        ) {
            EngagementStep::Act(transition) => transition,
            EngagementStep::Replan => Transition::to(BaselineState::EvaluateSituation),
        }
    }

    fn collect(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        let item_present = memory
            .target
            .is_some_and(|cell| senses.item_at(cell).is_some());
        if !item_present || !memory.has_active_path() {
            return Transition::to(BaselineState::EvaluateSituation);
        }
        Transition::stay(BaselineState::CollectPowerup)
    }

    fn await_opportunity(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        let waited = senses.now().saturating_sub(memory.state_entered);
        let opponent_close = senses.nearest_opponent().is_some_and(|opponent| {
            opponent.manhattan_distance(senses.position()) <= self.tuning.engage_distance
        });
        if waited >= self.tuning.await_duration() || (opponent_close && senses.can_place()) {
            return Transition::to(BaselineState::EvaluateSituation);
        }
        Transition::stay(BaselineState::AwaitOpportunity).clearing_path()
    }

    fn patrol(
        &mut self,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        let opponent_close = senses.nearest_opponent().is_some_and(|opponent| {
            opponent.manhattan_distance(senses.position()) <= self.tuning.engage_distance
        });
        if !memory.has_active_path() || (opponent_close && senses.can_place()) {
            return Transition::to(BaselineState::EvaluateSituation);
        }
        Transition::stay(BaselineState::Patrol)
    }
}

impl Archetype for Baseline {
    type State = BaselineState;

    fn kind(&self) -> ArchetypeKind {
        ArchetypeKind::Baseline
    }

    fn tuning(&self) -> &CommonTuning {
        &self.tuning.common
    }

    fn default_state(&self) -> BaselineState {
        BaselineState::EvaluateSituation
    }

    fn fallback_state(&self) -> BaselineState {
        BaselineState::EvaluateSituation
    }

    fn evading_state(&self) -> BaselineState {
        BaselineState::CriticalEscape
    }

    fn retreat_state(&self) -> BaselineState {
        BaselineState::TacticalRetreat
    }

    fn reset(&mut self) {
        self.unreachable_for = 0;
    }

    fn decide_in_state(
        &mut self,
        state: BaselineState,
        memory: &mut AgentMemory<BaselineState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<BaselineState> {
        match state {
            BaselineState::EvaluateSituation => self.evaluate(memory, senses),
            BaselineState::CriticalEscape => {
                let safe = if memory.cooldown.is_ready() {
                    BaselineState::EvaluateSituation
                } else {
                    BaselineState::TacticalRetreat
                };
                let preference = senses.tuning.escape_preference;
                evade(
                    memory,
                    senses,
                    preference,
                    BaselineState::CriticalEscape,
                    safe,
                )
            }
            BaselineState::TacticalRetreat => hold_retreat(
                memory,
                senses,
                BaselineState::TacticalRetreat,
                BaselineState::EvaluateSituation,
            ),
            BaselineState::EngageTarget => self.engage(memory, senses),
            BaselineState::CollectPowerup => self.collect(memory, senses),
            BaselineState::StrategicBombingForPath => self.bomb_for_path(memory, senses),
            BaselineState::AwaitOpportunity => self.await_opportunity(memory, senses),
            BaselineState::Patrol => self.patrol(memory, senses),
        }
    }
}
