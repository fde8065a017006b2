//! Resource-greedy archetype.
//!
//! The agent periodically rescans the arena and walks to the target with the
//! best value per step: items first, with upgrades discounted once the agent
//! already holds enough of them, and destructible walls as a weak fallback
//! because they may hide items. When neither items nor walls remain it
//! switches to hunting the opponent through repeated place-and-withdraw
//! chains.

use std::time::Duration;

use bomb_arena_core::{AgentStatus, CellCoord, Item, ItemKind};
use bomb_arena_navigation::grid::cardinal_neighbors;
use tracing::{debug, trace};

use crate::archetype::{Archetype, BehaviorState, Senses, Transition};
use crate::config::{CommonTuning, ItemFocusedTuning};
use crate::memory::AgentMemory;
use crate::tactics::{begin_engagement, evade, hold_retreat, pursue_engagement, EngagementStep};
use crate::ArchetypeKind;

/// Behaviour states of the item-focused archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemFocusedState {
    /// Scores every reachable target and picks the best.
    Scanning,
    /// Turns the chosen goal into a path or placement plan.
    PlanningPath,
    /// Follows the plan toward the goal.
    MovingToTarget,
    /// Waits when nothing is worth pursuing.
    NoTargetIdle,
    /// Withdraws after placing a hazard.
    RetreatAfterPlacement,
    /// Flees a threatened tile.
    Evading,
}

impl BehaviorState for ItemFocusedState {
    fn name(self) -> &'static str {
        match self {
            ItemFocusedState::Scanning => "scanning",
            ItemFocusedState::PlanningPath => "planning_path",
            ItemFocusedState::MovingToTarget => "moving_to_target",
            ItemFocusedState::NoTargetIdle => "no_target_idle",
            ItemFocusedState::RetreatAfterPlacement => "retreat_after_placement",
            ItemFocusedState::Evading => "evading",
        }
    }
}

/// What the item-focused agent is currently after.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    /// Collect an item.
    Item(Item),
    /// Bomb a destructible wall.
    Wall(CellCoord),
    /// Place next to an opponent.
    Hunt(CellCoord),
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    goal: Goal,
    score: f64,
    length: usize,
}

impl Candidate {
    /// Higher score wins, equal scores prefer the shorter path.
    fn beats(&self, other: &Candidate) -> bool {
        if self.score > other.score {
            return true;
        }
        self.score == other.score && self.length < other.length
    }
}

/// Value of a target discounted by the steps needed to reach it.
fn value_per_step(value: f64, length: usize, epsilon: f64) -> f64 {
    value / (length as f64 + epsilon)
}

/// Item-focused archetype strategy.
#[derive(Clone, Debug)]
pub struct ItemFocused {
    tuning: ItemFocusedTuning,
    goal: Option<Goal>,
    hunting: bool,
    last_scan: Option<Duration>,
}

impl ItemFocused {
    /// Creates the strategy with the provided knobs.
    #[must_use]
    pub fn new(tuning: ItemFocusedTuning) -> Self {
        Self {
            tuning,
            goal: None,
            hunting: false,
            last_scan: None,
        }
    }

    /// Goal chosen by the last scan.
    #[must_use]
    pub fn goal(&self) -> Option<Goal> {
        self.goal
    }

    /// Reports whether the end-game hunting mode is active.
    #[must_use]
    pub fn is_hunting(&self) -> bool {
        self.hunting
    }

    /// Value of collecting an item of `kind` given the agent's current stock.
    #[must_use]
    pub fn item_value(&self, kind: ItemKind, me: &AgentStatus) -> f64 {
        let tuning = &self.tuning;
        let (value, saturated) = match kind {
            ItemKind::Score => (tuning.score_value, false),
            ItemKind::Capacity => (tuning.capacity_value, me.capacity >= tuning.capacity_cap),
            ItemKind::Range => (tuning.range_value, me.blast_radius >= tuning.range_cap),
            ItemKind::Life => (tuning.life_value, me.lives >= tuning.life_cap),
        };
        if saturated {
            value * tuning.saturated_factor
        } else {
            value
        }
    }

    fn scan(
        &mut self,
        memory: &mut AgentMemory<ItemFocusedState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ItemFocusedState> {
        if senses.in_danger() {
            return Transition::to(ItemFocusedState::Evading);
        }
        if !memory.cooldown.is_ready() {
            return Transition::to(ItemFocusedState::RetreatAfterPlacement);
        }
        memory.clear_plans();
        self.last_scan = Some(senses.now());

        let exhausted =
            senses.snapshot.items.is_empty() && senses.snapshot.map.destructible_count() == 0;
        if exhausted && !self.hunting {
            debug!(agent = senses.snapshot.me.id.get(), "arena exhausted, hunting");
            self.hunting = true;
        }

        self.goal = if self.hunting {
            senses.nearest_opponent().map(Goal::Hunt)
        } else {
            self.best_candidate(senses).map(|candidate| candidate.goal)
        };

        match self.goal {
            Some(goal) => {
                memory.target = Some(goal_cell(goal));
                Transition::to(ItemFocusedState::PlanningPath).clearing_path()
            }
            None => Transition::to(ItemFocusedState::NoTargetIdle).clearing_path(),
        }
    }

    fn best_candidate(&self, senses: &mut Senses<'_, '_>) -> Option<Candidate> {
        let position = senses.position();
        let search = senses.direct(senses.tuning.approach_depth);
        let flood = search.flood(position, senses.rng());
        let epsilon = self.tuning.path_epsilon;
        let me = senses.snapshot.me;
        let mut best: Option<Candidate> = None;
        let mut consider = |candidate: Candidate| {
            if best.map_or(true, |current| candidate.beats(&current)) {
                best = Some(candidate);
            }
        };

        for item in senses.snapshot.items {
            let Some(length) = flood.depth(item.cell) else {
                continue;
            };
            if length == 0 {
                continue;
            }
            consider(Candidate {
                goal: Goal::Item(*item),
                score: value_per_step(self.item_value(item.kind, &me), length, epsilon),
                length,
            });
        }

        if senses.can_place() {
            let map = senses.snapshot.map;
            let mut walls: Vec<(usize, CellCoord)> = map
                .destructible_cells()
                .filter_map(|wall| {
                    cardinal_neighbors(map, wall)
                        .filter_map(|stand| flood.depth(stand))
                        .min()
                        .map(|depth| (depth + 1, wall))
                })
                .collect();
            walls.sort_by_key(|(length, wall)| (*length, wall.row(), wall.column()));
            for (length, wall) in walls.into_iter().take(self.tuning.wall_candidates) {
                consider(Candidate {
                    goal: Goal::Wall(wall),
                    score: value_per_step(self.tuning.wall_value, length, epsilon),
                    length,
                });
            }
        }

        best
    }

    fn plan(
        &mut self,
        memory: &mut AgentMemory<ItemFocusedState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ItemFocusedState> {
        let Some(goal) = self.goal else {
            return Transition::to(ItemFocusedState::Scanning);
        };

        match goal {
            Goal::Item(item) => {
                if senses.item_at(item.cell) != Some(item) {
                    return Transition::to(ItemFocusedState::Scanning);
                }
                match senses.direct_path(item.cell) {
                    Some(path) => Transition::to(ItemFocusedState::MovingToTarget).with_path(path),
                    None => Transition::to(ItemFocusedState::Scanning),
                }
            }
            Goal::Wall(wall) => {
                if !senses.snapshot.map.is_destructible(wall) || !senses.can_place() {
                    return Transition::to(ItemFocusedState::Scanning);
                }
                match senses.advise(wall) {
                    Ok(plan) => begin_engagement(memory, plan, ItemFocusedState::MovingToTarget),
                    Err(error) => {
                        trace!(%error, ?wall, "wall goal dropped");
                        Transition::to(ItemFocusedState::Scanning)
                    }
                }
            }
            Goal::Hunt(_) => {
                let Some(opponent) = senses.nearest_opponent() else {
                    return Transition::to(ItemFocusedState::Scanning);
                };
                self.goal = Some(Goal::Hunt(opponent));
                memory.target = Some(opponent);
                if senses.can_place() {
                    if let Ok(plan) = senses.advise(opponent) {
                        return begin_engagement(memory, plan, ItemFocusedState::MovingToTarget);
                    }
                }
                match senses.path_next_to(opponent) {
                    Some(path) if path.len() > 1 => {
                        Transition::to(ItemFocusedState::MovingToTarget).with_path(path)
                    }
                    _ => Transition::to(ItemFocusedState::NoTargetIdle).clearing_path(),
                }
            }
        }
    }

    fn move_to_target(
        &mut self,
        memory: &mut AgentMemory<ItemFocusedState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ItemFocusedState> {
        let Some(goal) = self.goal else {
            return Transition::to(ItemFocusedState::Scanning);
        };

        match goal {
            Goal::Item(item) => {
                let rescan_due = self.last_scan.map_or(true, |last| {
                    senses.now().saturating_sub(last) >= self.tuning.rescan_interval()
                });
                let item_present = senses.item_at(item.cell) == Some(item);
                if !item_present || !memory.has_active_path() || rescan_due {
                    return Transition::to(ItemFocusedState::Scanning);
                }
                Transition::stay(ItemFocusedState::MovingToTarget)
            }
            Goal::Wall(wall) => {
                let Some(engagement) = memory.engagement else {
                    return Transition::to(ItemFocusedState::Scanning);
                };
                if !senses.snapshot.map.is_destructible(wall) {
                    return Transition::to(ItemFocusedState::Scanning);
                }
                match pursue_engagement(memory, senses, engagement, ItemFocusedState::MovingToTarget)
                {
                    EngagementStep::Act(transition) => transition,
                    EngagementStep::Replan => Transition::to(ItemFocusedState::Scanning),
                }
            }
            Goal::Hunt(_) => {
                let Some(opponent) = senses.nearest_opponent() else {
                    return Transition::to(ItemFocusedState::Scanning);
                };
                let Some(engagement) = memory.engagement else {
                    if memory.has_active_path() {
                        return Transition::stay(ItemFocusedState::MovingToTarget);
                    }
                    return Transition::to(ItemFocusedState::PlanningPath);
                };
                if opponent.manhattan_distance(engagement.target) > 1 {
                    return Transition::to(ItemFocusedState::PlanningPath);
                }
                match pursue_engagement(memory, senses, engagement, ItemFocusedState::MovingToTarget)
                {
                    EngagementStep::Act(transition) => transition,
                    EngagementStep::Replan => Transition::to(ItemFocusedState::PlanningPath),
                }
            }
        }
    }

    fn idle(
        &mut self,
        memory: &mut AgentMemory<ItemFocusedState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ItemFocusedState> {
        if senses.now().saturating_sub(memory.state_entered) >= self.tuning.idle_duration() {
            return Transition::to(ItemFocusedState::Scanning);
        }
        Transition::stay(ItemFocusedState::NoTargetIdle).clearing_path()
    }
}

fn goal_cell(goal: Goal) -> CellCoord {
    match goal {
        Goal::Item(item) => item.cell,
        Goal::Wall(cell) | Goal::Hunt(cell) => cell,
    }
}

impl Archetype for ItemFocused {
    type State = ItemFocusedState;

    fn kind(&self) -> ArchetypeKind {
        ArchetypeKind::ItemFocused
    }

    fn tuning(&self) -> &CommonTuning {
        &self.tuning.common
    }

    fn default_state(&self) -> ItemFocusedState {
        ItemFocusedState::Scanning
    }

    fn fallback_state(&self) -> ItemFocusedState {
        ItemFocusedState::Scanning
    }

    fn evading_state(&self) -> ItemFocusedState {
        ItemFocusedState::Evading
    }

    fn retreat_state(&self) -> ItemFocusedState {
        ItemFocusedState::RetreatAfterPlacement
    }

    fn reset(&mut self) {
        self.goal = None;
        self.hunting = false;
        self.last_scan = None;
    }

    fn decide_in_state(
        &mut self,
        state: ItemFocusedState,
        memory: &mut AgentMemory<ItemFocusedState>,
        senses: &mut Senses<'_, '_>,
    ) -> Transition<ItemFocusedState> {
        match state {
            ItemFocusedState::Scanning => self.scan(memory, senses),
            ItemFocusedState::PlanningPath => self.plan(memory, senses),
            ItemFocusedState::MovingToTarget => self.move_to_target(memory, senses),
            ItemFocusedState::NoTargetIdle => self.idle(memory, senses),
            ItemFocusedState::RetreatAfterPlacement => hold_retreat(
                memory,
                senses,
                ItemFocusedState::RetreatAfterPlacement,
                ItemFocusedState::Scanning,
            ),
            ItemFocusedState::Evading => {
                let safe = if memory.cooldown.is_ready() {
                    ItemFocusedState::Scanning
                } else {
                    ItemFocusedState::RetreatAfterPlacement
                };
                let preference = senses.tuning.escape_preference;
                evade(memory, senses, preference, ItemFocusedState::Evading, safe)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bomb_arena_core::AgentId;

    fn status(capacity: u32, blast_radius: u32, lives: u32) -> AgentStatus {
        AgentStatus {
            id: AgentId::new(0),
            cell: CellCoord::new(1, 1),
            capacity,
            active_hazards: 0,
            blast_radius,
            lives,
            score: 0,
        }
    }

    #[test]
    fn upgrades_outrank_score_until_saturated() {
        let strategy = ItemFocused::new(ItemFocusedTuning::default());
        let fresh = status(1, 1, 1);
        assert!(
            strategy.item_value(ItemKind::Capacity, &fresh)
                > strategy.item_value(ItemKind::Score, &fresh)
        );

        let stocked = status(8, 8, 8);
        for kind in [ItemKind::Capacity, ItemKind::Range, ItemKind::Life] {
            assert!(
                strategy.item_value(kind, &stocked) < strategy.item_value(kind, &fresh),
                "{kind:?} should be discounted once saturated"
            );
        }
        assert_eq!(
            strategy.item_value(ItemKind::Score, &stocked),
            strategy.item_value(ItemKind::Score, &fresh)
        );
    }

    #[test]
    fn value_is_discounted_by_path_length() {
        let near = value_per_step(6.0, 2, 0.5);
        let far = value_per_step(6.0, 10, 0.5);
        assert!(near > far);
        assert!((near - 2.4).abs() < 1e-9);
    }

    #[test]
    fn equal_scores_prefer_the_shorter_path() {
        let short = Candidate {
            goal: Goal::Wall(CellCoord::new(1, 1)),
            score: 1.0,
            length: 2,
        };
        let long = Candidate {
            goal: Goal::Wall(CellCoord::new(5, 5)),
            score: 1.0,
            length: 6,
        };
        assert!(short.beats(&long));
        assert!(!long.beats(&short));
        let better = Candidate { score: 2.0, ..long };
        assert!(better.beats(&short));
    }
}
