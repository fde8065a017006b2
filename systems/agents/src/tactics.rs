//! Handler building blocks shared by several archetypes.

use bomb_arena_navigation::{EscapePreference, PlacementPlan};

use crate::archetype::{BehaviorState, Senses, Transition};
use crate::memory::{AgentMemory, Engagement};

/// Flees the agent's tile.
///
/// A committed path that still leads to a safe tile is kept. Once the tile
/// is no longer threatened the agent moves to `safe_state`.
pub(crate) fn evade<S: BehaviorState>(
    memory: &AgentMemory<S>,
    senses: &mut Senses<'_, '_>,
    preference: EscapePreference,
    evading: S,
    safe_state: S,
) -> Transition<S> {
    if !senses.in_danger() {
        return Transition::to(safe_state).clearing_path();
    }

    if let Some(path) = memory.sub_path.as_ref() {
        if !path.is_finished() && senses.path_still_valid(path.remaining()) {
            return Transition::stay(evading).with_path(path.remaining().to_vec());
        }
    }

    match senses.escape(preference) {
        Some(escape) if escape.path.len() > 1 => Transition::stay(evading).with_path(escape.path),
        _ => Transition::stay(evading).clearing_path(),
    }
}

/// Walks the post-placement retreat and waits until the cooldown clears.
pub(crate) fn hold_retreat<S: BehaviorState>(
    memory: &AgentMemory<S>,
    senses: &mut Senses<'_, '_>,
    retreat: S,
    exit_state: S,
) -> Transition<S> {
    if memory.cooldown.is_ready() {
        return Transition::to(exit_state);
    }

    if memory.has_active_path() {
        return Transition::stay(retreat);
    }

    if senses.is_safe_haven(senses.position()) {
        return Transition::stay(retreat).clearing_path();
    }

    match senses.escape(EscapePreference::Nearest) {
        Some(escape) if escape.path.len() > 1 => Transition::stay(retreat).with_path(escape.path),
        _ => Transition::stay(retreat).clearing_path(),
    }
}

/// Progress of an engagement toward its stand tile.
#[derive(Debug)]
pub(crate) enum EngagementStep<S> {
    /// The handler should return this transition.
    Act(Transition<S>),
    /// The engagement cannot continue and should be re-planned.
    Replan,
}

/// Approaches the stand tile of `engagement` and places once on it.
pub(crate) fn pursue_engagement<S: BehaviorState>(
    memory: &AgentMemory<S>,
    senses: &mut Senses<'_, '_>,
    engagement: Engagement,
    state: S,
) -> EngagementStep<S> {
    let position = senses.position();

    if position == engagement.stand {
        if !senses.can_place() {
            return EngagementStep::Replan;
        }
        return match senses.evaluate_stand(position) {
            Some(withdrawal) => EngagementStep::Act(
                Transition::stay(state).placing(withdrawal.tile, withdrawal.path),
            ),
            None => EngagementStep::Replan,
        };
    }

    if let Some(path) = memory.sub_path.as_ref() {
        if !path.is_finished() && path.goal() == engagement.stand {
            return EngagementStep::Act(Transition::stay(state));
        }
    }

    match senses.direct_path(engagement.stand) {
        Some(path) => EngagementStep::Act(Transition::stay(state).with_path(path)),
        None => EngagementStep::Replan,
    }
}

/// Commits to a placement plan, placing right away when already in position.
pub(crate) fn begin_engagement<S: BehaviorState>(
    memory: &mut AgentMemory<S>,
    plan: PlacementPlan,
    state: S,
) -> Transition<S> {
    memory.engagement = Some(Engagement {
        target: plan.target,
        stand: plan.stand,
        withdrawal: plan.withdrawal,
    });
    memory.target = Some(plan.target);

    if plan.is_in_position() {
        Transition::to(state).placing(plan.withdrawal, plan.retreat)
    } else {
        Transition::to(state).with_path(plan.approach)
    }
}
