//! Generic agent core driving one archetype.

use std::fmt;
use std::time::Duration;

use bomb_arena_core::{AgentIntent, ArenaSnapshot, CellCoord, TileStep};
use bomb_arena_navigation::HazardPredictor;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::aggressive::Aggressive;
use crate::archetype::{Archetype, BehaviorState, Senses, SubPathUpdate, Transition};
use crate::baseline::Baseline;
use crate::config::Tunings;
use crate::conservative::Conservative;
use crate::item_focused::ItemFocused;
use crate::memory::{AgentMemory, HazardCooldown, PathSync};

/// Fixed set of agent personalities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeKind {
    /// Priority-cascade controller.
    Baseline,
    /// Closes distance and clears walls toward the opponent.
    Aggressive,
    /// Roams safely and bombs walls only with generous withdrawals.
    Conservative,
    /// Collects the most valuable items, then hunts.
    ItemFocused,
}

impl ArchetypeKind {
    /// Every archetype.
    pub const ALL: [ArchetypeKind; 4] = [
        ArchetypeKind::Baseline,
        ArchetypeKind::Aggressive,
        ArchetypeKind::Conservative,
        ArchetypeKind::ItemFocused,
    ];

    /// Lower-case archetype name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ArchetypeKind::Baseline => "baseline",
            ArchetypeKind::Aggressive => "aggressive",
            ArchetypeKind::Conservative => "conservative",
            ArchetypeKind::ItemFocused => "item_focused",
        }
    }
}

impl fmt::Display for ArchetypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Introspection data for renderers and logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentDebug {
    /// Name of the active state.
    pub state: &'static str,
    /// Remaining tiles of the committed sub-path.
    pub path: Vec<CellCoord>,
    /// Remaining tiles of the committed long-range route.
    pub route: Vec<CellCoord>,
    /// Tile the agent is interested in.
    pub target: Option<CellCoord>,
    /// Number of times the stuck monitor forced a re-plan.
    pub stuck_trips: u32,
}

/// One agent: an archetype strategy plus the memory it operates on.
#[derive(Debug)]
pub struct Agent<A: Archetype> {
    archetype: A,
    memory: AgentMemory<A::State>,
    rng: ChaCha8Rng,
    seed: u64,
    stuck_trips: u32,
}

impl<A: Archetype> Agent<A> {
    /// Creates an agent in its archetype's default state.
    #[must_use]
    pub fn new(archetype: A, seed: u64) -> Self {
        let memory = AgentMemory::new(archetype.default_state(), archetype.tuning());
        Self {
            archetype,
            memory,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            stuck_trips: 0,
        }
    }

    /// Archetype strategy of the agent.
    #[must_use]
    pub fn archetype(&self) -> &A {
        &self.archetype
    }

    /// Memory of the agent.
    #[must_use]
    pub fn memory(&self) -> &AgentMemory<A::State> {
        &self.memory
    }

    /// Active behaviour state.
    #[must_use]
    pub fn state(&self) -> A::State {
        self.memory.state
    }

    /// Reinitialises memory to the default state, as on a round restart.
    pub fn reset(&mut self) {
        self.archetype.reset();
        self.memory = AgentMemory::new(self.archetype.default_state(), self.archetype.tuning());
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.stuck_trips = 0;
    }

    /// Introspection data for renderers and logs.
    #[must_use]
    pub fn debug(&self) -> AgentDebug {
        AgentDebug {
            state: self.memory.state.name(),
            path: self
                .memory
                .sub_path
                .as_ref()
                .map(|path| path.remaining().to_vec())
                .unwrap_or_default(),
            route: self
                .memory
                .route
                .as_ref()
                .map(|route| route.remaining().to_vec())
                .unwrap_or_default(),
            target: self.memory.target,
            stuck_trips: self.stuck_trips,
        }
    }

    /// Produces the intent for one physical tick.
    pub fn decide(&mut self, snapshot: &ArenaSnapshot<'_>) -> AgentIntent {
        let tuning = *self.archetype.tuning();
        let position = snapshot.me.cell;
        let now = snapshot.now;
        let predictor = HazardPredictor::from_snapshot(snapshot);
        let mut force = false;

        if let Some(path) = self.memory.sub_path.as_mut() {
            if path.sync(position) == PathSync::Desynced {
                trace!(agent = snapshot.me.id.get(), ?position, "sub-path desynced");
                self.memory.sub_path = None;
                force = true;
            }
        }
        if let Some(route) = self.memory.route.as_mut() {
            let _ = route.seek(position);
        }
        self.memory.last_position = Some(position);

        if let HazardCooldown::Retreating { origin, since, .. } = self.memory.cooldown {
            let own_hazard_live = snapshot
                .hazards
                .iter()
                .any(|hazard| hazard.origin == origin && hazard.owner == snapshot.me.id);
            let blast_live = predictor.in_active_blast(origin);
            let timed_out = now.saturating_sub(since) >= tuning.retreat_timeout();
            if (!own_hazard_live && !blast_live) || timed_out {
                debug!(agent = snapshot.me.id.get(), timed_out, "post-placement cooldown cleared");
                self.memory.cooldown = HazardCooldown::Ready;
                self.memory.cooldown_cleared_at = Some(now);
                force = true;
            }
        }

        let in_danger = predictor.is_dangerous(position, tuning.danger_horizon());
        let state = if in_danger {
            let evading = self.archetype.evading_state();
            if self.memory.state != evading {
                self.enter(evading, now, snapshot);
            }
            evading
        } else {
            let due = force
                || self
                    .memory
                    .last_decision
                    .map_or(true, |last| now.saturating_sub(last) >= tuning.decision_interval());
            if !due {
                return self.emit(snapshot, &predictor, false);
            }

            if self.memory.cooldown.is_ready() {
                let has_sub_path = self.memory.has_active_path();
                let progressing = self.memory.is_progressing();
                if let Some(reason) = self.memory.monitor.observe(position, has_sub_path, progressing)
                {
                    let fallback = self.archetype.fallback_state();
                    debug!(
                        agent = snapshot.me.id.get(),
                        ?reason,
                        state = self.memory.state.name(),
                        fallback = fallback.name(),
                        "stuck monitor tripped"
                    );
                    self.stuck_trips += 1;
                    self.memory.clear_plans();
                    self.archetype.reset();
                    self.enter(fallback, now, snapshot);
                    self.memory.last_decision = Some(now);
                    self.memory.mark_progress();
                    return AgentIntent::idle();
                }
            } else {
                self.memory.monitor.pause(position);
                let retreat = self.archetype.retreat_state();
                if self.memory.state != retreat {
                    self.enter(retreat, now, snapshot);
                }
            }
            self.memory.state
        };

        let transition = {
            let mut senses = Senses::new(snapshot, tuning, &mut self.rng);
            self.archetype
                .decide_in_state(state, &mut self.memory, &mut senses)
        };
        let place = self.apply(transition, snapshot);
        self.memory.last_decision = Some(now);
        self.memory.mark_progress();

        self.emit(snapshot, &predictor, place)
    }

    fn enter(&mut self, next: A::State, now: Duration, snapshot: &ArenaSnapshot<'_>) {
        debug!(
            agent = snapshot.me.id.get(),
            from = self.memory.state.name(),
            to = next.name(),
            "state transition"
        );
        self.memory.state = next;
        self.memory.state_entered = now;
    }

    fn apply(&mut self, transition: Transition<A::State>, snapshot: &ArenaSnapshot<'_>) -> bool {
        let position = snapshot.me.cell;
        let changed = transition.next != self.memory.state;

        match transition.sub_path {
            SubPathUpdate::Replace(cells) => {
                if cells.first() == Some(&position) {
                    self.memory.commit_path(cells);
                } else {
                    trace!(
                        agent = snapshot.me.id.get(),
                        ?position,
                        "discarding sub-path that does not start at the agent"
                    );
                    self.memory.sub_path = None;
                }
            }
            SubPathUpdate::Clear => self.memory.sub_path = None,
            SubPathUpdate::Keep => {
                if changed {
                    self.memory.sub_path = None;
                }
            }
        }

        if changed {
            self.enter(transition.next, snapshot.now, snapshot);
        }

        let Some(order) = transition.placement else {
            return false;
        };

        let capacity_left = snapshot.me.remaining_placements() > 0;
        let tile_free = snapshot.hazard_at(position).is_none();
        if !capacity_left || !tile_free || order.retreat.first() != Some(&position) {
            trace!(
                agent = snapshot.me.id.get(),
                capacity_left,
                tile_free,
                "placement request dropped"
            );
            return false;
        }

        debug!(
            agent = snapshot.me.id.get(),
            origin = ?position,
            withdrawal = ?order.withdrawal,
            "placing hazard"
        );
        self.memory.cooldown = HazardCooldown::Retreating {
            origin: position,
            withdrawal: order.withdrawal,
            since: snapshot.now,
        };
        self.memory.last_placement = Some(snapshot.now);
        self.memory.commit_path(order.retreat);
        let retreat = self.archetype.retreat_state();
        if self.memory.state != retreat {
            self.enter(retreat, snapshot.now, snapshot);
        }
        true
    }

    fn emit(
        &mut self,
        snapshot: &ArenaSnapshot<'_>,
        predictor: &HazardPredictor<'_>,
        place_hazard: bool,
    ) -> AgentIntent {
        let position = snapshot.me.cell;
        let Some(next) = self.memory.sub_path.as_ref().and_then(|path| path.next_step()) else {
            return AgentIntent {
                motion: None,
                place_hazard,
            };
        };

        if !snapshot.map.is_open(next) || snapshot.hazard_at(next).is_some() {
            trace!(agent = snapshot.me.id.get(), ?next, "sub-path blocked");
            self.memory.sub_path = None;
            self.memory.last_decision = None;
            return AgentIntent {
                motion: None,
                place_hazard,
            };
        }

        let transit = self.archetype.tuning().transit_horizon();
        let stepping_into_danger = predictor.in_active_blast(next)
            || (predictor.is_dangerous(next, transit) && !predictor.is_dangerous(position, transit));
        if stepping_into_danger {
            return AgentIntent {
                motion: None,
                place_hazard,
            };
        }

        AgentIntent {
            motion: TileStep::between(position, next),
            place_hazard,
        }
    }
}

/// Agent of any archetype, dispatched by enum.
#[derive(Debug)]
pub enum AnyAgent {
    /// Priority-cascade controller.
    Baseline(Agent<Baseline>),
    /// Aggressive archetype.
    Aggressive(Agent<Aggressive>),
    /// Conservative archetype.
    Conservative(Agent<Conservative>),
    /// Item-focused archetype.
    ItemFocused(Agent<ItemFocused>),
}

impl AnyAgent {
    /// Creates an agent of `kind` configured from `tunings`.
    #[must_use]
    pub fn new(kind: ArchetypeKind, tunings: &Tunings, seed: u64) -> Self {
        match kind {
            ArchetypeKind::Baseline => {
                AnyAgent::Baseline(Agent::new(Baseline::new(tunings.baseline), seed))
            }
            ArchetypeKind::Aggressive => {
                AnyAgent::Aggressive(Agent::new(Aggressive::new(tunings.aggressive), seed))
            }
            ArchetypeKind::Conservative => {
                AnyAgent::Conservative(Agent::new(Conservative::new(tunings.conservative), seed))
            }
            ArchetypeKind::ItemFocused => {
                AnyAgent::ItemFocused(Agent::new(ItemFocused::new(tunings.item_focused), seed))
            }
        }
    }

    /// Archetype of the agent.
    #[must_use]
    pub fn kind(&self) -> ArchetypeKind {
        match self {
            AnyAgent::Baseline(agent) => agent.archetype().kind(),
            AnyAgent::Aggressive(agent) => agent.archetype().kind(),
            AnyAgent::Conservative(agent) => agent.archetype().kind(),
            AnyAgent::ItemFocused(agent) => agent.archetype().kind(),
        }
    }

    /// Produces the intent for one physical tick.
    pub fn decide(&mut self, snapshot: &ArenaSnapshot<'_>) -> AgentIntent {
        match self {
            AnyAgent::Baseline(agent) => agent.decide(snapshot),
            AnyAgent::Aggressive(agent) => agent.decide(snapshot),
            AnyAgent::Conservative(agent) => agent.decide(snapshot),
            AnyAgent::ItemFocused(agent) => agent.decide(snapshot),
        }
    }

    /// Reinitialises the agent for a new round.
    pub fn reset(&mut self) {
        match self {
            AnyAgent::Baseline(agent) => agent.reset(),
            AnyAgent::Aggressive(agent) => agent.reset(),
            AnyAgent::Conservative(agent) => agent.reset(),
            AnyAgent::ItemFocused(agent) => agent.reset(),
        }
    }

    /// Introspection data for renderers and logs.
    #[must_use]
    pub fn debug(&self) -> AgentDebug {
        match self {
            AnyAgent::Baseline(agent) => agent.debug(),
            AnyAgent::Aggressive(agent) => agent.debug(),
            AnyAgent::Conservative(agent) => agent.debug(),
            AnyAgent::ItemFocused(agent) => agent.debug(),
        }
    }
}
