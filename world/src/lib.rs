#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative arena state for Bomb Arena.
//!
//! The world owns the board, the agents' bodies, every armed hazard, active
//! blasts and loose items. It only changes through [`apply`], which consumes a
//! [`Command`] and reports what happened as [`Event`]s. Agents observe it
//! through [`query::snapshot`].

use std::time::Duration;

use bomb_arena_core::{
    AgentId, AgentStatus, BlastRegion, CellCoord, Command, Direction, Event, HazardSource, Item,
    ItemKind, PlacementRejection, StepRejection, TileKind, TileMap,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::debug;

/// Rules of a match.
///
/// Every field has a default, so a configuration file only needs to list the
/// rules it changes.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArenaRules {
    /// Number of board columns, border included.
    pub columns: u32,
    /// Number of board rows, border included.
    pub rows: u32,
    /// Fuse length of every hazard.
    pub fuse_ms: u64,
    /// How long a blast stays dangerous after the hazard triggers.
    pub blast_ms: u64,
    /// Time an agent needs between two steps.
    pub step_ms: u64,
    /// Hazards an agent may have armed at once at the start.
    pub starting_capacity: u32,
    /// Blast radius of an agent's hazards at the start.
    pub starting_radius: u32,
    /// Upper bound for the blast radius reached through range upgrades.
    pub max_radius: u32,
    /// Lives of an agent at the start.
    pub starting_lives: u32,
    /// Probability that a destroyed wall drops an item.
    pub drop_chance: f64,
    /// Probability that a free interior tile starts as a destructible wall.
    pub wall_density: f64,
    /// Points granted by a score pickup.
    pub score_points: u32,
}

impl Default for ArenaRules {
    fn default() -> Self {
        Self {
            columns: 13,
            rows: 11,
            fuse_ms: 2_000,
            blast_ms: 500,
            step_ms: 200,
            starting_capacity: 1,
            starting_radius: 2,
            max_radius: 8,
            starting_lives: 3,
            drop_chance: 0.3,
            wall_density: 0.6,
            score_points: 10,
        }
    }
}

impl ArenaRules {
    /// Fuse length of every hazard.
    #[must_use]
    pub fn fuse(&self) -> Duration {
        Duration::from_millis(self.fuse_ms)
    }

    /// How long a blast stays dangerous.
    #[must_use]
    pub fn blast_duration(&self) -> Duration {
        Duration::from_millis(self.blast_ms)
    }

    /// Time an agent needs between two steps.
    #[must_use]
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }
}

/// Represents the authoritative arena state.
#[derive(Debug)]
pub struct World {
    rules: ArenaRules,
    map: TileMap,
    agents: Vec<Body>,
    hazards: Vec<HazardSource>,
    blasts: Vec<BlastRegion>,
    blast_victims: Vec<Vec<AgentId>>,
    items: Vec<Item>,
    clock: Duration,
    rng: ChaCha8Rng,
}

impl World {
    /// Creates the classic arena: a solid border, solid pillars on every
    /// tile whose column and row are both even, and destructible walls
    /// scattered over the remaining tiles. Up to four agents spawn in the
    /// corners, whose two neighbouring tiles are kept open.
    #[must_use]
    pub fn new(rules: ArenaRules, agent_count: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let columns = rules.columns.max(5);
        let rows = rules.rows.max(5);
        let spawns: Vec<CellCoord> = spawn_corners(columns, rows)
            .into_iter()
            .take(agent_count)
            .collect();
        let map = classic_layout(columns, rows, rules.wall_density, &spawns, &mut rng);
        Self::assemble(map, &spawns, rules, rng)
    }

    /// Creates a world on an arbitrary board with agents on `spawns`.
    ///
    /// Agent identifiers follow the order of `spawns`.
    #[must_use]
    pub fn from_map(map: TileMap, spawns: &[CellCoord], rules: ArenaRules, seed: u64) -> Self {
        Self::assemble(map, spawns, rules, ChaCha8Rng::seed_from_u64(seed))
    }

    fn assemble(map: TileMap, spawns: &[CellCoord], rules: ArenaRules, rng: ChaCha8Rng) -> Self {
        let agents = spawns
            .iter()
            .enumerate()
            .map(|(index, cell)| Body::spawn(AgentId::new(index as u32), *cell, &rules))
            .collect();
        Self {
            rules,
            map,
            agents,
            hazards: Vec::new(),
            blasts: Vec::new(),
            blast_victims: Vec::new(),
            items: Vec::new(),
            clock: Duration::ZERO,
            rng,
        }
    }

    /// Places `item` on the board, replacing any item already on its tile.
    ///
    /// Used to stage scenarios; regular drops come from destroyed walls.
    pub fn drop_item(&mut self, item: Item) {
        self.items.retain(|existing| existing.cell != item.cell);
        self.items.push(item);
    }

    fn body_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|body| body.id == agent)
    }

    fn advance_clock(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.clock = self.clock.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let step = self.rules.step_interval();
        for body in self.agents.iter_mut().filter(|body| body.is_alive()) {
            body.accumulator = body.accumulator.saturating_add(dt).min(step);
        }

        let now = self.clock;
        let mut index = 0;
        while index < self.blasts.len() {
            if self.blasts[index].is_active(now) {
                index += 1;
            } else {
                let _ = self.blasts.remove(index);
                let _ = self.blast_victims.remove(index);
            }
        }

        self.detonate_due(out_events);
        self.resolve_hits(out_events);
    }

    fn detonate_due(&mut self, out_events: &mut Vec<Event>) {
        let now = self.clock;
        let mut pending: Vec<HazardSource> = Vec::new();
        self.hazards.retain(|hazard| {
            if hazard.detonates_at() <= now {
                pending.push(*hazard);
                false
            } else {
                true
            }
        });

        let mut cursor = 0;
        while cursor < pending.len() {
            let hazard = pending[cursor];
            cursor += 1;

            let (cells, walls) = blast_footprint(&self.map, hazard.origin, hazard.radius);

            self.hazards.retain(|other| {
                if cells.contains(&other.origin) {
                    pending.push(*other);
                    false
                } else {
                    true
                }
            });

            let mut destroyed_items = Vec::new();
            self.items.retain(|item| {
                if cells.contains(&item.cell) {
                    destroyed_items.push(*item);
                    false
                } else {
                    true
                }
            });
            for item in destroyed_items {
                out_events.push(Event::ItemDestroyed { item });
            }

            for wall in walls {
                if self.map.destroy(wall) {
                    out_events.push(Event::TileDestroyed { cell: wall });
                    self.maybe_drop(wall, out_events);
                }
            }

            if let Some(index) = self.body_index(hazard.owner) {
                let owner = &mut self.agents[index];
                owner.active_hazards = owner.active_hazards.saturating_sub(1);
            }

            debug!(
                owner = hazard.owner.get(),
                origin = ?hazard.origin,
                tiles = cells.len(),
                "hazard triggered"
            );
            self.blasts.push(BlastRegion {
                cells: cells.clone(),
                expires_at: now.saturating_add(self.rules.blast_duration()),
            });
            self.blast_victims.push(Vec::new());
            out_events.push(Event::HazardTriggered {
                owner: hazard.owner,
                origin: hazard.origin,
                cells,
            });
        }
    }

    fn maybe_drop(&mut self, cell: CellCoord, out_events: &mut Vec<Event>) {
        if !self.rng.gen_bool(self.rules.drop_chance.clamp(0.0, 1.0)) {
            return;
        }
        let Some(kind) = ItemKind::ALL.choose(&mut self.rng).copied() else {
            return;
        };
        let item = Item { cell, kind };
        self.items.push(item);
        out_events.push(Event::ItemDropped { item });
    }

    fn resolve_hits(&mut self, out_events: &mut Vec<Event>) {
        for body in self.agents.iter_mut().filter(|body| body.is_alive()) {
            for (blast, victims) in self.blasts.iter().zip(self.blast_victims.iter_mut()) {
                if !blast.contains(body.cell) || victims.contains(&body.id) {
                    continue;
                }
                victims.push(body.id);
                body.lives = body.lives.saturating_sub(1);
                out_events.push(Event::AgentHit {
                    agent: body.id,
                    lives: body.lives,
                });
                if body.lives == 0 {
                    debug!(agent = body.id.get(), "agent eliminated");
                    out_events.push(Event::AgentEliminated { agent: body.id });
                    break;
                }
            }
        }
    }

    fn step_agent(&mut self, agent: AgentId, direction: Direction, out_events: &mut Vec<Event>) {
        let step = self.rules.step_interval();
        let rejection = match self.body_index(agent) {
            None => Some(StepRejection::Eliminated),
            Some(index) => {
                let body = &self.agents[index];
                let destination = body
                    .cell
                    .step(direction)
                    .filter(|cell| self.map.contains(*cell));
                if !body.is_alive() {
                    Some(StepRejection::Eliminated)
                } else if body.accumulator < step {
                    Some(StepRejection::NotReady)
                } else {
                    match destination {
                        None => Some(StepRejection::OutOfBounds),
                        Some(cell) if !self.map.is_open(cell) || self.hazard_at(cell) => {
                            Some(StepRejection::Blocked)
                        }
                        Some(cell) => {
                            self.move_body(index, cell, out_events);
                            None
                        }
                    }
                }
            }
        };

        if let Some(reason) = rejection {
            out_events.push(Event::StepRejected {
                agent,
                direction,
                reason,
            });
        }
    }

    fn move_body(&mut self, index: usize, destination: CellCoord, out_events: &mut Vec<Event>) {
        let step = self.rules.step_interval();
        let body = &mut self.agents[index];
        let from = body.cell;
        body.cell = destination;
        body.accumulator = body.accumulator.saturating_sub(step);
        out_events.push(Event::AgentMoved {
            agent: body.id,
            from,
            to: destination,
        });

        if let Some(position) = self.items.iter().position(|item| item.cell == destination) {
            let item = self.items.remove(position);
            let rules = self.rules;
            let body = &mut self.agents[index];
            match item.kind {
                ItemKind::Score => body.score = body.score.saturating_add(rules.score_points),
                ItemKind::Capacity => body.capacity = body.capacity.saturating_add(1),
                ItemKind::Range => {
                    body.blast_radius = body.blast_radius.saturating_add(1).min(rules.max_radius);
                }
                ItemKind::Life => body.lives = body.lives.saturating_add(1),
            }
            out_events.push(Event::ItemCollected {
                agent: body.id,
                item,
            });
        }

        self.resolve_hits(out_events);
    }

    fn place_hazard(&mut self, agent: AgentId, out_events: &mut Vec<Event>) {
        let Some(index) = self.body_index(agent) else {
            out_events.push(Event::PlacementRejected {
                agent,
                reason: PlacementRejection::Eliminated,
            });
            return;
        };
        let body = &self.agents[index];
        let origin = body.cell;
        let reason = if !body.is_alive() {
            Some(PlacementRejection::Eliminated)
        } else if body.active_hazards >= body.capacity {
            Some(PlacementRejection::NoCapacity)
        } else if self.hazard_at(origin) {
            Some(PlacementRejection::TileOccupied)
        } else {
            None
        };
        if let Some(reason) = reason {
            out_events.push(Event::PlacementRejected { agent, reason });
            return;
        }

        let hazard = HazardSource {
            owner: agent,
            origin,
            radius: body.blast_radius,
            placed_at: self.clock,
            fuse: self.rules.fuse(),
        };
        self.agents[index].active_hazards += 1;
        self.hazards.push(hazard);
        out_events.push(Event::HazardPlaced {
            agent,
            origin,
            detonates_at: hazard.detonates_at(),
        });
    }

    fn hazard_at(&self, cell: CellCoord) -> bool {
        self.hazards.iter().any(|hazard| hazard.origin == cell)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.advance_clock(dt, out_events),
        Command::StepAgent { agent, direction } => world.step_agent(agent, direction, out_events),
        Command::PlaceHazard { agent } => world.place_hazard(agent, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use bomb_arena_core::{
        AgentId, AgentStatus, ArenaSnapshot, BlastRegion, CellCoord, HazardSource, Item, TileMap,
    };

    use super::{ArenaRules, World};

    /// Builds the per-tick view handed to `agent`.
    ///
    /// Returns `None` for unknown or eliminated agents: they receive no
    /// further snapshots.
    #[must_use]
    pub fn snapshot(world: &World, agent: AgentId) -> Option<ArenaSnapshot<'_>> {
        let body = world.agents.iter().find(|body| body.id == agent)?;
        if !body.is_alive() {
            return None;
        }
        let opponents: Vec<CellCoord> = world
            .agents
            .iter()
            .filter(|other| other.id != agent && other.is_alive())
            .map(|other| other.cell)
            .collect();
        Some(ArenaSnapshot {
            now: world.clock,
            map: &world.map,
            hazards: &world.hazards,
            blasts: &world.blasts,
            items: &world.items,
            opponents,
            me: body.status(),
        })
    }

    /// Current status of `agent`, eliminated or not.
    #[must_use]
    pub fn agent_status(world: &World, agent: AgentId) -> Option<AgentStatus> {
        world
            .agents
            .iter()
            .find(|body| body.id == agent)
            .map(|body| body.status())
    }

    /// Identifiers of every agent in spawn order.
    #[must_use]
    pub fn agent_ids(world: &World) -> Vec<AgentId> {
        world.agents.iter().map(|body| body.id).collect()
    }

    /// Identifiers of the agents still in the match.
    #[must_use]
    pub fn living_agents(world: &World) -> Vec<AgentId> {
        world
            .agents
            .iter()
            .filter(|body| body.is_alive())
            .map(|body| body.id)
            .collect()
    }

    /// Board terrain.
    #[must_use]
    pub fn map(world: &World) -> &TileMap {
        &world.map
    }

    /// Armed hazards in placement order.
    #[must_use]
    pub fn hazards(world: &World) -> &[HazardSource] {
        &world.hazards
    }

    /// Blasts that are still dangerous.
    #[must_use]
    pub fn blasts(world: &World) -> &[BlastRegion] {
        &world.blasts
    }

    /// Items lying on the board.
    #[must_use]
    pub fn items(world: &World) -> &[Item] {
        &world.items
    }

    /// Simulation time elapsed since the match started.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.clock
    }

    /// Rules the match runs under.
    #[must_use]
    pub fn rules(world: &World) -> &ArenaRules {
        &world.rules
    }
}

#[derive(Clone, Debug)]
struct Body {
    id: AgentId,
    cell: CellCoord,
    capacity: u32,
    active_hazards: u32,
    blast_radius: u32,
    lives: u32,
    score: u32,
    accumulator: Duration,
}

impl Body {
    fn spawn(id: AgentId, cell: CellCoord, rules: &ArenaRules) -> Self {
        Self {
            id,
            cell,
            capacity: rules.starting_capacity,
            active_hazards: 0,
            blast_radius: rules.starting_radius,
            lives: rules.starting_lives,
            score: 0,
            accumulator: rules.step_interval(),
        }
    }

    fn is_alive(&self) -> bool {
        self.lives > 0
    }

    fn status(&self) -> AgentStatus {
        AgentStatus {
            id: self.id,
            cell: self.cell,
            capacity: self.capacity,
            active_hazards: self.active_hazards,
            blast_radius: self.blast_radius,
            lives: self.lives,
            score: self.score,
        }
    }
}

/// Tiles reached by a real blast and the destructible walls it destroys.
///
/// Unlike the predicted footprint, a real blast stops at the first
/// destructible wall in each direction; that wall is covered and destroyed.
fn blast_footprint(
    map: &TileMap,
    origin: CellCoord,
    radius: u32,
) -> (Vec<CellCoord>, Vec<CellCoord>) {
    let mut cells = vec![origin];
    let mut walls = Vec::new();
    for direction in Direction::ALL {
        let mut current = origin;
        for _ in 0..radius {
            let Some(next) = current.step(direction).filter(|cell| map.contains(*cell)) else {
                break;
            };
            match map.kind(next) {
                TileKind::SolidWall => break,
                TileKind::DestructibleWall => {
                    cells.push(next);
                    walls.push(next);
                    break;
                }
                TileKind::Open => {
                    cells.push(next);
                    current = next;
                }
            }
        }
    }
    (cells, walls)
}

fn spawn_corners(columns: u32, rows: u32) -> [CellCoord; 4] {
    [
        CellCoord::new(1, 1),
        CellCoord::new(columns - 2, rows - 2),
        CellCoord::new(columns - 2, 1),
        CellCoord::new(1, rows - 2),
    ]
}

fn classic_layout<R: Rng + ?Sized>(
    columns: u32,
    rows: u32,
    density: f64,
    spawns: &[CellCoord],
    rng: &mut R,
) -> TileMap {
    let keep_open = |cell: CellCoord| {
        spawns
            .iter()
            .any(|spawn| spawn.manhattan_distance(cell) <= 1)
    };
    let density = density.clamp(0.0, 1.0);
    let mut tiles = Vec::with_capacity(columns as usize * rows as usize);
    for row in 0..rows {
        for column in 0..columns {
            let cell = CellCoord::new(column, row);
            let border = column == 0 || row == 0 || column == columns - 1 || row == rows - 1;
            let pillar = column % 2 == 0 && row % 2 == 0;
            let kind = if border {
                TileKind::SolidWall
            } else if keep_open(cell) {
                TileKind::Open
            } else if pillar {
                TileKind::SolidWall
            } else if !rng.gen_bool(density) {
                TileKind::Open
            } else {
                TileKind::DestructibleWall
            };
            tiles.push(kind);
        }
    }
    TileMap::from_kinds(columns, rows, tiles)
        .unwrap_or_else(|_| TileMap::filled(columns, rows, TileKind::SolidWall))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena(rows: &[&str], spawns: &[CellCoord]) -> World {
        let map = TileMap::from_rows(rows).expect("valid test board");
        let rules = ArenaRules {
            drop_chance: 0.0,
            ..ArenaRules::default()
        };
        World::from_map(map, spawns, rules, 7)
    }

    fn tick(world: &mut World, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::Tick {
                dt: Duration::from_millis(millis),
            },
            &mut events,
        );
        events
    }

    const AGENT: AgentId = AgentId::new(0);

    #[test]
    fn classic_layout_keeps_spawns_open() {
        let world = World::new(ArenaRules::default(), 4, 11);
        let map = query::map(&world);
        assert_eq!(map.columns(), 13);
        assert_eq!(map.rows(), 11);
        for spawn in spawn_corners(13, 11) {
            assert!(map.is_open(spawn), "spawn {spawn:?} must be open");
        }
        assert!(map.is_solid(CellCoord::new(2, 2)), "pillar expected");
        assert!(map.is_solid(CellCoord::new(0, 5)), "border expected");
        assert_eq!(query::living_agents(&world).len(), 4);
    }

    #[test]
    fn spawns_stay_open_for_even_and_odd_dimensions() {
        for columns in 5..=16 {
            for rows in 5..=14 {
                let rules = ArenaRules {
                    columns,
                    rows,
                    wall_density: 1.0,
                    ..ArenaRules::default()
                };
                let world = World::new(rules, 4, u64::from(columns * rows));
                let map = query::map(&world);
                for id in query::agent_ids(&world) {
                    let spawn = query::agent_status(&world, id).expect("spawned agent").cell;
                    assert!(
                        map.is_open(spawn),
                        "{columns}x{rows}: spawn {spawn:?} is {:?}",
                        map.kind(spawn)
                    );
                }
            }
        }
    }

    #[test]
    fn layouts_are_deterministic_per_seed() {
        let first = World::new(ArenaRules::default(), 2, 99);
        let second = World::new(ArenaRules::default(), 2, 99);
        assert_eq!(query::map(&first), query::map(&second));
    }

    #[test]
    fn steps_require_budget_and_open_tiles() {
        let mut world = arena(&["#####", "#...#", "#.+.#", "#####"], &[CellCoord::new(1, 1)]);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::StepAgent {
                agent: AGENT,
                direction: Direction::East,
            },
            &mut events,
        );
        assert!(matches!(events[0], Event::AgentMoved { .. }));

        events.clear();
        apply(
            &mut world,
            Command::StepAgent {
                agent: AGENT,
                direction: Direction::East,
            },
            &mut events,
        );
        assert!(matches!(
            events[0],
            Event::StepRejected {
                reason: StepRejection::NotReady,
                ..
            }
        ));

        let _ = tick(&mut world, 200);
        events.clear();
        apply(
            &mut world,
            Command::StepAgent {
                agent: AGENT,
                direction: Direction::South,
            },
            &mut events,
        );
        assert!(matches!(
            events[0],
            Event::StepRejected {
                reason: StepRejection::Blocked,
                ..
            }
        ));
    }

    #[test]
    fn placement_respects_capacity() {
        let mut world = arena(&["#####", "#...#", "#####"], &[CellCoord::new(1, 1)]);
        let mut events = Vec::new();
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);
        assert!(matches!(events[0], Event::HazardPlaced { .. }));
        assert!(matches!(
            events[1],
            Event::PlacementRejected {
                reason: PlacementRejection::NoCapacity,
                ..
            }
        ));
        assert_eq!(query::hazards(&world).len(), 1);
    }

    #[test]
    fn real_blasts_stop_at_and_destroy_walls() {
        let mut world = arena(
            &["#######", "#..+..#", "#######"],
            &[CellCoord::new(1, 1), CellCoord::new(5, 1)],
        );
        let mut events = Vec::new();
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);

        let events = tick(&mut world, 2_000);
        let triggered = events.iter().find_map(|event| match event {
            Event::HazardTriggered { cells, .. } => Some(cells.clone()),
            _ => None,
        });
        let cells = triggered.expect("hazard should trigger");
        assert!(cells.contains(&CellCoord::new(3, 1)));
        assert!(!cells.contains(&CellCoord::new(4, 1)), "blast stops at the wall");
        assert!(events.contains(&Event::TileDestroyed {
            cell: CellCoord::new(3, 1)
        }));
        assert!(query::map(&world).is_open(CellCoord::new(3, 1)));

        let status = query::agent_status(&world, AGENT).expect("agent exists");
        assert_eq!(status.lives, 2, "owner caught on its own tile");
        assert_eq!(status.active_hazards, 0);
        let other = query::agent_status(&world, AgentId::new(1)).expect("agent exists");
        assert_eq!(other.lives, 3);
    }

    #[test]
    fn hits_land_once_per_blast() {
        let mut world = arena(&["#####", "#...#", "#####"], &[CellCoord::new(1, 1)]);
        let mut events = Vec::new();
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);
        let _ = tick(&mut world, 2_000);
        let _ = tick(&mut world, 100);
        let _ = tick(&mut world, 100);
        let status = query::agent_status(&world, AGENT).expect("agent exists");
        assert_eq!(status.lives, 2);
        let _ = tick(&mut world, 400);
        assert!(query::blasts(&world).is_empty());
    }

    #[test]
    fn chain_reactions_trigger_immediately() {
        let mut world = arena(
            &["#######", "#.....#", "#######"],
            &[CellCoord::new(1, 1), CellCoord::new(3, 1)],
        );
        let mut events = Vec::new();
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);
        let _ = tick(&mut world, 1_000);
        apply(
            &mut world,
            Command::PlaceHazard {
                agent: AgentId::new(1),
            },
            &mut events,
        );

        let events = tick(&mut world, 1_000);
        let triggered = events
            .iter()
            .filter(|event| matches!(event, Event::HazardTriggered { .. }))
            .count();
        assert_eq!(triggered, 2);
        assert!(query::hazards(&world).is_empty());
    }

    #[test]
    fn eliminated_agents_receive_no_snapshots() {
        let mut world = arena(&["#####", "#...#", "#####"], &[CellCoord::new(1, 1)]);
        let rules = ArenaRules {
            starting_lives: 1,
            drop_chance: 0.0,
            ..ArenaRules::default()
        };
        world.rules = rules;
        world.agents[0].lives = 1;
        let mut events = Vec::new();
        apply(&mut world, Command::PlaceHazard { agent: AGENT }, &mut events);
        let events = tick(&mut world, 2_000);
        assert!(events.contains(&Event::AgentEliminated { agent: AGENT }));
        assert!(query::snapshot(&world, AGENT).is_none());
        assert!(query::living_agents(&world).is_empty());
    }

    #[test]
    fn items_are_collected_and_applied() {
        let mut world = arena(&["#####", "#...#", "#####"], &[CellCoord::new(1, 1)]);
        world.drop_item(Item {
            cell: CellCoord::new(2, 1),
            kind: ItemKind::Range,
        });
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::StepAgent {
                agent: AGENT,
                direction: Direction::East,
            },
            &mut events,
        );
        assert!(events.iter().any(|event| matches!(event, Event::ItemCollected { .. })));
        let status = query::agent_status(&world, AGENT).expect("agent exists");
        assert_eq!(status.blast_radius, 3);
        assert!(query::items(&world).is_empty());
    }

    #[test]
    fn snapshot_lists_living_opponents() {
        let world = arena(
            &["#######", "#.....#", "#######"],
            &[CellCoord::new(1, 1), CellCoord::new(5, 1)],
        );
        let snapshot = query::snapshot(&world, AGENT).expect("agent alive");
        assert_eq!(snapshot.opponents, vec![CellCoord::new(5, 1)]);
        assert_eq!(snapshot.me.cell, CellCoord::new(1, 1));
        assert_eq!(snapshot.me.remaining_placements(), 1);
    }
}
