use std::time::Duration;

use bomb_arena_agents::{
    Agent, Aggressive, AggressiveState, AggressiveTuning, Archetype, Baseline, BaselineState,
    BaselineTuning, CommonTuning, Conservative, ConservativeState, ConservativeTuning, Goal,
    ItemFocused, ItemFocusedState, ItemFocusedTuning,
};
use bomb_arena_core::{
    AgentId, AgentIntent, CellCoord, Command, Direction, Event, Item, ItemKind, TileMap,
};
use bomb_arena_navigation::PlacementPolicy;
use bomb_arena_world::{self as world, query, ArenaRules, World};

const ME: AgentId = AgentId::new(0);
const OTHER: AgentId = AgentId::new(1);
const TICK: Duration = Duration::from_millis(100);
const DECISION: Duration = Duration::from_millis(200);

fn quiet_rules() -> ArenaRules {
    ArenaRules {
        drop_chance: 0.0,
        ..ArenaRules::default()
    }
}

fn board(rows: &[&str]) -> TileMap {
    TileMap::from_rows(rows).expect("valid board")
}

fn open_room() -> TileMap {
    board(&["#######", "#.....#", "#.....#", "#.....#", "#######"])
}

/// Two rooms separated by a solid divider with a single destructible wall
/// at (4, 2).
fn split_rooms() -> TileMap {
    board(&[
        "#########",
        "#...#...#",
        "#...+...#",
        "#...#...#",
        "#########",
    ])
}

/// Asks `agent` for its intent, forwards it to the world and advances the
/// clock by `dt`.
fn drive<A: Archetype>(
    world: &mut World,
    agent: &mut Agent<A>,
    id: AgentId,
    dt: Duration,
) -> (AgentIntent, Vec<Event>) {
    let intent = match query::snapshot(world, id) {
        Some(snapshot) => agent.decide(&snapshot),
        None => AgentIntent::idle(),
    };

    let mut events = Vec::new();
    if intent.place_hazard {
        world::apply(world, Command::PlaceHazard { agent: id }, &mut events);
    }
    if let Some(step) = intent.motion {
        world::apply(
            world,
            Command::StepAgent {
                agent: id,
                direction: step.direction,
            },
            &mut events,
        );
    }
    world::apply(world, Command::Tick { dt }, &mut events);
    (intent, events)
}

fn position(world: &World, id: AgentId) -> CellCoord {
    query::agent_status(world, id).expect("agent exists").cell
}

/// Lets the opponent arm a hazard on its tile and runs the fuse down to
/// `remaining` milliseconds.
fn arm_opponent_hazard(world: &mut World, remaining: u64) {
    let mut events = Vec::new();
    world::apply(world, Command::PlaceHazard { agent: OTHER }, &mut events);
    let elapsed = quiet_rules().fuse_ms - remaining;
    world::apply(
        world,
        Command::Tick {
            dt: Duration::from_millis(elapsed),
        },
        &mut events,
    );
}

#[derive(Debug, Default)]
struct Tally {
    placed_at: Option<CellCoord>,
    destroyed: Vec<CellCoord>,
    collected: Vec<Item>,
    own_hits: usize,
}

impl Tally {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::HazardPlaced { agent, origin, .. } if *agent == ME => {
                    self.placed_at = Some(*origin);
                }
                Event::TileDestroyed { cell } => self.destroyed.push(*cell),
                Event::ItemCollected { agent, item } if *agent == ME => self.collected.push(*item),
                Event::AgentHit { agent, .. } if *agent == ME => self.own_hits += 1,
                _ => {}
            }
        }
    }
}

#[test]
fn baseline_collects_a_nearby_item_then_patrols_or_waits() {
    let mut world = World::from_map(open_room(), &[CellCoord::new(1, 1)], quiet_rules(), 1);
    let item = Item {
        cell: CellCoord::new(4, 3),
        kind: ItemKind::Range,
    };
    world.drop_item(item);
    let mut agent = Agent::new(Baseline::new(BaselineTuning::default()), 3);

    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.state(), BaselineState::CollectPowerup);
    assert_eq!(agent.debug().target, Some(item.cell));

    let mut tally = Tally::default();
    for _ in 0..30 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if !tally.collected.is_empty() {
            break;
        }
    }
    assert_eq!(tally.collected, vec![item]);
    let status = query::agent_status(&world, ME).expect("agent exists");
    assert_eq!(status.blast_radius, quiet_rules().starting_radius + 1);

    let mut settled = false;
    for _ in 0..6 {
        let _ = drive(&mut world, &mut agent, ME, TICK);
        if matches!(
            agent.state(),
            BaselineState::Patrol | BaselineState::AwaitOpportunity
        ) {
            settled = true;
            break;
        }
    }
    assert!(settled, "nothing left to collect, got {:?}", agent.state());
}

#[test]
fn baseline_bombs_a_path_after_the_opponent_stays_unreachable() {
    let spawns = [CellCoord::new(1, 2), CellCoord::new(7, 2)];
    let mut world = World::from_map(split_rooms(), &spawns, quiet_rules(), 2);
    let tuning = BaselineTuning {
        common: CommonTuning {
            no_progress_threshold: 10,
            ..CommonTuning::default()
        },
        await_probability: 1.0,
        unreachable_patience: 3,
        ..BaselineTuning::default()
    };
    let mut agent = Agent::new(Baseline::new(tuning), 8);

    let mut states = Vec::new();
    let mut tally = Tally::default();
    for _ in 0..80 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if states.last() != Some(&agent.state()) {
            states.push(agent.state());
        }
        if tally.destroyed.contains(&CellCoord::new(4, 2)) {
            break;
        }
    }

    let awaited = states
        .iter()
        .position(|state| *state == BaselineState::AwaitOpportunity)
        .expect("the agent waits while the opponent is out of reach");
    let bombing = states
        .iter()
        .position(|state| *state == BaselineState::StrategicBombingForPath)
        .expect("the agent starts clearing a path");
    assert!(awaited < bombing, "states: {states:?}");
    assert!(!states.contains(&BaselineState::EngageTarget));
    assert_eq!(tally.placed_at, Some(CellCoord::new(3, 2)));
    assert!(tally.destroyed.contains(&CellCoord::new(4, 2)));
    assert_eq!(tally.own_hits, 0);
}

#[test]
fn aggressive_clears_the_wall_between_it_and_the_opponent() {
    let spawns = [CellCoord::new(1, 2), CellCoord::new(7, 2)];
    let mut world = World::from_map(split_rooms(), &spawns, quiet_rules(), 5);
    let mut agent = Agent::new(Aggressive::new(AggressiveTuning::default()), 13);

    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), AggressiveState::PlanningPlayer);
    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), AggressiveState::ExecuteClearance);
    assert_eq!(agent.debug().target, Some(CellCoord::new(4, 2)));
    assert!(!agent.debug().route.is_empty(), "route toward the opponent is kept");

    let mut tally = Tally::default();
    for _ in 0..60 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if tally.destroyed.contains(&CellCoord::new(4, 2)) {
            break;
        }
    }
    assert!(tally.placed_at.is_some());
    assert!(tally.destroyed.contains(&CellCoord::new(4, 2)));
    assert_eq!(tally.own_hits, 0);
}

#[test]
fn aggressive_collapses_into_close_quarters_only_when_near() {
    let near = [CellCoord::new(1, 1), CellCoord::new(4, 1)];
    let mut world = World::from_map(open_room(), &near, quiet_rules(), 6);
    let mut agent = Agent::new(Aggressive::new(AggressiveTuning::default()), 17);
    let _ = drive(&mut world, &mut agent, ME, DECISION);
    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), AggressiveState::Cqc);

    let mut states = Vec::new();
    for _ in 0..20 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        states.push(agent.state());
        let placed = events
            .iter()
            .any(|event| matches!(event, Event::HazardPlaced { agent, .. } if *agent == ME));
        if placed {
            break;
        }
    }
    assert!(agent.memory().last_placement.is_some(), "states: {states:?}");
    assert!(!states.contains(&AggressiveState::Engage));

    let far = [CellCoord::new(1, 1), CellCoord::new(5, 3)];
    let mut world = World::from_map(open_room(), &far, quiet_rules(), 6);
    let mut agent = Agent::new(Aggressive::new(AggressiveTuning::default()), 17);
    let _ = drive(&mut world, &mut agent, ME, DECISION);
    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), AggressiveState::Engage);
}

fn obstacle_hunter(placement: PlacementPolicy) -> Conservative {
    let defaults = ConservativeTuning::default();
    Conservative::new(ConservativeTuning {
        common: CommonTuning {
            placement,
            ..defaults.common
        },
        obstacle_probability: 1.0,
        ..defaults
    })
}

#[test]
fn conservative_refuses_a_wall_with_a_single_way_out() {
    let corridor = board(&["#######", "#....+#", "#######"]);
    let strict = ConservativeTuning::default().common.placement;
    assert_eq!(strict.min_withdrawal_options, 3);
    assert_eq!(strict.withdrawal_depth, 8);

    let mut world = World::from_map(corridor.clone(), &[CellCoord::new(1, 1)], quiet_rules(), 3);
    let mut agent = Agent::new(obstacle_hunter(strict), 23);
    let mut assessed = false;
    let mut tally = Tally::default();
    for _ in 0..40 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        assessed |= agent.state() == ConservativeState::AssessingObstacle;
    }
    assert!(assessed);
    assert_eq!(tally.placed_at, None);
    assert!(query::map(&world).is_destructible(CellCoord::new(5, 1)));

    let relaxed = PlacementPolicy {
        min_withdrawal_options: 1,
        ..strict
    };
    let mut world = World::from_map(corridor, &[CellCoord::new(1, 1)], quiet_rules(), 3);
    let mut agent = Agent::new(obstacle_hunter(relaxed), 23);
    let mut tally = Tally::default();
    for _ in 0..60 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if !tally.destroyed.is_empty() {
            break;
        }
    }
    assert_eq!(tally.placed_at, Some(CellCoord::new(4, 1)));
    assert_eq!(tally.destroyed, vec![CellCoord::new(5, 1)]);
    assert_eq!(tally.own_hits, 0);
}

#[test]
fn conservative_bombs_a_wall_in_open_ground_and_waits_it_out() {
    let map = board(&["#######", "#.....#", "#.....#", "#..+..#", "#######"]);
    let mut world = World::from_map(map, &[CellCoord::new(1, 1)], quiet_rules(), 4);
    let mut agent = Agent::new(
        obstacle_hunter(ConservativeTuning::default().common.placement),
        29,
    );

    let mut moving_seen = false;
    let mut waiting_seen = false;
    let mut tally = Tally::default();
    for _ in 0..80 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        moving_seen |= agent.state() == ConservativeState::MovingToBombObstacle;
        waiting_seen |= agent.state() == ConservativeState::TacticalRetreatAndWait;
        if !tally.destroyed.is_empty() {
            break;
        }
    }
    assert!(moving_seen);
    assert!(waiting_seen);
    assert!(tally.placed_at.is_some());
    assert_eq!(tally.destroyed, vec![CellCoord::new(3, 3)]);
    assert_eq!(tally.own_hits, 0);
}

/// A dead-end pocket at (2, 1) is the closest safe tile from (1, 2), while
/// the open area to the east offers room to manoeuvre.
fn pocket_and_plaza() -> TileMap {
    board(&[
        "#########",
        "##.#....#",
        "#.......#",
        "####....#",
        "#########",
    ])
}

#[test]
fn conservative_evades_toward_open_ground() {
    let spawns = [CellCoord::new(1, 2), CellCoord::new(1, 2)];
    let mut world = World::from_map(pocket_and_plaza(), &spawns, quiet_rules(), 7);
    arm_opponent_hazard(&mut world, 900);

    let tuning = ConservativeTuning {
        obstacle_probability: 0.0,
        ..ConservativeTuning::default()
    };
    let mut agent = Agent::new(Conservative::new(tuning), 31);
    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.state(), ConservativeState::EvadingDanger);
    assert_eq!(agent.debug().path.last(), Some(&CellCoord::new(5, 2)));

    let mut tally = Tally::default();
    let mut reached = false;
    for _ in 0..20 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        reached |= position(&world, ME) == CellCoord::new(5, 2);
    }
    assert!(reached, "the agent should reach the open tile");
    assert_eq!(tally.own_hits, 0);
}

#[test]
fn nearest_preference_settles_for_the_closest_pocket() {
    let spawns = [CellCoord::new(1, 2), CellCoord::new(1, 2)];
    let mut world = World::from_map(pocket_and_plaza(), &spawns, quiet_rules(), 7);
    arm_opponent_hazard(&mut world, 900);

    let mut agent = Agent::new(Baseline::new(BaselineTuning::default()), 31);
    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.state(), BaselineState::CriticalEscape);
    assert_eq!(agent.debug().path.last(), Some(&CellCoord::new(2, 1)));
}

#[test]
fn item_focused_prefers_value_per_step_over_proximity() {
    let score = Item {
        cell: CellCoord::new(1, 2),
        kind: ItemKind::Score,
    };
    let capacity = Item {
        cell: CellCoord::new(5, 1),
        kind: ItemKind::Capacity,
    };

    let mut world = World::from_map(open_room(), &[CellCoord::new(1, 1)], quiet_rules(), 9);
    world.drop_item(score);
    world.drop_item(capacity);
    let mut agent = Agent::new(ItemFocused::new(ItemFocusedTuning::default()), 37);
    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.archetype().goal(), Some(Goal::Item(capacity)));
    assert_eq!(agent.state(), ItemFocusedState::PlanningPath);

    let mut tally = Tally::default();
    for _ in 0..60 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if !tally.collected.is_empty() {
            break;
        }
    }
    assert_eq!(tally.collected.first(), Some(&capacity));

    let stocked = ArenaRules {
        starting_capacity: ItemFocusedTuning::default().capacity_cap,
        ..quiet_rules()
    };
    let mut world = World::from_map(open_room(), &[CellCoord::new(1, 1)], stocked, 9);
    world.drop_item(score);
    world.drop_item(capacity);
    let mut agent = Agent::new(ItemFocused::new(ItemFocusedTuning::default()), 37);
    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.archetype().goal(), Some(Goal::Item(score)));
}

#[test]
fn item_focused_hunts_once_the_arena_is_exhausted() {
    let spawns = [CellCoord::new(1, 1), CellCoord::new(5, 3)];
    let mut world = World::from_map(open_room(), &spawns, quiet_rules(), 10);
    let item = Item {
        cell: CellCoord::new(2, 1),
        kind: ItemKind::Score,
    };
    world.drop_item(item);
    let mut agent = Agent::new(ItemFocused::new(ItemFocusedTuning::default()), 41);

    let _ = drive(&mut world, &mut agent, ME, TICK);
    assert_eq!(agent.archetype().goal(), Some(Goal::Item(item)));
    assert!(!agent.archetype().is_hunting());

    let mut tally = Tally::default();
    for _ in 0..80 {
        let (_, events) = drive(&mut world, &mut agent, ME, TICK);
        tally.record(&events);
        if tally.placed_at.is_some() {
            break;
        }
    }
    assert_eq!(tally.collected, vec![item]);
    assert!(agent.archetype().is_hunting());
    assert!(matches!(agent.archetype().goal(), Some(Goal::Hunt(_))));
    assert!(tally.placed_at.is_some(), "hunting places next to the opponent");
}

#[test]
fn desynced_sub_path_is_dropped_and_replanned_from_the_actual_tile() {
    let mut world = World::from_map(open_room(), &[CellCoord::new(3, 2)], quiet_rules(), 11);
    let tuning = ConservativeTuning {
        obstacle_probability: 0.0,
        ..ConservativeTuning::default()
    };
    let mut agent = Agent::new(Conservative::new(tuning), 43);

    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), ConservativeState::Roaming);
    let planned = agent.debug().path;
    assert!(planned.len() >= 2);
    assert_eq!(position(&world, ME), planned[1]);

    let (direction, detour) = Direction::ALL
        .into_iter()
        .filter_map(|direction| planned[1].step(direction).map(|cell| (direction, cell)))
        .find(|(_, cell)| query::map(&world).is_open(*cell) && !planned.contains(cell))
        .expect("a tile off the planned path");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::StepAgent {
            agent: ME,
            direction,
        },
        &mut events,
    );
    assert_eq!(position(&world, ME), detour);

    let (intent, _) = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(intent.motion, None, "no step along the stale path");
    assert!(agent.debug().path.is_empty());
    assert_eq!(agent.state(), ConservativeState::PlanningRoam);

    let _ = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.state(), ConservativeState::Roaming);
    assert_eq!(agent.debug().path.first(), Some(&detour));
}

#[test]
fn alternating_between_two_tiles_trips_the_agent_monitor() {
    let mut world = World::from_map(open_room(), &[CellCoord::new(2, 2)], quiet_rules(), 12);
    let tuning = BaselineTuning {
        common: CommonTuning {
            oscillation_threshold: 3,
            ..CommonTuning::default()
        },
        await_probability: 1.0,
        ..BaselineTuning::default()
    };
    let mut agent = Agent::new(Baseline::new(tuning), 47);

    let mut events = Vec::new();
    for (decision, direction) in [Direction::East, Direction::West]
        .into_iter()
        .cycle()
        .take(5)
        .enumerate()
    {
        let _ = drive(&mut world, &mut agent, ME, DECISION);
        assert_eq!(agent.debug().stuck_trips, 0, "tripped early at {decision}");
        assert!(agent.debug().path.is_empty());
        world::apply(
            &mut world,
            Command::StepAgent {
                agent: ME,
                direction,
            },
            &mut events,
        );
    }

    let (intent, _) = drive(&mut world, &mut agent, ME, DECISION);
    assert_eq!(agent.debug().stuck_trips, 1);
    assert_eq!(intent, AgentIntent::idle());
    assert_eq!(agent.state(), BaselineState::EvaluateSituation);
    assert_eq!(agent.memory().monitor.oscillation(), 0);
}
