use std::time::Duration;

use bomb_arena_agents::{AnyAgent, ArchetypeKind, Tunings};
use bomb_arena_core::{AgentId, AgentStatus, Command, Event};
use bomb_arena_world::{self as world, query, ArenaRules, World};

const SEED: u64 = 0x5eed_b0b0;
const TICKS: usize = 600;
const TICK: Duration = Duration::from_millis(50);

#[test]
fn full_match_replays_identically() {
    let first = play_match();
    let second = play_match();

    assert!(!first.events.is_empty());
    assert_eq!(first.events.len(), second.events.len(), "event counts diverged");
    assert_eq!(first, second, "replay diverged between runs");
}

#[test]
fn agents_act_during_a_match() {
    let outcome = play_match();
    let moves = outcome
        .events
        .iter()
        .filter(|event| matches!(event, Event::AgentMoved { .. }))
        .count();
    let placements = outcome
        .events
        .iter()
        .filter(|event| matches!(event, Event::HazardPlaced { .. }))
        .count();
    assert!(moves > 0, "agents never moved");
    assert!(placements > 0, "agents never placed a hazard");
}

#[derive(Debug, PartialEq)]
struct MatchOutcome {
    events: Vec<Event>,
    statuses: Vec<AgentStatus>,
    states: Vec<&'static str>,
}

fn play_match() -> MatchOutcome {
    let tunings = Tunings::default();
    let mut world = World::new(ArenaRules::default(), ArchetypeKind::ALL.len(), SEED);
    let ids = query::agent_ids(&world);
    let mut agents: Vec<(AgentId, AnyAgent)> = ids
        .iter()
        .zip(ArchetypeKind::ALL)
        .map(|(id, kind)| (*id, AnyAgent::new(kind, &tunings, SEED ^ u64::from(id.get()))))
        .collect();

    let mut log = Vec::new();
    for _ in 0..TICKS {
        let mut commands = Vec::new();
        for (id, agent) in agents.iter_mut() {
            let Some(snapshot) = query::snapshot(&world, *id) else {
                continue;
            };
            let intent = agent.decide(&snapshot);
            if intent.place_hazard {
                commands.push(Command::PlaceHazard { agent: *id });
            }
            if let Some(step) = intent.motion {
                commands.push(Command::StepAgent {
                    agent: *id,
                    direction: step.direction,
                });
            }
        }
        commands.push(Command::Tick { dt: TICK });

        for command in commands {
            world::apply(&mut world, command, &mut log);
        }
        if query::living_agents(&world).len() <= 1 {
            break;
        }
    }

    MatchOutcome {
        events: log,
        statuses: ids
            .iter()
            .filter_map(|id| query::agent_status(&world, *id))
            .collect(),
        states: agents.iter().map(|(_, agent)| agent.debug().state).collect(),
    }
}
