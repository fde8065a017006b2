#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Bomb Arena match.

mod config;

use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Result};
use bomb_arena_agents::{AnyAgent, ArchetypeKind};
use bomb_arena_core::{AgentId, Command, Event};
use bomb_arena_world::{self as world, query, World};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};

use crate::config::MatchConfig;

/// The classic layout has four spawn corners.
const MAX_AGENTS: usize = 4;

/// Runs a headless match between scripted agents and prints the outcome.
#[derive(Debug, Parser)]
#[command(name = "bomb-arena", version, about)]
struct Args {
    /// Board width in tiles, border included.
    #[arg(long)]
    columns: Option<u32>,
    /// Board height in tiles, border included.
    #[arg(long)]
    rows: Option<u32>,
    /// Seed for the board layout, item drops and every agent.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Upper bound on simulated ticks.
    #[arg(long, default_value_t = 3_000)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long = "tick-ms", default_value_t = 50)]
    tick_ms: u64,
    /// Archetypes to field, one per spawn corner. Defaults to all four.
    #[arg(long, value_enum, value_delimiter = ',')]
    agents: Vec<ArchetypeArg>,
    /// TOML file with `[rules]` and `[tunings.*]` tables.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ArchetypeArg {
    Baseline,
    Aggressive,
    Conservative,
    #[value(name = "item_focused", alias = "item-focused")]
    ItemFocused,
}

impl From<ArchetypeArg> for ArchetypeKind {
    fn from(arg: ArchetypeArg) -> Self {
        match arg {
            ArchetypeArg::Baseline => ArchetypeKind::Baseline,
            ArchetypeArg::Aggressive => ArchetypeKind::Aggressive,
            ArchetypeArg::Conservative => ArchetypeKind::Conservative,
            ArchetypeArg::ItemFocused => ArchetypeKind::ItemFocused,
        }
    }
}

/// Entry point for the Bomb Arena command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => MatchConfig::load(path)?,
        None => MatchConfig::default(),
    };
    let kinds = fielded_archetypes(&args.agents)?;

    let mut rules = config.rules;
    if let Some(columns) = args.columns {
        rules.columns = columns;
    }
    if let Some(rows) = args.rows {
        rules.rows = rows;
    }
    let tunings = config
        .tunings
        .cover_blast_window(rules.fuse() + rules.blast_duration());

    let mut world = World::new(rules, kinds.len(), args.seed);
    let mut agents: Vec<(AgentId, AnyAgent)> = query::agent_ids(&world)
        .into_iter()
        .zip(kinds)
        .map(|(id, kind)| {
            let seed = args.seed ^ u64::from(id.get());
            (id, AnyAgent::new(kind, &tunings, seed))
        })
        .collect();
    info!(
        columns = rules.columns,
        rows = rules.rows,
        agents = agents.len(),
        seed = args.seed,
        "match started"
    );

    let played = run_match(
        &mut world,
        &mut agents,
        args.ticks,
        Duration::from_millis(args.tick_ms.max(1)),
    );
    info!(ticks = played, clock_ms = query::clock(&world).as_millis() as u64, "match finished");

    print_summary(&world, &agents);
    Ok(())
}

fn fielded_archetypes(requested: &[ArchetypeArg]) -> Result<Vec<ArchetypeKind>> {
    if requested.is_empty() {
        return Ok(ArchetypeKind::ALL.to_vec());
    }
    if requested.len() > MAX_AGENTS {
        bail!(
            "{} agents requested but the arena only has {MAX_AGENTS} spawn corners",
            requested.len()
        );
    }
    Ok(requested.iter().copied().map(ArchetypeKind::from).collect())
}

/// Plays until one agent remains or `ticks` run out. Returns the number of
/// ticks simulated.
fn run_match(
    world: &mut World,
    agents: &mut [(AgentId, AnyAgent)],
    ticks: u32,
    dt: Duration,
) -> u32 {
    let mut events = Vec::new();
    for tick in 0..ticks {
        let mut commands = Vec::new();
        for (id, agent) in agents.iter_mut() {
            let Some(snapshot) = query::snapshot(world, *id) else {
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
        commands.push(Command::Tick { dt });

        for command in commands {
            world::apply(world, command, &mut events);
        }
        for event in events.drain(..) {
            log_event(&event);
        }

        if agents.len() > 1 && query::living_agents(world).len() <= 1 {
            return tick + 1;
        }
    }
    ticks
}

fn log_event(event: &Event) {
    match event {
        Event::TimeAdvanced { .. } => {}
        Event::AgentEliminated { agent } => info!(agent = agent.get(), "agent eliminated"),
        Event::AgentHit { agent, lives } => info!(agent = agent.get(), lives, "agent hit"),
        other => debug!(event = ?other, "world event"),
    }
}

fn print_summary(world: &World, agents: &[(AgentId, AnyAgent)]) {
    println!(
        "{:<6} {:<13} {:>5} {:>6} {:<26} {:>6}",
        "agent", "archetype", "lives", "score", "state", "stuck"
    );
    for (id, agent) in agents {
        let Some(status) = query::agent_status(world, *id) else {
            continue;
        };
        let debug = agent.debug();
        println!(
            "{:<6} {:<13} {:>5} {:>6} {:<26} {:>6}",
            id.get(),
            agent.kind(),
            status.lives,
            status.score,
            debug.state,
            debug.stuck_trips
        );
    }

    let living = query::living_agents(world);
    match living.as_slice() {
        [winner] if agents.len() > 1 => {
            let kind = agents
                .iter()
                .find(|(id, _)| id == winner)
                .map(|(_, agent)| agent.kind().to_string())
                .unwrap_or_default();
            println!("winner: agent {} ({kind})", winner.get());
        }
        [] => println!("no agent survived"),
        _ => println!("no winner: {} agents still standing", living.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_agent_list_fields_every_archetype() {
        let kinds = fielded_archetypes(&[]).expect("defaults are valid");
        assert_eq!(kinds, ArchetypeKind::ALL.to_vec());
    }

    #[test]
    fn more_agents_than_corners_is_rejected() {
        let requested = [ArchetypeArg::Baseline; MAX_AGENTS + 1];
        assert!(fielded_archetypes(&requested).is_err());
    }

    #[test]
    fn agent_list_parses_comma_separated_names() {
        let args = Args::try_parse_from([
            "bomb-arena",
            "--agents",
            "aggressive,item_focused",
            "--seed",
            "7",
        ])
        .expect("arguments parse");
        assert_eq!(
            args.agents,
            vec![ArchetypeArg::Aggressive, ArchetypeArg::ItemFocused]
        );
        assert_eq!(args.seed, 7);
        assert_eq!(args.columns, None);
    }

    #[test]
    fn short_match_terminates_within_the_tick_budget() {
        let kinds = fielded_archetypes(&[]).expect("defaults are valid");
        let tunings = bomb_arena_agents::Tunings::default();
        let mut world = World::new(Default::default(), kinds.len(), 3);
        let mut agents: Vec<(AgentId, AnyAgent)> = query::agent_ids(&world)
            .into_iter()
            .zip(kinds)
            .map(|(id, kind)| (id, AnyAgent::new(kind, &tunings, u64::from(id.get()))))
            .collect();

        let played = run_match(&mut world, &mut agents, 40, Duration::from_millis(50));
        assert!(played <= 40);
        assert_eq!(query::clock(&world), Duration::from_millis(50) * played);
    }
}
