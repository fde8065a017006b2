//! Per-agent mutable state owned exclusively by one agent.

use std::time::Duration;

use bomb_arena_core::CellCoord;

use crate::config::CommonTuning;
use crate::monitor::StuckMonitor;

/// Outcome of reconciling a committed path with the agent's actual tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSync {
    /// The agent still stands on the path's current tile.
    OnTrack,
    /// The agent moved onto the next tile and the cursor followed.
    Advanced,
    /// The agent is neither on the current nor on the next tile.
    Desynced,
}

/// Sequence of tiles the agent committed to, with a cursor on the tile the
/// agent is expected to occupy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommittedPath {
    cells: Vec<CellCoord>,
    cursor: usize,
}

impl CommittedPath {
    /// Commits to `cells`. Empty sequences are refused.
    #[must_use]
    pub fn new(cells: Vec<CellCoord>) -> Option<Self> {
        if cells.is_empty() {
            return None;
        }
        Some(Self { cells, cursor: 0 })
    }

    /// Tile the agent is expected to occupy.
    #[must_use]
    pub fn current(&self) -> CellCoord {
        self.cells[self.cursor.min(self.cells.len() - 1)]
    }

    /// Tile the agent should step onto next, if any.
    #[must_use]
    pub fn next_step(&self) -> Option<CellCoord> {
        self.cells.get(self.cursor + 1).copied()
    }

    /// Final tile of the path.
    #[must_use]
    pub fn goal(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Tiles from the current one to the goal, inclusive.
    #[must_use]
    pub fn remaining(&self) -> &[CellCoord] {
        &self.cells[self.cursor.min(self.cells.len() - 1)..]
    }

    /// Every tile of the path.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Index of the current tile.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Reports whether the agent stands on the goal.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor + 1 >= self.cells.len()
    }

    /// Reconciles the cursor with the agent's actual tile.
    pub fn sync(&mut self, position: CellCoord) -> PathSync {
        if self.current() == position {
            return PathSync::OnTrack;
        }
        if self.next_step() == Some(position) {
            self.cursor += 1;
            return PathSync::Advanced;
        }
        PathSync::Desynced
    }

    /// Moves the cursor forward to `position` if it appears later on the path.
    ///
    /// Used for long-range routes, which the agent follows loosely.
    pub fn seek(&mut self, position: CellCoord) -> bool {
        match self.cells[self.cursor..]
            .iter()
            .position(|cell| *cell == position)
        {
            Some(offset) => {
                self.cursor += offset;
                true
            }
            None => false,
        }
    }
}

/// Explicit post-placement sub-state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HazardCooldown {
    /// No own hazard pending; the agent may act freely.
    #[default]
    Ready,
    /// A hazard was just placed and the agent must withdraw before doing
    /// anything else.
    Retreating {
        /// Tile the hazard was placed on.
        origin: CellCoord,
        /// Withdrawal tile chosen at placement time.
        withdrawal: CellCoord,
        /// Simulation time of the placement.
        since: Duration,
    },
}

impl HazardCooldown {
    /// Reports whether the agent is free of post-placement obligations.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, HazardCooldown::Ready)
    }
}

/// Attack and retreat tiles chosen for the current target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Engagement {
    /// Tile the placement is meant to hit.
    pub target: CellCoord,
    /// Tile to place from.
    pub stand: CellCoord,
    /// Tile to withdraw to afterwards.
    pub withdrawal: CellCoord,
}

/// Everything an agent remembers between decisions.
#[derive(Clone, Debug)]
pub struct AgentMemory<S> {
    /// Active behaviour state.
    pub state: S,
    /// Simulation time the active state was entered.
    pub state_entered: Duration,
    /// Simulation time of the last regular decision.
    pub last_decision: Option<Duration>,
    /// Committed long-range route, followed loosely.
    pub route: Option<CommittedPath>,
    /// Committed short sub-path walked one tile per tick.
    pub sub_path: Option<CommittedPath>,
    /// Incremented every time a new sub-path is committed.
    pub path_serial: u64,
    /// Sub-path serial and cursor observed at the last decision.
    pub progress_mark: Option<(u64, usize)>,
    /// Tile the agent occupied on the previous tick.
    pub last_position: Option<CellCoord>,
    /// Stuck and oscillation detection.
    pub monitor: StuckMonitor,
    /// Chosen stand and withdrawal tiles.
    pub engagement: Option<Engagement>,
    /// Tile the agent is currently interested in.
    pub target: Option<CellCoord>,
    /// Post-placement obligation.
    pub cooldown: HazardCooldown,
    /// Simulation time of the agent's last placement.
    pub last_placement: Option<Duration>,
    /// Simulation time the last cooldown ended.
    pub cooldown_cleared_at: Option<Duration>,
    /// Free retry counter for archetype handlers.
    pub attempts: u32,
}

impl<S: Copy> AgentMemory<S> {
    /// Fresh memory positioned in `state`.
    #[must_use]
    pub fn new(state: S, tuning: &CommonTuning) -> Self {
        Self {
            state,
            state_entered: Duration::ZERO,
            last_decision: None,
            route: None,
            sub_path: None,
            path_serial: 0,
            progress_mark: None,
            last_position: None,
            monitor: StuckMonitor::new(tuning.no_progress_threshold, tuning.oscillation_threshold),
            engagement: None,
            target: None,
            cooldown: HazardCooldown::Ready,
            last_placement: None,
            cooldown_cleared_at: None,
            attempts: 0,
        }
    }

    /// Commits a new sub-path, replacing any previous one.
    pub fn commit_path(&mut self, cells: Vec<CellCoord>) {
        self.sub_path = CommittedPath::new(cells);
        self.path_serial = self.path_serial.wrapping_add(1);
    }

    /// Reports whether a sub-path with steps left is committed.
    #[must_use]
    pub fn has_active_path(&self) -> bool {
        self.sub_path.as_ref().is_some_and(|path| !path.is_finished())
    }

    /// Reports whether the committed sub-path has been followed forward since
    /// the previous decision without being replaced.
    #[must_use]
    pub fn is_progressing(&self) -> bool {
        match (&self.sub_path, self.progress_mark) {
            (Some(path), Some((serial, cursor))) => {
                serial == self.path_serial && path.cursor() > cursor
            }
            _ => false,
        }
    }

    /// Records the sub-path position observed at a decision.
    pub fn mark_progress(&mut self) {
        self.progress_mark = self
            .sub_path
            .as_ref()
            .map(|path| (self.path_serial, path.cursor()));
    }

    /// Drops every piece of planning state.
    pub fn clear_plans(&mut self) {
        self.sub_path = None;
        self.route = None;
        self.engagement = None;
        self.target = None;
        self.attempts = 0;
    }
}
