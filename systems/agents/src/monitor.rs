//! Stuck and oscillation detection over recent decision ticks.

use bomb_arena_core::CellCoord;

const HISTORY_LEN: usize = 4;

/// Why the monitor forced a re-plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StuckReason {
    /// The agent stood on the same tile without a sub-path for too long.
    NoProgress,
    /// The agent kept alternating between two tiles.
    Oscillation,
}

/// Tracks the last four distinct tiles an agent occupied at decision ticks.
#[derive(Clone, Debug)]
pub struct StuckMonitor {
    history: [Option<CellCoord>; HISTORY_LEN],
    last_observed: Option<CellCoord>,
    no_progress: u32,
    oscillation: u32,
    no_progress_threshold: u32,
    oscillation_threshold: u32,
}

impl StuckMonitor {
    /// Creates a monitor that trips at the provided thresholds.
    ///
    /// A threshold of zero disables the corresponding counter.
    #[must_use]
    pub fn new(no_progress_threshold: u32, oscillation_threshold: u32) -> Self {
        Self {
            history: [None; HISTORY_LEN],
            last_observed: None,
            no_progress: 0,
            oscillation: 0,
            no_progress_threshold,
            oscillation_threshold,
        }
    }

    /// Consecutive unchanged decision ticks without a sub-path.
    #[must_use]
    pub fn no_progress(&self) -> u32 {
        self.no_progress
    }

    /// Consecutive decision ticks that matched the oscillation pattern.
    #[must_use]
    pub fn oscillation(&self) -> u32 {
        self.oscillation
    }

    /// Recorded tiles, oldest first.
    #[must_use]
    pub fn history(&self) -> [Option<CellCoord>; HISTORY_LEN] {
        self.history
    }

    /// Feeds one decision tick into the monitor.
    ///
    /// Returns the reason when a counter reaches its threshold; the monitor
    /// then clears its counters and history.
    pub fn observe(
        &mut self,
        position: CellCoord,
        has_sub_path: bool,
        progressing: bool,
    ) -> Option<StuckReason> {
        self.record(position);

        if has_sub_path && progressing {
            self.no_progress = 0;
            self.oscillation = 0;
            self.last_observed = Some(position);
            return None;
        }

        if !has_sub_path && self.last_observed == Some(position) {
            self.no_progress += 1;
        } else if self.last_observed != Some(position) {
            self.no_progress = 0;
        }
        self.last_observed = Some(position);

        if self.is_oscillating(position) {
            self.oscillation += 1;
        } else {
            self.oscillation = 0;
        }

        let reason = if self.no_progress_threshold > 0
            && self.no_progress >= self.no_progress_threshold
        {
            Some(StuckReason::NoProgress)
        } else if self.oscillation_threshold > 0 && self.oscillation >= self.oscillation_threshold {
            Some(StuckReason::Oscillation)
        } else {
            None
        };

        if reason.is_some() {
            self.clear();
        }
        reason
    }

    /// Keeps the history current without counting, used while the agent is
    /// bound to a post-placement retreat.
    pub fn pause(&mut self, position: CellCoord) {
        self.record(position);
        self.last_observed = Some(position);
        self.no_progress = 0;
        self.oscillation = 0;
    }

    /// Clears counters and history.
    pub fn clear(&mut self) {
        self.history = [None; HISTORY_LEN];
        self.last_observed = None;
        self.no_progress = 0;
        self.oscillation = 0;
    }

    fn record(&mut self, position: CellCoord) {
        if self.history[HISTORY_LEN - 1] == Some(position) {
            return;
        }
        self.history.rotate_left(1);
        self.history[HISTORY_LEN - 1] = Some(position);
    }

    fn is_oscillating(&self, position: CellCoord) -> bool {
        match self.history {
            [Some(a), Some(b), Some(c), Some(d)] => a != b && a == c && b == d && d == position,
            _ => false,
        }
    }
}
