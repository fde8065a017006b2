//! Tuning surface shared by every archetype.
//!
//! Every struct derives `Deserialize` with `#[serde(default)]`, so a
//! configuration file only needs to name the knobs it changes. A partial
//! `common` table is laid over the owning archetype's defaults rather than
//! over [`CommonTuning::default`]. Durations are stored as whole milliseconds
//! and exposed through accessors.

use std::time::Duration;

use bomb_arena_navigation::{EscapePreference, PlacementPolicy, DEFAULT_WALL_COST};
use serde::{Deserialize, Deserializer};

/// Knobs consumed by the shared agent core and the navigation services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommonTuning {
    /// Minimum interval between two regular decisions.
    pub decision_interval_ms: u64,
    /// Horizon that triggers evasion when the agent's own tile is threatened.
    pub danger_horizon_ms: u64,
    /// Horizon tiles along a direct path must stay safe for.
    pub transit_horizon_ms: u64,
    /// Horizon an escape or withdrawal destination must stay safe for.
    ///
    /// Must cover a full fuse plus the blast window of the arena. The default
    /// matches the default arena rules; see [`Tunings::cover_blast_window`].
    pub safety_horizon_ms: u64,
    /// Depth bound of the direct planner for ordinary movement.
    pub approach_depth: usize,
    /// Depth bound of the escape search.
    pub escape_depth: usize,
    /// Depth bound when picking a random roam destination.
    pub roam_radius: usize,
    /// Long-range cost of stepping onto a destructible wall.
    pub wall_cost: u32,
    /// Unchanged decision ticks without a sub-path that force a re-plan.
    pub no_progress_threshold: u32,
    /// Matching `[A, B, A, B]` decision ticks that force a re-plan.
    pub oscillation_threshold: u32,
    /// Upper bound on the post-placement retreat before it is abandoned.
    pub retreat_timeout_ms: u64,
    /// Ranking used by the evading state.
    pub escape_preference: EscapePreference,
    /// Withdrawal requirements applied by the placement advisor.
    pub placement: PlacementPolicy,
}

impl Default for CommonTuning {
    fn default() -> Self {
        Self {
            decision_interval_ms: 200,
            danger_horizon_ms: 1_000,
            transit_horizon_ms: 300,
            safety_horizon_ms: 2_600,
            approach_depth: 14,
            escape_depth: 10,
            roam_radius: 6,
            wall_cost: DEFAULT_WALL_COST,
            no_progress_threshold: 5,
            oscillation_threshold: 3,
            retreat_timeout_ms: 5_000,
            escape_preference: EscapePreference::Nearest,
            placement: PlacementPolicy::default(),
        }
    }
}

impl CommonTuning {
    /// Minimum interval between two regular decisions.
    #[must_use]
    pub fn decision_interval(&self) -> Duration {
        Duration::from_millis(self.decision_interval_ms)
    }

    /// Horizon that triggers evasion.
    #[must_use]
    pub fn danger_horizon(&self) -> Duration {
        Duration::from_millis(self.danger_horizon_ms)
    }

    /// Horizon for tiles crossed by direct paths.
    #[must_use]
    pub fn transit_horizon(&self) -> Duration {
        Duration::from_millis(self.transit_horizon_ms)
    }

    /// Horizon for escape and withdrawal destinations.
    #[must_use]
    pub fn safety_horizon(&self) -> Duration {
        Duration::from_millis(self.safety_horizon_ms)
    }

    /// Maximum duration of a post-placement retreat.
    #[must_use]
    pub fn retreat_timeout(&self) -> Duration {
        Duration::from_millis(self.retreat_timeout_ms)
    }
}

/// Field-wise overrides for [`CommonTuning`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommonOverrides {
    decision_interval_ms: Option<u64>,
    danger_horizon_ms: Option<u64>,
    transit_horizon_ms: Option<u64>,
    safety_horizon_ms: Option<u64>,
    approach_depth: Option<usize>,
    escape_depth: Option<usize>,
    roam_radius: Option<usize>,
    wall_cost: Option<u32>,
    no_progress_threshold: Option<u32>,
    oscillation_threshold: Option<u32>,
    retreat_timeout_ms: Option<u64>,
    escape_preference: Option<EscapePreference>,
    placement: PlacementOverrides,
}

/// Field-wise overrides for [`PlacementPolicy`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlacementOverrides {
    min_withdrawal_options: Option<usize>,
    withdrawal_depth: Option<usize>,
    approach_depth: Option<usize>,
}

impl CommonOverrides {
    fn apply(self, base: CommonTuning) -> CommonTuning {
        let placement = PlacementPolicy {
            min_withdrawal_options: self
                .placement
                .min_withdrawal_options
                .unwrap_or(base.placement.min_withdrawal_options),
            withdrawal_depth: self
                .placement
                .withdrawal_depth
                .unwrap_or(base.placement.withdrawal_depth),
            approach_depth: self
                .placement
                .approach_depth
                .unwrap_or(base.placement.approach_depth),
        };
        CommonTuning {
            decision_interval_ms: self
                .decision_interval_ms
                .unwrap_or(base.decision_interval_ms),
            danger_horizon_ms: self.danger_horizon_ms.unwrap_or(base.danger_horizon_ms),
            transit_horizon_ms: self.transit_horizon_ms.unwrap_or(base.transit_horizon_ms),
            safety_horizon_ms: self.safety_horizon_ms.unwrap_or(base.safety_horizon_ms),
            approach_depth: self.approach_depth.unwrap_or(base.approach_depth),
            escape_depth: self.escape_depth.unwrap_or(base.escape_depth),
            roam_radius: self.roam_radius.unwrap_or(base.roam_radius),
            wall_cost: self.wall_cost.unwrap_or(base.wall_cost),
            no_progress_threshold: self
                .no_progress_threshold
                .unwrap_or(base.no_progress_threshold),
            oscillation_threshold: self
                .oscillation_threshold
                .unwrap_or(base.oscillation_threshold),
            retreat_timeout_ms: self.retreat_timeout_ms.unwrap_or(base.retreat_timeout_ms),
            escape_preference: self.escape_preference.unwrap_or(base.escape_preference),
            placement,
        }
    }
}

fn overlay_common<'de, D>(deserializer: D, base: CommonTuning) -> Result<CommonTuning, D::Error>
where
    D: Deserializer<'de>,
{
    CommonOverrides::deserialize(deserializer).map(|overrides| overrides.apply(base))
}

fn baseline_common<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CommonTuning, D::Error> {
    overlay_common(deserializer, BaselineTuning::default().common)
}

fn aggressive_common<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<CommonTuning, D::Error> {
    overlay_common(deserializer, AggressiveTuning::default().common)
}

fn conservative_common<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<CommonTuning, D::Error> {
    overlay_common(deserializer, ConservativeTuning::default().common)
}

fn item_focused_common<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<CommonTuning, D::Error> {
    overlay_common(deserializer, ItemFocusedTuning::default().common)
}

/// Baseline controller knobs.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BaselineTuning {
    /// Shared knobs.
    #[serde(deserialize_with = "baseline_common")]
    pub common: CommonTuning,
    /// Manhattan distance within which an opponent is engaged.
    pub engage_distance: u32,
    /// Manhattan distance within which items are worth collecting.
    pub item_radius: u32,
    /// Decisions an opponent may stay unreachable before walls get cleared.
    pub unreachable_patience: u32,
    /// Length of a single wait for an opportunity.
    pub await_ms: u64,
    /// Probability of waiting instead of patrolling when nothing else applies.
    pub await_probability: f64,
    /// Re-plans allowed while engaging before the target is dropped.
    pub engage_attempts: u32,
}

impl Default for BaselineTuning {
    fn default() -> Self {
        Self {
            common: CommonTuning::default(),
            engage_distance: 6,
            item_radius: 8,
            unreachable_patience: 3,
            await_ms: 600,
            await_probability: 0.25,
            engage_attempts: 4,
        }
    }
}

impl BaselineTuning {
    /// Length of a single wait for an opportunity.
    #[must_use]
    pub fn await_duration(&self) -> Duration {
        Duration::from_millis(self.await_ms)
    }
}

/// Aggressive archetype knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AggressiveTuning {
    /// Shared knobs.
    #[serde(deserialize_with = "aggressive_common")]
    pub common: CommonTuning,
    /// Manhattan distance that switches to close-quarters play.
    pub cqc_distance: u32,
    /// Minimum interval between two close-quarters placements.
    pub cqc_placement_interval_ms: u64,
    /// Long-range wall cost used when planning toward the opponent.
    pub clearance_wall_cost: u32,
}

impl Default for AggressiveTuning {
    fn default() -> Self {
        Self {
            common: CommonTuning {
                placement: PlacementPolicy {
                    min_withdrawal_options: 1,
                    withdrawal_depth: 4,
                    approach_depth: 14,
                },
                no_progress_threshold: 3,
                oscillation_threshold: 2,
                ..CommonTuning::default()
            },
            cqc_distance: 3,
            cqc_placement_interval_ms: 900,
            clearance_wall_cost: 2,
        }
    }
}

impl AggressiveTuning {
    /// Minimum interval between two close-quarters placements.
    #[must_use]
    pub fn cqc_placement_interval(&self) -> Duration {
        Duration::from_millis(self.cqc_placement_interval_ms)
    }
}

/// Conservative archetype knobs.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConservativeTuning {
    /// Shared knobs.
    #[serde(deserialize_with = "conservative_common")]
    pub common: CommonTuning,
    /// Probability that a planning decision considers bombing a wall.
    pub obstacle_probability: f64,
    /// Manhattan radius searched for candidate walls.
    pub obstacle_scan_radius: u32,
    /// Length of an idle pause when no roam target exists.
    pub idle_ms: u64,
    /// Extra wait after the agent's own blast has cleared.
    pub wait_after_blast_ms: u64,
}

impl Default for ConservativeTuning {
    fn default() -> Self {
        Self {
            common: CommonTuning {
                placement: PlacementPolicy {
                    min_withdrawal_options: 3,
                    withdrawal_depth: 8,
                    approach_depth: 12,
                },
                no_progress_threshold: 7,
                oscillation_threshold: 4,
                escape_preference: EscapePreference::MostOpen,
                ..CommonTuning::default()
            },
            obstacle_probability: 0.15,
            obstacle_scan_radius: 4,
            idle_ms: 800,
            wait_after_blast_ms: 400,
        }
    }
}

impl ConservativeTuning {
    /// Length of an idle pause.
    #[must_use]
    pub fn idle_duration(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    /// Extra wait after the agent's own blast has cleared.
    #[must_use]
    pub fn wait_after_blast(&self) -> Duration {
        Duration::from_millis(self.wait_after_blast_ms)
    }
}

/// Item-focused archetype knobs.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ItemFocusedTuning {
    /// Shared knobs.
    #[serde(deserialize_with = "item_focused_common")]
    pub common: CommonTuning,
    /// Interval between two world scans while moving.
    pub rescan_interval_ms: u64,
    /// Added to path lengths before dividing values by them.
    pub path_epsilon: f64,
    /// Value of a score pickup.
    pub score_value: f64,
    /// Value of a capacity upgrade.
    pub capacity_value: f64,
    /// Value of a range upgrade.
    pub range_value: f64,
    /// Value of an extra life.
    pub life_value: f64,
    /// Value of clearing a destructible wall.
    pub wall_value: f64,
    /// Capacity at which further capacity upgrades count as saturated.
    pub capacity_cap: u32,
    /// Blast radius at which further range upgrades count as saturated.
    pub range_cap: u32,
    /// Lives at which further life upgrades count as saturated.
    pub life_cap: u32,
    /// Multiplier applied to the value of saturated upgrades.
    pub saturated_factor: f64,
    /// Number of nearest walls evaluated per scan.
    pub wall_candidates: usize,
    /// Length of an idle pause when nothing is worth pursuing.
    pub idle_ms: u64,
}

impl Default for ItemFocusedTuning {
    fn default() -> Self {
        Self {
            common: CommonTuning {
                placement: PlacementPolicy {
                    min_withdrawal_options: 2,
                    withdrawal_depth: 6,
                    approach_depth: 16,
                },
                ..CommonTuning::default()
            },
            rescan_interval_ms: 1_000,
            path_epsilon: 0.5,
            score_value: 1.0,
            capacity_value: 6.0,
            range_value: 5.0,
            life_value: 8.0,
            wall_value: 0.6,
            capacity_cap: 4,
            range_cap: 5,
            life_cap: 3,
            saturated_factor: 0.1,
            wall_candidates: 6,
            idle_ms: 600,
        }
    }
}

impl ItemFocusedTuning {
    /// Interval between two world scans while moving.
    #[must_use]
    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    /// Length of an idle pause.
    #[must_use]
    pub fn idle_duration(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }
}

/// Tuning for all four archetypes, as read from a configuration file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Tunings {
    /// Baseline controller knobs.
    pub baseline: BaselineTuning,
    /// Aggressive archetype knobs.
    pub aggressive: AggressiveTuning,
    /// Conservative archetype knobs.
    pub conservative: ConservativeTuning,
    /// Item-focused archetype knobs.
    pub item_focused: ItemFocusedTuning,
}

impl Tunings {
    /// Raises every safety horizon to at least `window`, the fuse plus blast
    /// duration of the arena the agents will play in.
    #[must_use]
    pub fn cover_blast_window(mut self, window: Duration) -> Self {
        let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        for common in [
            &mut self.baseline.common,
            &mut self.aggressive.common,
            &mut self.conservative.common,
            &mut self.item_focused.common,
        ] {
            common.safety_horizon_ms = common.safety_horizon_ms.max(window_ms);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_defaults_relax_or_tighten_withdrawal() {
        let aggressive = AggressiveTuning::default().common.placement;
        let conservative = ConservativeTuning::default().common.placement;
        assert_eq!(aggressive.min_withdrawal_options, 1);
        assert!(conservative.min_withdrawal_options >= 2);
        assert!(conservative.withdrawal_depth > aggressive.withdrawal_depth);
    }

    #[test]
    fn blast_window_only_ever_lengthens_safety_horizons() {
        let tunings = Tunings::default().cover_blast_window(Duration::from_millis(4_000));
        assert_eq!(tunings.baseline.common.safety_horizon_ms, 4_000);
        assert_eq!(tunings.conservative.common.safety_horizon_ms, 4_000);

        let short = Tunings::default().cover_blast_window(Duration::from_millis(500));
        assert_eq!(short, Tunings::default());
    }

    #[test]
    fn overrides_keep_unnamed_fields_of_the_base() {
        let base = ConservativeTuning::default().common;
        let overrides = CommonOverrides {
            safety_horizon_ms: Some(3_000),
            placement: PlacementOverrides {
                withdrawal_depth: Some(10),
                ..PlacementOverrides::default()
            },
            ..CommonOverrides::default()
        };
        let merged = overrides.apply(base);
        assert_eq!(merged.safety_horizon_ms, 3_000);
        assert_eq!(merged.placement.withdrawal_depth, 10);
        assert_eq!(merged.placement.min_withdrawal_options, 3);
        assert_eq!(merged.escape_preference, EscapePreference::MostOpen);
        assert_eq!(merged.no_progress_threshold, base.no_progress_threshold);
    }

    #[test]
    fn horizons_are_ordered() {
        let common = CommonTuning::default();
        assert!(common.transit_horizon() < common.danger_horizon());
        assert!(common.danger_horizon() < common.safety_horizon());
    }
}
