//! Match configuration loaded from an optional TOML file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use bomb_arena_agents::Tunings;
use bomb_arena_world::ArenaRules;
use serde::Deserialize;

/// Everything a match needs besides the command-line overrides.
///
/// ```toml
/// [rules]
/// columns = 15
/// fuse_ms = 2500
///
/// [tunings.aggressive]
/// cqc_distance = 2
///
/// [tunings.conservative.common]
/// safety_horizon_ms = 3000
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MatchConfig {
    pub(crate) rules: ArenaRules,
    pub(crate) tunings: Tunings,
}

impl MatchConfig {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read match config {}", path.display()))?;
        parse_config(&contents)
            .with_context(|| format!("invalid match config {}", path.display()))
    }
}

fn parse_config(contents: &str) -> Result<MatchConfig> {
    toml::from_str(contents).context("failed to parse match config toml contents")
}
