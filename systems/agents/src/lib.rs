#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Agent controllers for the Bomb Arena.
//!
//! Every agent is an [`Agent`] core parameterised by an [`Archetype`]
//! strategy. The core owns the per-agent memory, keeps the committed paths in
//! sync with the agent's actual tile, pre-empts into evasion when the agent's
//! tile is threatened, enforces the post-placement retreat and runs the stuck
//! monitor. Archetypes only contribute their state enum and the handlers that
//! turn a [`Senses`] view into a [`Transition`].
//!
//! [`AnyAgent`] dispatches over the four shipped archetypes so callers can
//! hold heterogeneous agents in one collection.

pub mod agent;
pub mod aggressive;
pub mod archetype;
pub mod baseline;
pub mod config;
pub mod conservative;
pub mod item_focused;
pub mod memory;
pub mod monitor;
mod tactics;

pub use agent::{Agent, AgentDebug, AnyAgent, ArchetypeKind};
pub use aggressive::{Aggressive, AggressiveState};
pub use archetype::{Archetype, BehaviorState, Senses, SubPathUpdate, Transition};
pub use baseline::{Baseline, BaselineState};
pub use config::{
    AggressiveTuning, BaselineTuning, CommonTuning, ConservativeTuning, ItemFocusedTuning,
    Tunings,
};
pub use conservative::{Conservative, ConservativeState};
pub use item_focused::{Goal, ItemFocused, ItemFocusedState};
pub use memory::{AgentMemory, CommittedPath, HazardCooldown, PathSync};
pub use monitor::{StuckMonitor, StuckReason};
