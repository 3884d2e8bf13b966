//! The fixed transformation rules, one per source element shape.

pub mod data;
pub mod document;
pub mod entry;
pub mod final_state;
pub mod initial;
pub mod state;
pub mod transition;

use strata_formal::ElementId;

/// Per-level lookups a transition-shaped rule caches between
/// `dependencies_ok` and the `fire` that follows it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LevelRef {
    pub level: u32,
    pub machine: ElementId,
    pub statemachine: ElementId,
    pub source: ElementId,
    pub target: ElementId,
}
