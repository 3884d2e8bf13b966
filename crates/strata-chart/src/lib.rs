//! strata-chart: the hierarchical statechart source model.
//!
//! A [`Chart`] is an arena-backed document tree of states, parallel
//! regions, pseudostates, transitions, and data items, each carrying an
//! open attribute map and optional guard/invariant/parameter annotations.
//! The crate provides read-only queries over the tree: containment
//! navigation, refinement-level computation, and the trigger index with
//! its per-level combination enumeration.
//!
//! Construction goes through [`ChartBuilder`]; translation itself lives in
//! the `strata-translate` crate.

pub mod builder;
pub mod document;
pub mod levels;
pub mod triggers;

pub use builder::ChartBuilder;
pub use document::{Annotation, AnnotationKind, Chart, ChartNode, NodeId, NodeKind};
pub use triggers::{Trigger, TriggerIndex, UNTRIGGERED};
