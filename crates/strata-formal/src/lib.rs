//! strata-formal: the target formal model.
//!
//! A [`FormalModel`] is an arena of machines, contexts, events, guards,
//! actions, variables, invariants, constants, carrier sets, axioms, and
//! nested statemachine structures, connected level-to-level by
//! refines/sees links. The arena is append-only during a translation run;
//! elements are addressed by dense [`ElementId`]s so that re-running a
//! translation yields an identical model.
//!
//! The refinement-copy operation in [`refine`] is how deeper levels obtain
//! structure that was not explicitly re-specified: it clones an element
//! (or a whole machine/context), allocates fresh ids, and records the
//! refines edge back to the abstract original.

pub mod element;
pub mod error;
pub mod model;
pub mod refine;
pub mod serialize;

pub use element::{
    Action, Context, Element, ElementId, ElementKind, Event, Machine, NodeRole, Parameter,
    Predicate, StateNode, Statemachine, Transition,
};
pub use error::FormalError;
pub use model::{FormalModel, Slot};
