//! Target model errors.

use thiserror::Error;

use crate::element::ElementId;

/// Errors from construction or lookup in the formal model arena.
#[derive(Debug, Error)]
pub enum FormalError {
    #[error("element {0} not found")]
    ElementNotFound(ElementId),

    #[error("element {id} is a {found}, expected a {expected}")]
    KindMismatch {
        id: ElementId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("a {kind} named {name} is already attached")]
    DuplicateComponent { kind: &'static str, name: String },

    #[error("element {owner} ({kind}) has no {slot} slot")]
    InvalidSlot {
        owner: ElementId,
        kind: &'static str,
        slot: &'static str,
    },
}
