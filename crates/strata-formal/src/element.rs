//! Element identities and kind payloads of the target model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an element in a [`crate::FormalModel`] arena. Ids are
/// dense and allocated in creation order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ElementId(pub(crate) u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A machine artifact: one refinement level of the behavioural model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    /// Name of the machine this one refines, if any.
    pub refines: Option<String>,
    /// Names of the contexts this machine sees.
    pub sees: Vec<String>,
    pub variables: Vec<ElementId>,
    pub invariants: Vec<ElementId>,
    pub events: Vec<ElementId>,
    pub statemachines: Vec<ElementId>,
}

/// A context artifact: the static counterpart of one refinement level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Name of the context this one extends, if any.
    pub extends: Option<String>,
    pub sets: Vec<ElementId>,
    pub constants: Vec<ElementId>,
    pub axioms: Vec<ElementId>,
}

/// An event of a machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Names of the abstract events this event refines.
    pub refines: Vec<String>,
    /// An extended event inherits the abstract event's parameters, guards,
    /// and actions instead of re-declaring them.
    pub extended: bool,
    pub parameters: Vec<ElementId>,
    pub guards: Vec<ElementId>,
    pub actions: Vec<ElementId>,
}

/// A named predicate (guard, invariant, or axiom payloads share it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub predicate: String,
    /// Derived predicates become theorems: provable, not constraining.
    pub theorem: bool,
}

/// An assignment expression of an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub expression: String,
}

/// An event or transition parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub type_hint: Option<String>,
}

/// A nested statemachine structure inside a machine or state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statemachine {
    pub nodes: Vec<ElementId>,
    pub transitions: Vec<ElementId>,
}

/// Role of a statemachine node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    State,
    Initial,
    Final,
}

/// A node of a statemachine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateNode {
    pub role: NodeRole,
    pub entry_actions: Vec<ElementId>,
    pub invariants: Vec<ElementId>,
    pub statemachines: Vec<ElementId>,
}

impl StateNode {
    pub fn new(role: NodeRole) -> Self {
        Self {
            role,
            entry_actions: Vec::new(),
            invariants: Vec::new(),
            statemachines: Vec::new(),
        }
    }
}

/// A transition of a statemachine. Source and target are node ids in the
/// same model; `elaborates` lists the event ids this transition realises.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub source: ElementId,
    pub target: ElementId,
    pub elaborates: Vec<ElementId>,
    pub parameters: Vec<ElementId>,
    pub guards: Vec<ElementId>,
    pub actions: Vec<ElementId>,
}

impl Transition {
    pub fn new(source: ElementId, target: ElementId) -> Self {
        Self {
            source,
            target,
            elaborates: Vec::new(),
            parameters: Vec::new(),
            guards: Vec::new(),
            actions: Vec::new(),
        }
    }
}

/// The payload of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElementKind {
    Machine(Machine),
    Context(Context),
    Event(Event),
    Guard(Predicate),
    Invariant(Predicate),
    Axiom(Predicate),
    Action(Action),
    Variable,
    Constant,
    CarrierSet,
    Parameter(Parameter),
    Statemachine(Statemachine),
    StateNode(StateNode),
    Transition(Transition),
}

impl ElementKind {
    /// Short kind tag, used in lookups and diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            ElementKind::Machine(_) => "machine",
            ElementKind::Context(_) => "context",
            ElementKind::Event(_) => "event",
            ElementKind::Guard(_) => "guard",
            ElementKind::Invariant(_) => "invariant",
            ElementKind::Axiom(_) => "axiom",
            ElementKind::Action(_) => "action",
            ElementKind::Variable => "variable",
            ElementKind::Constant => "constant",
            ElementKind::CarrierSet => "carrier-set",
            ElementKind::Parameter(_) => "parameter",
            ElementKind::Statemachine(_) => "statemachine",
            ElementKind::StateNode(_) => "node",
            ElementKind::Transition(_) => "transition",
        }
    }
}

/// An element of the target model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub name: String,
    pub comment: String,
    /// Owner in the containment tree, set when the element is attached.
    pub parent: Option<ElementId>,
    pub kind: ElementKind,
}

impl Element {
    /// All owned children, in slot order then declaration order. This is
    /// the traversal order used by name search, refinement copy, and
    /// serialization.
    pub fn children(&self) -> Vec<ElementId> {
        let mut out = Vec::new();
        match &self.kind {
            ElementKind::Machine(m) => {
                out.extend(&m.variables);
                out.extend(&m.invariants);
                out.extend(&m.events);
                out.extend(&m.statemachines);
            }
            ElementKind::Context(c) => {
                out.extend(&c.sets);
                out.extend(&c.constants);
                out.extend(&c.axioms);
            }
            ElementKind::Event(e) => {
                out.extend(&e.parameters);
                out.extend(&e.guards);
                out.extend(&e.actions);
            }
            ElementKind::Statemachine(sm) => {
                out.extend(&sm.nodes);
                out.extend(&sm.transitions);
            }
            ElementKind::StateNode(s) => {
                out.extend(&s.entry_actions);
                out.extend(&s.invariants);
                out.extend(&s.statemachines);
            }
            ElementKind::Transition(t) => {
                out.extend(&t.parameters);
                out.extend(&t.guards);
                out.extend(&t.actions);
            }
            _ => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_follow_slot_order() {
        let mut event = Event::default();
        event.parameters.push(ElementId(3));
        event.guards.push(ElementId(1));
        event.actions.push(ElementId(2));
        let el = Element {
            id: ElementId(0),
            name: "ev".into(),
            comment: String::new(),
            parent: None,
            kind: ElementKind::Event(event),
        };
        assert_eq!(el.children(), vec![ElementId(3), ElementId(1), ElementId(2)]);
    }

    #[test]
    fn kind_tags() {
        assert_eq!(ElementKind::Variable.tag(), "variable");
        assert_eq!(
            ElementKind::Guard(Predicate::default()).tag(),
            "guard"
        );
    }
}
