//! The arena container: construction, attachment, and lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::element::{
    Action, Context, Element, ElementId, ElementKind, Event, Machine, NodeRole, Parameter,
    Predicate, StateNode, Statemachine, Transition,
};
use crate::error::FormalError;

/// A containment slot of an element. Attachment goes through slots so the
/// translation's pending descriptors can name where an element lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Variables,
    Invariants,
    Events,
    Statemachines,
    Sets,
    Constants,
    Axioms,
    Parameters,
    Guards,
    Actions,
    Nodes,
    Transitions,
    EntryActions,
}

impl Slot {
    fn of<'a>(self, kind: &'a ElementKind) -> Option<&'a Vec<ElementId>> {
        match (kind, self) {
            (ElementKind::Machine(m), Slot::Variables) => Some(&m.variables),
            (ElementKind::Machine(m), Slot::Invariants) => Some(&m.invariants),
            (ElementKind::Machine(m), Slot::Events) => Some(&m.events),
            (ElementKind::Machine(m), Slot::Statemachines) => Some(&m.statemachines),
            (ElementKind::Context(c), Slot::Sets) => Some(&c.sets),
            (ElementKind::Context(c), Slot::Constants) => Some(&c.constants),
            (ElementKind::Context(c), Slot::Axioms) => Some(&c.axioms),
            (ElementKind::Event(e), Slot::Parameters) => Some(&e.parameters),
            (ElementKind::Event(e), Slot::Guards) => Some(&e.guards),
            (ElementKind::Event(e), Slot::Actions) => Some(&e.actions),
            (ElementKind::Statemachine(sm), Slot::Nodes) => Some(&sm.nodes),
            (ElementKind::Statemachine(sm), Slot::Transitions) => Some(&sm.transitions),
            (ElementKind::StateNode(s), Slot::EntryActions) => Some(&s.entry_actions),
            (ElementKind::StateNode(s), Slot::Invariants) => Some(&s.invariants),
            (ElementKind::StateNode(s), Slot::Statemachines) => Some(&s.statemachines),
            (ElementKind::Transition(t), Slot::Parameters) => Some(&t.parameters),
            (ElementKind::Transition(t), Slot::Guards) => Some(&t.guards),
            (ElementKind::Transition(t), Slot::Actions) => Some(&t.actions),
            _ => None,
        }
    }

    fn of_mut(self, kind: &mut ElementKind) -> Option<&mut Vec<ElementId>> {
        match (kind, self) {
            (ElementKind::Machine(m), Slot::Variables) => Some(&mut m.variables),
            (ElementKind::Machine(m), Slot::Invariants) => Some(&mut m.invariants),
            (ElementKind::Machine(m), Slot::Events) => Some(&mut m.events),
            (ElementKind::Machine(m), Slot::Statemachines) => Some(&mut m.statemachines),
            (ElementKind::Context(c), Slot::Sets) => Some(&mut c.sets),
            (ElementKind::Context(c), Slot::Constants) => Some(&mut c.constants),
            (ElementKind::Context(c), Slot::Axioms) => Some(&mut c.axioms),
            (ElementKind::Event(e), Slot::Parameters) => Some(&mut e.parameters),
            (ElementKind::Event(e), Slot::Guards) => Some(&mut e.guards),
            (ElementKind::Event(e), Slot::Actions) => Some(&mut e.actions),
            (ElementKind::Statemachine(sm), Slot::Nodes) => Some(&mut sm.nodes),
            (ElementKind::Statemachine(sm), Slot::Transitions) => Some(&mut sm.transitions),
            (ElementKind::StateNode(s), Slot::EntryActions) => Some(&mut s.entry_actions),
            (ElementKind::StateNode(s), Slot::Invariants) => Some(&mut s.invariants),
            (ElementKind::StateNode(s), Slot::Statemachines) => Some(&mut s.statemachines),
            (ElementKind::Transition(t), Slot::Parameters) => Some(&mut t.parameters),
            (ElementKind::Transition(t), Slot::Guards) => Some(&mut t.guards),
            (ElementKind::Transition(t), Slot::Actions) => Some(&mut t.actions),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Variables => "variables",
            Slot::Invariants => "invariants",
            Slot::Events => "events",
            Slot::Statemachines => "statemachines",
            Slot::Sets => "sets",
            Slot::Constants => "constants",
            Slot::Axioms => "axioms",
            Slot::Parameters => "parameters",
            Slot::Guards => "guards",
            Slot::Actions => "actions",
            Slot::Nodes => "nodes",
            Slot::Transitions => "transitions",
            Slot::EntryActions => "entry-actions",
        }
    }
}

/// The target model arena. Append-only during a translation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormalModel {
    elements: Vec<Element>,
    machines: Vec<ElementId>,
    contexts: Vec<ElementId>,
    /// Refinement edges: copied element -> its abstract original.
    refines: BTreeMap<ElementId, ElementId>,
}

impl FormalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, name: &str, comment: &str, kind: ElementKind) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(Element {
            id,
            name: name.to_owned(),
            comment: comment.to_owned(),
            parent: None,
            kind,
        });
        id
    }

    pub(crate) fn record_refines(&mut self, copy: ElementId, abstract_id: ElementId) {
        self.refines.insert(copy, abstract_id);
    }

    // --- Constructors ---

    pub fn new_machine(&mut self, name: &str, comment: &str) -> ElementId {
        self.alloc(name, comment, ElementKind::Machine(Machine::default()))
    }

    pub fn new_context(&mut self, name: &str, comment: &str) -> ElementId {
        self.alloc(name, comment, ElementKind::Context(Context::default()))
    }

    pub fn new_event(&mut self, name: &str) -> ElementId {
        self.alloc(name, "", ElementKind::Event(Event::default()))
    }

    pub fn new_guard(&mut self, name: &str, theorem: bool, predicate: &str, comment: &str) -> ElementId {
        self.alloc(
            name,
            comment,
            ElementKind::Guard(Predicate {
                predicate: predicate.to_owned(),
                theorem,
            }),
        )
    }

    pub fn new_invariant(
        &mut self,
        name: &str,
        theorem: bool,
        predicate: &str,
        comment: &str,
    ) -> ElementId {
        self.alloc(
            name,
            comment,
            ElementKind::Invariant(Predicate {
                predicate: predicate.to_owned(),
                theorem,
            }),
        )
    }

    pub fn new_axiom(&mut self, name: &str, theorem: bool, predicate: &str, comment: &str) -> ElementId {
        self.alloc(
            name,
            comment,
            ElementKind::Axiom(Predicate {
                predicate: predicate.to_owned(),
                theorem,
            }),
        )
    }

    pub fn new_action(&mut self, name: &str, expression: &str, comment: &str) -> ElementId {
        self.alloc(
            name,
            comment,
            ElementKind::Action(Action {
                expression: expression.to_owned(),
            }),
        )
    }

    pub fn new_variable(&mut self, name: &str, comment: &str) -> ElementId {
        self.alloc(name, comment, ElementKind::Variable)
    }

    pub fn new_constant(&mut self, name: &str, comment: &str) -> ElementId {
        self.alloc(name, comment, ElementKind::Constant)
    }

    pub fn new_carrier_set(&mut self, name: &str, comment: &str) -> ElementId {
        self.alloc(name, comment, ElementKind::CarrierSet)
    }

    pub fn new_parameter(&mut self, name: &str, type_hint: Option<&str>, comment: &str) -> ElementId {
        self.alloc(
            name,
            comment,
            ElementKind::Parameter(Parameter {
                type_hint: type_hint.map(str::to_owned),
            }),
        )
    }

    pub fn new_statemachine(&mut self, name: &str) -> ElementId {
        self.alloc(name, "", ElementKind::Statemachine(Statemachine::default()))
    }

    pub fn new_state(&mut self, name: &str) -> ElementId {
        self.alloc(name, "", ElementKind::StateNode(StateNode::new(NodeRole::State)))
    }

    pub fn new_initial_node(&mut self, name: &str) -> ElementId {
        self.alloc(
            name,
            "",
            ElementKind::StateNode(StateNode::new(NodeRole::Initial)),
        )
    }

    pub fn new_final_node(&mut self, name: &str) -> ElementId {
        self.alloc(
            name,
            "",
            ElementKind::StateNode(StateNode::new(NodeRole::Final)),
        )
    }

    pub fn new_transition(&mut self, name: &str, source: ElementId, target: ElementId) -> ElementId {
        self.alloc(name, "", ElementKind::Transition(Transition::new(source, target)))
    }

    // --- Element access ---

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.index())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id.index())
    }

    fn expect(&self, id: ElementId) -> Result<&Element, FormalError> {
        self.get(id).ok_or(FormalError::ElementNotFound(id))
    }

    fn expect_mut(&mut self, id: ElementId) -> Result<&mut Element, FormalError> {
        self.elements
            .get_mut(id.index())
            .ok_or(FormalError::ElementNotFound(id))
    }

    pub fn name(&self, id: ElementId) -> &str {
        self.get(id).map(|e| e.name.as_str()).unwrap_or("")
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn machine(&self, id: ElementId) -> Result<&Machine, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::Machine(m) => Ok(m),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "machine",
                found: other.tag(),
            }),
        }
    }

    pub fn machine_mut(&mut self, id: ElementId) -> Result<&mut Machine, FormalError> {
        match &mut self.expect_mut(id)?.kind {
            ElementKind::Machine(m) => Ok(m),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "machine",
                found: other.tag(),
            }),
        }
    }

    pub fn context(&self, id: ElementId) -> Result<&Context, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::Context(c) => Ok(c),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "context",
                found: other.tag(),
            }),
        }
    }

    pub fn context_mut(&mut self, id: ElementId) -> Result<&mut Context, FormalError> {
        match &mut self.expect_mut(id)?.kind {
            ElementKind::Context(c) => Ok(c),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "context",
                found: other.tag(),
            }),
        }
    }

    pub fn event(&self, id: ElementId) -> Result<&Event, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::Event(e) => Ok(e),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "event",
                found: other.tag(),
            }),
        }
    }

    pub fn event_mut(&mut self, id: ElementId) -> Result<&mut Event, FormalError> {
        match &mut self.expect_mut(id)?.kind {
            ElementKind::Event(e) => Ok(e),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "event",
                found: other.tag(),
            }),
        }
    }

    pub fn statemachine(&self, id: ElementId) -> Result<&Statemachine, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::Statemachine(sm) => Ok(sm),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "statemachine",
                found: other.tag(),
            }),
        }
    }

    pub fn state_node(&self, id: ElementId) -> Result<&StateNode, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::StateNode(s) => Ok(s),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "node",
                found: other.tag(),
            }),
        }
    }

    pub fn transition(&self, id: ElementId) -> Result<&Transition, FormalError> {
        match &self.expect(id)?.kind {
            ElementKind::Transition(t) => Ok(t),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "transition",
                found: other.tag(),
            }),
        }
    }

    pub fn transition_mut(&mut self, id: ElementId) -> Result<&mut Transition, FormalError> {
        match &mut self.expect_mut(id)?.kind {
            ElementKind::Transition(t) => Ok(t),
            other => Err(FormalError::KindMismatch {
                id,
                expected: "transition",
                found: other.tag(),
            }),
        }
    }

    // --- Attachment ---

    /// Attach `child` into a slot of `owner`. Returns `Ok(false)` without
    /// attaching when a same-named element already occupies the slot — an
    /// extension may already provide it.
    pub fn attach(
        &mut self,
        owner: ElementId,
        slot: Slot,
        child: ElementId,
    ) -> Result<bool, FormalError> {
        let child_name = self.expect(child)?.name.clone();
        let owner_el = self.expect(owner)?;
        let existing = slot.of(&owner_el.kind).ok_or(FormalError::InvalidSlot {
            owner,
            kind: owner_el.kind.tag(),
            slot: slot.name(),
        })?;
        if !child_name.is_empty()
            && existing
                .iter()
                .any(|&c| self.elements[c.index()].name == child_name)
        {
            return Ok(false);
        }
        let owner_el = self.expect_mut(owner)?;
        if let Some(ids) = slot.of_mut(&mut owner_el.kind) {
            ids.push(child);
        }
        self.expect_mut(child)?.parent = Some(owner);
        Ok(true)
    }

    pub fn attach_machine(&mut self, id: ElementId) -> Result<(), FormalError> {
        let name = self.machine(id).map(|_| self.name(id).to_owned())?;
        if self.machine_by_name(&name).is_some() {
            return Err(FormalError::DuplicateComponent {
                kind: "machine",
                name,
            });
        }
        self.machines.push(id);
        Ok(())
    }

    pub fn attach_context(&mut self, id: ElementId) -> Result<(), FormalError> {
        let name = self.context(id).map(|_| self.name(id).to_owned())?;
        if self.context_by_name(&name).is_some() {
            return Err(FormalError::DuplicateComponent {
                kind: "context",
                name,
            });
        }
        self.contexts.push(id);
        Ok(())
    }

    // --- Lookup ---

    pub fn machines(&self) -> &[ElementId] {
        &self.machines
    }

    pub fn contexts(&self) -> &[ElementId] {
        &self.contexts
    }

    pub fn machine_by_name(&self, name: &str) -> Option<ElementId> {
        self.machines
            .iter()
            .copied()
            .find(|&m| self.elements[m.index()].name == name)
    }

    pub fn context_by_name(&self, name: &str) -> Option<ElementId> {
        self.contexts
            .iter()
            .copied()
            .find(|&c| self.elements[c.index()].name == name)
    }

    /// Preorder traversal of the containment subtree below `root`
    /// (excluding `root` itself).
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = match self.get(root) {
            Some(el) => el.children().into_iter().rev().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(el) = self.get(id) {
                for c in el.children().into_iter().rev() {
                    stack.push(c);
                }
            }
        }
        out
    }

    /// First element below `root` whose kind tag and name match.
    pub fn find_named(&self, root: ElementId, tag: &str, name: &str) -> Option<ElementId> {
        self.descendants(root).into_iter().find(|&id| {
            let el = &self.elements[id.index()];
            el.kind.tag() == tag && el.name == name
        })
    }

    /// An event of a machine, by name (events are direct children).
    pub fn find_event(&self, machine: ElementId, name: &str) -> Option<ElementId> {
        let m = self.machine(machine).ok()?;
        m.events
            .iter()
            .copied()
            .find(|&e| self.elements[e.index()].name == name)
    }

    /// A statemachine anywhere below `root`, by name.
    pub fn find_statemachine(&self, root: ElementId, name: &str) -> Option<ElementId> {
        self.find_named(root, "statemachine", name)
    }

    /// A statemachine node anywhere below `root`, by name.
    pub fn find_node(&self, root: ElementId, name: &str) -> Option<ElementId> {
        self.find_named(root, "node", name)
    }

    pub fn parent_of(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// The machine containing `id`, walking the containment tree upward.
    pub fn owner_machine(&self, id: ElementId) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(c) = current {
            if matches!(self.get(c)?.kind, ElementKind::Machine(_)) {
                return Some(c);
            }
            current = self.parent_of(c);
        }
        None
    }

    /// Transitions of the node's own statemachine that target it.
    pub fn incoming_transitions(&self, node: ElementId) -> Vec<ElementId> {
        self.sibling_transitions(node, |t| t.target == node)
    }

    /// Transitions of the node's own statemachine that leave it.
    pub fn outgoing_transitions(&self, node: ElementId) -> Vec<ElementId> {
        self.sibling_transitions(node, |t| t.source == node)
    }

    fn sibling_transitions(
        &self,
        node: ElementId,
        pred: impl Fn(&Transition) -> bool,
    ) -> Vec<ElementId> {
        let Some(sm_id) = self.parent_of(node) else {
            return Vec::new();
        };
        let Ok(sm) = self.statemachine(sm_id) else {
            return Vec::new();
        };
        sm.transitions
            .iter()
            .copied()
            .filter(|&t| matches!(&self.elements[t.index()].kind,
                ElementKind::Transition(tr) if pred(tr)))
            .collect()
    }

    /// Whether the event (or an abstract event it extends, transitively)
    /// already carries a guard with this name.
    pub fn event_has_guard_inherited(&self, event: ElementId, guard_name: &str) -> bool {
        let mut current = Some(event);
        while let Some(ev_id) = current {
            let Ok(ev) = self.event(ev_id) else {
                return false;
            };
            if ev
                .guards
                .iter()
                .any(|&g| self.elements[g.index()].name == guard_name)
            {
                return true;
            }
            if !ev.extended {
                return false;
            }
            let Some(refined_name) = ev.refines.first() else {
                return false;
            };
            current = self
                .owner_machine(ev_id)
                .and_then(|m| self.machine(m).ok())
                .and_then(|m| m.refines.as_deref())
                .and_then(|abs_name| self.machine_by_name(abs_name))
                .and_then(|abs| self.find_event(abs, refined_name));
        }
        false
    }

    /// The abstract original of a refinement-copied element.
    pub fn refines_of(&self, id: ElementId) -> Option<ElementId> {
        self.refines.get(&id).copied()
    }

    /// All copies refining the given element, in creation order.
    pub fn refinements_of(&self, id: ElementId) -> Vec<ElementId> {
        self.refines
            .iter()
            .filter(|(_, &abs)| abs == id)
            .map(|(&copy, _)| copy)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_and_lookup() {
        let mut m = FormalModel::new();
        let mch = m.new_machine("m0", "");
        m.attach_machine(mch).unwrap();
        let ev = m.new_event("ev1");
        assert!(m.attach(mch, Slot::Events, ev).unwrap());
        assert_eq!(m.machine_by_name("m0"), Some(mch));
        assert_eq!(m.find_event(mch, "ev1"), Some(ev));
        assert_eq!(m.parent_of(ev), Some(mch));
        assert_eq!(m.owner_machine(ev), Some(mch));
    }

    #[test]
    fn attach_dedupes_by_name() {
        let mut m = FormalModel::new();
        let mch = m.new_machine("m0", "");
        let ev1 = m.new_event("ev");
        let ev2 = m.new_event("ev");
        assert!(m.attach(mch, Slot::Events, ev1).unwrap());
        assert!(!m.attach(mch, Slot::Events, ev2).unwrap());
        assert_eq!(m.machine(mch).unwrap().events.len(), 1);
    }

    #[test]
    fn duplicate_component_rejected() {
        let mut m = FormalModel::new();
        let a = m.new_machine("m0", "");
        let b = m.new_machine("m0", "");
        m.attach_machine(a).unwrap();
        assert!(matches!(
            m.attach_machine(b),
            Err(FormalError::DuplicateComponent { .. })
        ));
    }

    #[test]
    fn invalid_slot_rejected() {
        let mut m = FormalModel::new();
        let ctx = m.new_context("c0", "");
        let ev = m.new_event("ev");
        assert!(matches!(
            m.attach(ctx, Slot::Events, ev),
            Err(FormalError::InvalidSlot { .. })
        ));
    }

    #[test]
    fn deep_lookup_through_statemachines() {
        let mut m = FormalModel::new();
        let mch = m.new_machine("m0", "");
        let sm = m.new_statemachine("doc_sm");
        m.attach(mch, Slot::Statemachines, sm).unwrap();
        let s = m.new_state("S0");
        m.attach(sm, Slot::Nodes, s).unwrap();
        let nested = m.new_statemachine("S0_sm");
        m.attach(s, Slot::Statemachines, nested).unwrap();

        assert_eq!(m.find_statemachine(mch, "S0_sm"), Some(nested));
        assert_eq!(m.find_node(mch, "S0"), Some(s));
        assert_eq!(m.owner_machine(nested), Some(mch));
    }

    #[test]
    fn incoming_and_outgoing() {
        let mut m = FormalModel::new();
        let mch = m.new_machine("m0", "");
        let sm = m.new_statemachine("doc_sm");
        m.attach(mch, Slot::Statemachines, sm).unwrap();
        let a = m.new_state("A");
        let b = m.new_state("B");
        m.attach(sm, Slot::Nodes, a).unwrap();
        m.attach(sm, Slot::Nodes, b).unwrap();
        let t = m.new_transition("", a, b);
        m.attach(sm, Slot::Transitions, t).unwrap();

        assert_eq!(m.outgoing_transitions(a), vec![t]);
        assert_eq!(m.incoming_transitions(b), vec![t]);
        assert!(m.incoming_transitions(a).is_empty());
    }

    #[test]
    fn kind_mismatch_reported() {
        let mut m = FormalModel::new();
        let ev = m.new_event("ev");
        let err = m.machine(ev).unwrap_err();
        assert!(matches!(err, FormalError::KindMismatch { expected: "machine", .. }));
    }

    #[test]
    fn inherited_guard_found_through_extension() {
        let mut m = FormalModel::new();
        let abs = m.new_machine("m0", "");
        m.attach_machine(abs).unwrap();
        let abs_ev = m.new_event("ev");
        m.attach(abs, Slot::Events, abs_ev).unwrap();
        let g = m.new_guard("trigger_guard", false, "x = t", "");
        m.attach(abs_ev, Slot::Guards, g).unwrap();

        let conc = m.new_machine("m1", "");
        m.machine_mut(conc).unwrap().refines = Some("m0".into());
        m.attach_machine(conc).unwrap();
        let conc_ev = m.new_event("ev");
        {
            let ev = m.event_mut(conc_ev).unwrap();
            ev.refines.push("ev".into());
            ev.extended = true;
        }
        m.attach(conc, Slot::Events, conc_ev).unwrap();

        assert!(m.event_has_guard_inherited(conc_ev, "trigger_guard"));
        assert!(!m.event_has_guard_inherited(conc_ev, "other_guard"));
    }
}
