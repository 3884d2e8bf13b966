//! Refinement copy: the structural deep-copy that connects a concrete
//! element to its abstract original.
//!
//! `refine_element` clones a subtree with fresh ids; `refine_machine` and
//! `refine_context` produce the next level of a component chain. Every
//! copied element records a refines edge back to the element it was copied
//! from, so the chain stays navigable without pointer aliasing.

use std::collections::BTreeMap;

use crate::element::{
    Context, ElementId, ElementKind, Machine, Statemachine, Transition,
};
use crate::error::FormalError;
use crate::model::FormalModel;

impl FormalModel {
    /// Deep-copy the subtree rooted at `abstract_id` with fresh ids. The
    /// copy is unattached; internal transition references (source, target,
    /// elaborates) are remapped onto the copied elements. Records a
    /// refines edge for every copied element.
    pub fn refine_element(&mut self, abstract_id: ElementId) -> Result<ElementId, FormalError> {
        let mut map = BTreeMap::new();
        let copy = self.copy_subtree(abstract_id, &mut map)?;
        self.remap_references(&map);
        for (&old, &new) in &map {
            self.record_refines(new, old);
        }
        Ok(copy)
    }

    /// Create the machine refining `abstract_id`, named `new_name`.
    ///
    /// Variables are re-declared, events are copied and marked extended
    /// (each refining its same-named abstract event), and statemachine
    /// structure is deep-copied. Invariants are inherited, not copied, and
    /// the sees list starts empty — the caller pairs the new machine with
    /// its own context.
    pub fn refine_machine(
        &mut self,
        abstract_id: ElementId,
        new_name: &str,
        comment: &str,
    ) -> Result<ElementId, FormalError> {
        let abstract_name = self.name(abstract_id).to_owned();
        let abs = self.machine(abstract_id)?.clone();

        let mut map = BTreeMap::new();
        let mut variables = Vec::with_capacity(abs.variables.len());
        for v in &abs.variables {
            variables.push(self.copy_subtree(*v, &mut map)?);
        }
        let mut events = Vec::with_capacity(abs.events.len());
        for e in &abs.events {
            let copy = self.copy_subtree(*e, &mut map)?;
            let refined_name = self.name(*e).to_owned();
            let ev = self.event_mut(copy)?;
            ev.refines = vec![refined_name];
            ev.extended = true;
            events.push(copy);
        }
        let mut statemachines = Vec::with_capacity(abs.statemachines.len());
        for sm in &abs.statemachines {
            statemachines.push(self.copy_subtree(*sm, &mut map)?);
        }
        self.remap_references(&map);

        let machine = self.alloc(
            new_name,
            comment,
            ElementKind::Machine(Machine {
                refines: Some(abstract_name),
                sees: Vec::new(),
                variables,
                invariants: Vec::new(),
                events,
                statemachines,
            }),
        );
        self.adopt_children(machine);
        for (&old, &new) in &map {
            self.record_refines(new, old);
        }
        self.record_refines(machine, abstract_id);
        Ok(machine)
    }

    /// Create the context extending `abstract_id`, named `new_name`. The
    /// extension inherits the abstract content; the new context starts
    /// empty.
    pub fn refine_context(
        &mut self,
        abstract_id: ElementId,
        new_name: &str,
        comment: &str,
    ) -> Result<ElementId, FormalError> {
        let abstract_name = self.name(abstract_id).to_owned();
        self.context(abstract_id)?;
        let context = self.alloc(
            new_name,
            comment,
            ElementKind::Context(Context {
                extends: Some(abstract_name),
                ..Context::default()
            }),
        );
        self.record_refines(context, abstract_id);
        Ok(context)
    }

    fn copy_subtree(
        &mut self,
        root: ElementId,
        map: &mut BTreeMap<ElementId, ElementId>,
    ) -> Result<ElementId, FormalError> {
        let src = self
            .get(root)
            .ok_or(FormalError::ElementNotFound(root))?
            .clone();
        let kind = match src.kind {
            ElementKind::Machine(m) => {
                let mut copy = Machine {
                    refines: m.refines.clone(),
                    sees: m.sees.clone(),
                    ..Machine::default()
                };
                for v in &m.variables {
                    let c = self.copy_subtree(*v, map)?;
                    copy.variables.push(c);
                }
                for i in &m.invariants {
                    let c = self.copy_subtree(*i, map)?;
                    copy.invariants.push(c);
                }
                for e in &m.events {
                    let c = self.copy_subtree(*e, map)?;
                    copy.events.push(c);
                }
                for sm in &m.statemachines {
                    let c = self.copy_subtree(*sm, map)?;
                    copy.statemachines.push(c);
                }
                ElementKind::Machine(copy)
            }
            ElementKind::Context(c) => {
                let mut copy = Context {
                    extends: c.extends.clone(),
                    ..Context::default()
                };
                for s in &c.sets {
                    let n = self.copy_subtree(*s, map)?;
                    copy.sets.push(n);
                }
                for k in &c.constants {
                    let n = self.copy_subtree(*k, map)?;
                    copy.constants.push(n);
                }
                for a in &c.axioms {
                    let n = self.copy_subtree(*a, map)?;
                    copy.axioms.push(n);
                }
                ElementKind::Context(copy)
            }
            ElementKind::Event(e) => {
                let mut copy = crate::element::Event {
                    refines: e.refines.clone(),
                    extended: e.extended,
                    ..Default::default()
                };
                for p in &e.parameters {
                    let n = self.copy_subtree(*p, map)?;
                    copy.parameters.push(n);
                }
                for g in &e.guards {
                    let n = self.copy_subtree(*g, map)?;
                    copy.guards.push(n);
                }
                for a in &e.actions {
                    let n = self.copy_subtree(*a, map)?;
                    copy.actions.push(n);
                }
                ElementKind::Event(copy)
            }
            ElementKind::Statemachine(sm) => {
                let mut copy = Statemachine::default();
                for n in &sm.nodes {
                    let c = self.copy_subtree(*n, map)?;
                    copy.nodes.push(c);
                }
                for t in &sm.transitions {
                    let c = self.copy_subtree(*t, map)?;
                    copy.transitions.push(c);
                }
                ElementKind::Statemachine(copy)
            }
            ElementKind::StateNode(s) => {
                let mut copy = crate::element::StateNode::new(s.role);
                for a in &s.entry_actions {
                    let n = self.copy_subtree(*a, map)?;
                    copy.entry_actions.push(n);
                }
                for i in &s.invariants {
                    let n = self.copy_subtree(*i, map)?;
                    copy.invariants.push(n);
                }
                for sm in &s.statemachines {
                    let n = self.copy_subtree(*sm, map)?;
                    copy.statemachines.push(n);
                }
                ElementKind::StateNode(copy)
            }
            ElementKind::Transition(t) => {
                // Source/target/elaborates stay pointing at the abstract
                // elements until the remap pass.
                let mut copy = Transition::new(t.source, t.target);
                copy.elaborates = t.elaborates.clone();
                for p in &t.parameters {
                    let n = self.copy_subtree(*p, map)?;
                    copy.parameters.push(n);
                }
                for g in &t.guards {
                    let n = self.copy_subtree(*g, map)?;
                    copy.guards.push(n);
                }
                for a in &t.actions {
                    let n = self.copy_subtree(*a, map)?;
                    copy.actions.push(n);
                }
                ElementKind::Transition(copy)
            }
            leaf => leaf,
        };
        let id = self.alloc(&src.name, &src.comment, kind);
        self.adopt_children(id);
        map.insert(root, id);
        Ok(id)
    }

    /// Point the parent links of `owner`'s direct children at `owner`.
    fn adopt_children(&mut self, owner: ElementId) {
        let children = match self.get(owner) {
            Some(el) => el.children(),
            None => return,
        };
        for c in children {
            if let Some(child) = self.get_mut(c) {
                child.parent = Some(owner);
            }
        }
    }

    /// Rewrite copied transition endpoints and elaborated events through
    /// the old-to-new id map.
    fn remap_references(&mut self, map: &BTreeMap<ElementId, ElementId>) {
        for &new_id in map.values() {
            if let Some(el) = self.get_mut(new_id) {
                if let ElementKind::Transition(t) = &mut el.kind {
                    if let Some(&s) = map.get(&t.source) {
                        t.source = s;
                    }
                    if let Some(&tg) = map.get(&t.target) {
                        t.target = tg;
                    }
                    for e in &mut t.elaborates {
                        if let Some(&n) = map.get(e) {
                            *e = n;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Slot;

    #[test]
    fn refine_element_copies_subtree() {
        let mut m = FormalModel::new();
        let s = m.new_state("S0");
        let a = m.new_action("S0_onentry_0", "x ≔ 1", "");
        m.attach(s, Slot::EntryActions, a).unwrap();

        let copy = m.refine_element(s).unwrap();
        assert_ne!(copy, s);
        assert_eq!(m.name(copy), "S0");
        assert_eq!(m.refines_of(copy), Some(s));
        let copied_actions = &m.state_node(copy).unwrap().entry_actions;
        assert_eq!(copied_actions.len(), 1);
        assert_ne!(copied_actions[0], a);
        assert_eq!(m.name(copied_actions[0]), "S0_onentry_0");
    }

    #[test]
    fn refine_machine_marks_events_extended() {
        let mut m = FormalModel::new();
        let abs = m.new_machine("basis", "");
        let ev = m.new_event("consume");
        let g = m.new_guard("g1", false, "x > 0", "");
        m.attach(ev, Slot::Guards, g).unwrap();
        m.attach(abs, Slot::Events, ev).unwrap();
        let v = m.new_variable("rtc_iq", "");
        m.attach(abs, Slot::Variables, v).unwrap();
        let inv = m.new_invariant("typeof_rtc_iq", false, "rtc_iq ⊆ T", "");
        m.attach(abs, Slot::Invariants, inv).unwrap();

        let conc = m.refine_machine(abs, "doc_0", "").unwrap();
        let mch = m.machine(conc).unwrap().clone();
        assert_eq!(mch.refines.as_deref(), Some("basis"));
        assert!(mch.sees.is_empty());
        // Variables re-declared, invariants inherited.
        assert_eq!(mch.variables.len(), 1);
        assert!(mch.invariants.is_empty());
        // Events copied, extended, refining their abstract namesakes.
        assert_eq!(mch.events.len(), 1);
        let copied = m.event(mch.events[0]).unwrap();
        assert!(copied.extended);
        assert_eq!(copied.refines, vec!["consume".to_owned()]);
        assert_eq!(copied.guards.len(), 1);
        assert_eq!(m.refines_of(conc), Some(abs));
    }

    #[test]
    fn refine_machine_remaps_statemachine_structure() {
        let mut m = FormalModel::new();
        let abs = m.new_machine("m0", "");
        let sm = m.new_statemachine("doc_sm");
        m.attach(abs, Slot::Statemachines, sm).unwrap();
        let a = m.new_state("A");
        let b = m.new_state("B");
        m.attach(sm, Slot::Nodes, a).unwrap();
        m.attach(sm, Slot::Nodes, b).unwrap();
        let t = m.new_transition("", a, b);
        m.attach(sm, Slot::Transitions, t).unwrap();

        let conc = m.refine_machine(abs, "m1", "").unwrap();
        let new_sm = m.find_statemachine(conc, "doc_sm").unwrap();
        assert_ne!(new_sm, sm);
        let sm_payload = m.statemachine(new_sm).unwrap();
        let new_t = sm_payload.transitions[0];
        let tr = m.transition(new_t).unwrap();
        // Endpoints remapped onto the copied nodes, not the originals.
        assert_ne!(tr.source, a);
        assert_ne!(tr.target, b);
        assert_eq!(m.name(tr.source), "A");
        assert_eq!(m.name(tr.target), "B");
    }

    #[test]
    fn refine_context_starts_empty() {
        let mut m = FormalModel::new();
        let abs = m.new_context("basis", "");
        let set = m.new_carrier_set("RTC_TRIGGER", "");
        m.attach(abs, Slot::Sets, set).unwrap();

        let conc = m.refine_context(abs, "doc_0_ctx", "").unwrap();
        let ctx = m.context(conc).unwrap();
        assert_eq!(ctx.extends.as_deref(), Some("basis"));
        assert!(ctx.sets.is_empty());
        assert!(ctx.constants.is_empty());
    }
}
