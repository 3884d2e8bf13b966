//! Deterministic JSON bundle of a translated model.
//!
//! Machines and contexts are emitted in attachment order (level order for
//! a refinement chain) with their structure inline, so two structurally
//! identical models serialize byte-identically.

use serde_json::{json, Value};

use crate::element::{ElementId, ElementKind};
use crate::model::FormalModel;

impl FormalModel {
    /// Serialize the whole chain to a JSON bundle.
    pub fn to_json(&self) -> Value {
        json!({
            "machines": self.machines().iter().map(|&m| self.machine_json(m)).collect::<Vec<_>>(),
            "contexts": self.contexts().iter().map(|&c| self.context_json(c)).collect::<Vec<_>>(),
        })
    }

    fn machine_json(&self, id: ElementId) -> Value {
        let Ok(m) = self.machine(id) else {
            return Value::Null;
        };
        json!({
            "name": self.name(id),
            "refines": m.refines,
            "sees": m.sees,
            "variables": m.variables.iter().map(|&v| json!({"name": self.name(v)})).collect::<Vec<_>>(),
            "invariants": m.invariants.iter().map(|&i| self.predicate_json(i)).collect::<Vec<_>>(),
            "events": m.events.iter().map(|&e| self.event_json(e)).collect::<Vec<_>>(),
            "statemachines": m.statemachines.iter().map(|&sm| self.statemachine_json(sm)).collect::<Vec<_>>(),
        })
    }

    fn context_json(&self, id: ElementId) -> Value {
        let Ok(c) = self.context(id) else {
            return Value::Null;
        };
        json!({
            "name": self.name(id),
            "extends": c.extends,
            "sets": c.sets.iter().map(|&s| json!({"name": self.name(s)})).collect::<Vec<_>>(),
            "constants": c.constants.iter().map(|&k| json!({"name": self.name(k)})).collect::<Vec<_>>(),
            "axioms": c.axioms.iter().map(|&a| self.predicate_json(a)).collect::<Vec<_>>(),
        })
    }

    fn event_json(&self, id: ElementId) -> Value {
        let Ok(e) = self.event(id) else {
            return Value::Null;
        };
        json!({
            "name": self.name(id),
            "refines": e.refines,
            "extended": e.extended,
            "parameters": e.parameters.iter().map(|&p| json!({"name": self.name(p)})).collect::<Vec<_>>(),
            "guards": e.guards.iter().map(|&g| self.predicate_json(g)).collect::<Vec<_>>(),
            "actions": e.actions.iter().map(|&a| self.action_json(a)).collect::<Vec<_>>(),
        })
    }

    fn statemachine_json(&self, id: ElementId) -> Value {
        let Ok(sm) = self.statemachine(id) else {
            return Value::Null;
        };
        json!({
            "name": self.name(id),
            "nodes": sm.nodes.iter().map(|&n| self.node_json(n)).collect::<Vec<_>>(),
            "transitions": sm.transitions.iter().map(|&t| self.transition_json(t)).collect::<Vec<_>>(),
        })
    }

    fn node_json(&self, id: ElementId) -> Value {
        let Ok(n) = self.state_node(id) else {
            return Value::Null;
        };
        let role = match n.role {
            crate::element::NodeRole::State => "state",
            crate::element::NodeRole::Initial => "initial",
            crate::element::NodeRole::Final => "final",
        };
        json!({
            "name": self.name(id),
            "role": role,
            "entry_actions": n.entry_actions.iter().map(|&a| self.action_json(a)).collect::<Vec<_>>(),
            "invariants": n.invariants.iter().map(|&i| self.predicate_json(i)).collect::<Vec<_>>(),
            "statemachines": n.statemachines.iter().map(|&sm| self.statemachine_json(sm)).collect::<Vec<_>>(),
        })
    }

    fn transition_json(&self, id: ElementId) -> Value {
        let Ok(t) = self.transition(id) else {
            return Value::Null;
        };
        json!({
            "source": self.name(t.source),
            "target": self.name(t.target),
            "elaborates": t.elaborates.iter().map(|&e| self.name(e)).collect::<Vec<_>>(),
            "parameters": t.parameters.iter().map(|&p| json!({"name": self.name(p)})).collect::<Vec<_>>(),
            "guards": t.guards.iter().map(|&g| self.predicate_json(g)).collect::<Vec<_>>(),
            "actions": t.actions.iter().map(|&a| self.action_json(a)).collect::<Vec<_>>(),
        })
    }

    fn predicate_json(&self, id: ElementId) -> Value {
        match self.get(id).map(|e| &e.kind) {
            Some(ElementKind::Guard(p))
            | Some(ElementKind::Invariant(p))
            | Some(ElementKind::Axiom(p)) => json!({
                "name": self.name(id),
                "predicate": p.predicate,
                "theorem": p.theorem,
            }),
            _ => Value::Null,
        }
    }

    fn action_json(&self, id: ElementId) -> Value {
        match self.get(id).map(|e| &e.kind) {
            Some(ElementKind::Action(a)) => json!({
                "name": self.name(id),
                "expression": a.expression,
            }),
            _ => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{FormalModel, Slot};

    #[test]
    fn bundle_shape() {
        let mut m = FormalModel::new();
        let ctx = m.new_context("basis", "");
        m.attach_context(ctx).unwrap();
        let mch = m.new_machine("doc_0", "");
        m.machine_mut(mch).unwrap().sees.push("basis".into());
        m.attach_machine(mch).unwrap();
        let ev = m.new_event("ev");
        m.attach(mch, Slot::Events, ev).unwrap();

        let bundle = m.to_json();
        assert_eq!(bundle["machines"][0]["name"], "doc_0");
        assert_eq!(bundle["machines"][0]["sees"][0], "basis");
        assert_eq!(bundle["machines"][0]["events"][0]["name"], "ev");
        assert_eq!(bundle["contexts"][0]["name"], "basis");
    }

    #[test]
    fn identical_models_serialize_identically() {
        let build = || {
            let mut m = FormalModel::new();
            let mch = m.new_machine("m0", "");
            m.attach_machine(mch).unwrap();
            let ev = m.new_event("ev");
            m.attach(mch, Slot::Events, ev).unwrap();
            let g = m.new_guard("g", false, "x > 0", "");
            m.attach(ev, Slot::Guards, g).unwrap();
            m.to_json()
        };
        assert_eq!(build().to_string(), build().to_string());
    }
}
