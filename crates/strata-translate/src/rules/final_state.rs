//! Final pseudostate rules.
//!
//! A source final state generates two things: a pre-final state (a plain
//! node carrying the final state's name, created by the normal-pass rule
//! here) and, late, the real final node plus the transition into it. The
//! final transition elaborates the events of the parent state's outgoing
//! transitions, so it must run after those exist.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{ElementId, ElementKind, FormalModel, Slot};

use crate::context::{ChainKey, TranslationContext};
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;

fn statemachines_per_level(
    chart: &Chart,
    element: NodeId,
    cx: &TranslationContext,
    model: &FormalModel,
    generated: &Generated,
    out: &mut Vec<(u32, ElementId)>,
) -> bool {
    out.clear();
    let Some(namespace) = chart.statemachine_namespace(element) else {
        return false;
    };
    let Some(document) = chart.containing_document(element) else {
        return false;
    };
    let doc_name = chart.display_name(document);
    let start = chart.start_level(element);
    for level in start..=cx.depth {
        let Some(machine) = generated.find_machine(model, &notation::machine_name(doc_name, level))
        else {
            return false;
        };
        let Some(psm) = model.find_statemachine(machine, &namespace) else {
            return false;
        };
        out.push((level, psm));
    }
    true
}

/// Creates the pre-final state chain carrying the source final's name.
#[derive(Default)]
pub struct FinalStateRule {
    refinements: Vec<(u32, ElementId)>,
}

impl Rule for FinalStateRule {
    fn name(&self) -> &'static str {
        "final-state"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Final { .. })
    }

    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool {
        statemachines_per_level(chart, element, cx, model, generated, &mut self.refinements)
    }

    fn fire(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &mut TranslationContext,
        model: &mut FormalModel,
        _generated: &Generated,
    ) -> Result<Vec<Descriptor>, TranslateError> {
        let final_id = chart.display_name(element).to_owned();
        let start = self.refinements.first().map(|&(l, _)| l).unwrap_or(0);
        let mut previous: Option<ElementId> = None;
        for &(_, psm) in &self.refinements {
            let node = match previous {
                None => model.new_state(&final_id),
                Some(p) => model.refine_element(p)?,
            };
            model.attach(psm, Slot::Nodes, node)?;
            cx.record_chain(ChainKey::Source(element), start, node);
            previous = Some(node);
        }
        Ok(Vec::new())
    }
}

/// Creates, late, the final node and the pre-final-to-final transition,
/// which elaborates whatever leaves the parent state.
#[derive(Default)]
pub struct FinalNodeRule {
    refinements: Vec<(u32, ElementId, ElementId)>,
}

impl Rule for FinalNodeRule {
    fn name(&self) -> &'static str {
        "final-node"
    }

    fn fire_late(&self) -> bool {
        true
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Final { .. })
    }

    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool {
        let mut statemachines = Vec::new();
        if !statemachines_per_level(chart, element, cx, model, generated, &mut statemachines) {
            return false;
        }
        self.refinements.clear();
        let final_id = chart.display_name(element);
        for (level, psm) in statemachines {
            // The pre-final state must already have been generated.
            let Some(pre_final) = self
                .find_node_in(model, psm, final_id)
            else {
                return false;
            };
            self.refinements.push((level, psm, pre_final));
        }
        true
    }

    fn fire(
        &mut self,
        _chart: &Chart,
        _element: NodeId,
        _cx: &mut TranslationContext,
        model: &mut FormalModel,
        _generated: &Generated,
    ) -> Result<Vec<Descriptor>, TranslateError> {
        for &(_, psm, pre_final) in &self.refinements {
            let sm_name = model.name(psm).to_owned();
            let final_node = model.new_final_node(&notation::final_node_name(&sm_name));
            model.attach(psm, Slot::Nodes, final_node)?;

            let transition = model.new_transition("", pre_final, final_node);
            model.attach(psm, Slot::Transitions, transition)?;

            // Leaving the parent state also leaves this nested region: the
            // final transition elaborates the parent's outgoing events.
            if let Some(owner) = model.parent_of(psm) {
                if matches!(
                    model.get(owner).map(|e| &e.kind),
                    Some(ElementKind::StateNode(_))
                ) {
                    let mut inherited = Vec::new();
                    for outgoing in model.outgoing_transitions(owner) {
                        inherited.extend(model.transition(outgoing)?.elaborates.clone());
                    }
                    let tr = model.transition_mut(transition)?;
                    for event in inherited {
                        if !tr.elaborates.contains(&event) {
                            tr.elaborates.push(event);
                        }
                    }
                }
            }
        }
        Ok(Vec::new())
    }
}

impl FinalNodeRule {
    fn find_node_in(
        &self,
        model: &FormalModel,
        statemachine: ElementId,
        name: &str,
    ) -> Option<ElementId> {
        let sm = model.statemachine(statemachine).ok()?;
        sm.nodes
            .iter()
            .copied()
            .find(|&n| model.name(n) == name)
    }
}
