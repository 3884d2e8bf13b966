//! The state rule: one target state node per level, chained by
//! refinement copy, plus the nested statemachines the state owns.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{ElementId, FormalModel, Slot};

use crate::context::{ChainKey, TranslationContext};
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;

/// Translates a state into a node of its parent statemachine at every
/// level from its start level to the document depth. At the state's own
/// annotated level it also creates the nested statemachines: one for the
/// state's own compound content, one per parallel region child. Region
/// states (direct children of a parallel) generate no node of their own —
/// they *are* nested statemachines of the enclosing state.
#[derive(Default)]
pub struct StateRule {
    refinements: Vec<(u32, ElementId)>,
}

impl Rule for StateRule {
    fn name(&self) -> &'static str {
        "state"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::State { .. })
            && chart
                .parent(element)
                .is_some_and(|p| !matches!(chart.kind(p), NodeKind::Parallel { .. }))
    }

    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool {
        self.refinements.clear();
        let Some(namespace) = chart.statemachine_namespace(element) else {
            return false;
        };
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let start = chart.start_level(element);
        for level in start..=cx.depth {
            let Some(machine) =
                generated.find_machine(model, &notation::machine_name(doc_name, level))
            else {
                return false;
            };
            let Some(psm) = model.find_statemachine(machine, &namespace) else {
                return false;
            };
            self.refinements.push((level, psm));
        }
        true
    }

    fn fire(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &mut TranslationContext,
        model: &mut FormalModel,
        _generated: &Generated,
    ) -> Result<Vec<Descriptor>, TranslateError> {
        let state_id = chart.display_name(element).to_owned();
        let region_level = chart.region_level(element);
        let has_own_region = chart.has_own_region(element);
        let parallel_regions = chart.parallel_regions(element);
        let start = self.refinements.first().map(|&(l, _)| l).unwrap_or(0);

        let mut previous: Option<ElementId> = None;
        for &(level, psm) in &self.refinements {
            let node = match previous {
                None => model.new_state(&state_id),
                Some(p) => model.refine_element(p)?,
            };
            model.attach(psm, Slot::Nodes, node)?;

            if level == region_level {
                if has_own_region {
                    let sm = model.new_statemachine(&notation::statemachine_name(&state_id));
                    model.attach(node, Slot::Statemachines, sm)?;
                }
                for &region in &parallel_regions {
                    let sm = model.new_statemachine(&notation::statemachine_name(
                        chart.display_name(region),
                    ));
                    model.attach(node, Slot::Statemachines, sm)?;
                }
            }

            for ann in chart.invariants(element) {
                if chart.annotation_level(element, ann) != level {
                    continue;
                }
                let predicate = cx.translate_expr(Some(element), ann.predicate().unwrap_or(""));
                let predicate = notation::state_invariant(ann.attr("trigger"), &predicate);
                let inv = model.new_invariant(ann.name(), ann.derived(), &predicate, ann.comment());
                model.attach(node, Slot::Invariants, inv)?;
            }

            cx.record_chain(ChainKey::Source(element), start, node);
            previous = Some(node);
        }

        Ok(Vec::new())
    }
}
