//! The entry-action rule: assigns of an entry handler become entry
//! actions of the owning state's node at each level.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{ElementId, FormalModel, Slot};

use crate::context::TranslationContext;
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;

#[derive(Default)]
pub struct EntryActionRule {
    refinements: Vec<(u32, ElementId)>,
}

impl Rule for EntryActionRule {
    fn name(&self) -> &'static str {
        "entry-action"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::OnEntry)
            && chart
                .parent(element)
                .is_some_and(|p| matches!(chart.kind(p), NodeKind::State { .. }))
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
        let Some(state) = chart.parent(element) else {
            return false;
        };
        let state_name = chart.display_name(state);
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let start = chart.start_level(element).max(chart.start_level(state));
        for level in start..=cx.depth {
            let Some(machine) =
                generated.find_machine(model, &notation::machine_name(doc_name, level))
            else {
                return false;
            };
            let Some(node) = model.find_node(machine, state_name) else {
                return false;
            };
            self.refinements.push((level, node));
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
        let state_name = chart
            .parent(element)
            .map(|p| chart.display_name(p).to_owned())
            .unwrap_or_default();
        for &(level, node) in &self.refinements {
            let mut index = 0;
            for assign in chart.assigns(element) {
                if chart.start_level(assign) > level {
                    continue;
                }
                let NodeKind::Assign { location, expr } = chart.kind(assign) else {
                    continue;
                };
                let (location, expr) = (location.clone(), expr.clone());
                let (nondet, raw) = match expr.strip_prefix("::") {
                    Some(rest) => (true, rest),
                    None => (false, expr.as_str()),
                };
                let translated = cx.translate_expr(Some(assign), raw);
                let action = model.new_action(
                    &format!("{state_name}_onentry_{index}"),
                    &notation::assign_action(
                        &notation::flatten_location(&location),
                        &translated,
                        nondet,
                    ),
                    "state entry assign",
                );
                model.attach(node, Slot::EntryActions, action)?;
                index += 1;
            }
        }
        Ok(Vec::new())
    }
}
