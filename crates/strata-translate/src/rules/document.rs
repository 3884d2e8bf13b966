//! The document rule: basis pair, the refinement chain of machines and
//! contexts, per-level trigger definitions, and document invariants.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{FormalModel, Slot};

use crate::context::{ChainKey, TranslationContext};
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;
use crate::stratify;

/// Translates the document root into the whole chain of machine/context
/// pairs. Fires first; every other rule depends on the machines it
/// creates.
pub struct DocumentRule;

impl Rule for DocumentRule {
    fn name(&self) -> &'static str {
        "document"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Document { .. })
    }

    fn dependencies_ok(
        &mut self,
        _chart: &Chart,
        _element: NodeId,
        _cx: &TranslationContext,
        _model: &FormalModel,
        _generated: &Generated,
    ) -> bool {
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
        let doc_name = chart.display_name(element).to_owned();
        let comment = format!("(generated from statechart {doc_name})");
        let mut descriptors = Vec::new();

        let basis_context = stratify::build_basis_context(model)?;
        descriptors.push(Descriptor::context(basis_context));
        let basis_machine = stratify::build_basis_machine(model)?;
        descriptors.push(Descriptor::machine(basis_machine));

        let mut machine = basis_machine;
        let mut context = basis_context;
        let mut all_triggers: Vec<String> = Vec::new();

        for level in 0..=cx.depth {
            machine =
                model.refine_machine(machine, &notation::machine_name(&doc_name, level), &comment)?;
            self.reguard_refined_events(chart, cx, model, machine, level)?;
            descriptors.push(Descriptor::machine(machine));

            context =
                model.refine_context(context, &notation::context_name(&doc_name, level), &comment)?;
            descriptors.push(Descriptor::context(context));
            model
                .machine_mut(machine)?
                .sees
                .push(notation::context_name(&doc_name, level));

            // The top-level statemachine exists only at level 0; deeper
            // levels obtain it by refinement copy. Document-level parallel
            // regions each become a machine-level statemachine of their own.
            if level == 0 {
                let sm = model.new_statemachine(&notation::statemachine_name(&doc_name));
                model.attach(machine, Slot::Statemachines, sm)?;
                for region in chart.parallel_regions(element) {
                    let sm = model.new_statemachine(&notation::statemachine_name(
                        chart.display_name(region),
                    ));
                    model.attach(machine, Slot::Statemachines, sm)?;
                }
            }

            // Document invariants declared for this level.
            for ann in chart.invariants(element) {
                if chart.annotation_level(element, ann) != level {
                    continue;
                }
                let predicate = cx.translate_expr(Some(element), ann.predicate().unwrap_or(""));
                let predicate = notation::state_invariant(ann.attr("trigger"), &predicate);
                let inv = model.new_invariant(ann.name(), ann.derived(), &predicate, ann.comment());
                model.attach(machine, Slot::Invariants, inv)?;
            }

            // Triggers introduced at this level: a constant each, the
            // partition axioms, and a raising event per external trigger.
            let future_internal = model.new_constant(&notation::internal_triggers_name(level), "");
            model.attach(context, Slot::Constants, future_internal)?;
            let future_external = model.new_constant(&notation::external_triggers_name(level), "");
            model.attach(context, Slot::Constants, future_external)?;

            let mut internals: Vec<String> = Vec::new();
            let mut externals: Vec<String> = Vec::new();
            let introduced: Vec<(String, bool)> = cx
                .triggers
                .iter()
                .filter(|t| !t.is_untriggered() && t.level(chart) == level)
                .map(|t| (t.name().to_owned(), t.is_external()))
                .collect();
            for (trigger_name, is_external) in introduced {
                let constant = model.new_constant(&trigger_name, "trigger");
                model.attach(context, Slot::Constants, constant)?;
                if is_external {
                    let event =
                        model.new_event(&format!("ExternalTriggerEvent_{trigger_name}"));
                    {
                        let ev = model.event_mut(event)?;
                        ev.refines
                            .push(notation::FUTURE_EXTERNAL_RAISE_EVENT.to_owned());
                        ev.extended = true;
                    }
                    let guard = model.new_guard(
                        notation::RAISED_EXTERNAL_GUARD_NAME,
                        false,
                        &notation::specific_raised_external(&trigger_name),
                        "",
                    );
                    model.attach(event, Slot::Guards, guard)?;
                    model.attach(machine, Slot::Events, event)?;
                    externals.push(trigger_name);
                } else {
                    internals.push(trigger_name);
                }
            }

            let (name, predicate) = notation::external_trigger_axiom(level, &externals);
            let axiom = model.new_axiom(&name, false, &predicate, "");
            model.attach(context, Slot::Axioms, axiom)?;
            let (name, predicate) = notation::internal_trigger_axiom(level, &internals);
            let axiom = model.new_axiom(&name, false, &predicate, "");
            model.attach(context, Slot::Axioms, axiom)?;

            let introduced_here = !externals.is_empty() || !internals.is_empty();
            all_triggers.extend(externals);
            all_triggers.extend(internals);
            if level > 0 && introduced_here {
                let (name, predicate) = notation::animation_setup_axiom(level, &all_triggers);
                let axiom = model.new_axiom(&name, false, &predicate, "animation setup");
                model.attach(context, Slot::Axioms, axiom)?;
            }

            cx.record_chain(ChainKey::Machine, 0, machine);
            cx.record_chain(ChainKey::Context, 0, context);
        }

        Ok(descriptors)
    }
}

impl DocumentRule {
    /// Refined events extend their abstract originals: clear what the copy
    /// re-declared, then re-guard the two future placeholders so concrete
    /// levels constrain what is still future at this level.
    fn reguard_refined_events(
        &self,
        chart: &Chart,
        cx: &TranslationContext,
        model: &mut FormalModel,
        machine: strata_formal::ElementId,
        level: u32,
    ) -> Result<(), TranslateError> {
        let events = model.machine(machine)?.events.clone();
        for event in events {
            let name = model.name(event).to_owned();
            {
                let ev = model.event_mut(event)?;
                if ev.refines.is_empty() {
                    continue;
                }
                ev.extended = true;
                ev.parameters.clear();
                ev.guards.clear();
                ev.actions.clear();
            }
            if name == notation::FUTURE_EXTERNAL_RAISE_EVENT {
                let (gname, predicate) = notation::raised_external_level_guard(level);
                let guard = model.new_guard(&gname, false, &predicate, "");
                model.attach(event, Slot::Guards, guard)?;
            } else if name == notation::FUTURE_TRIGGERED_EVENT {
                let defined: Vec<String> = cx
                    .triggers
                    .iter()
                    .filter(|t| !t.is_untriggered() && t.level(chart) == level)
                    .map(|t| t.name().to_owned())
                    .collect();
                if !defined.is_empty() {
                    let (gname, predicate) = notation::defined_triggers_guard(level, &defined);
                    let guard = model.new_guard(&gname, false, &predicate, "");
                    model.attach(event, Slot::Guards, guard)?;
                }
            }
        }
        Ok(())
    }
}
