//! The transition rule: one target transition per level, elaboration of
//! merged combination events, raised-trigger guards, explicit
//! annotations, and finalisation completion guards.

use strata_chart::{Chart, NodeId, NodeKind, UNTRIGGERED};
use strata_formal::{FormalModel, Slot};

use crate::combine;
use crate::context::TranslationContext;
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;
use crate::rules::LevelRef;

/// Translates every transition rooted at a real state (initial
/// transitions have their own rule; transitions of a parallel region
/// state have no target-side representation and are skipped).
#[derive(Default)]
pub struct TransitionRule {
    refinements: Vec<LevelRef>,
}

impl Rule for TransitionRule {
    fn name(&self) -> &'static str {
        "transition"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        let NodeKind::Transition { targets, .. } = chart.kind(element) else {
            return false;
        };
        if targets.is_empty() {
            return false;
        }
        let Some(source) = chart.parent(element) else {
            return false;
        };
        matches!(chart.kind(source), NodeKind::State { .. })
            && chart
                .parent(source)
                .is_some_and(|gp| !matches!(chart.kind(gp), NodeKind::Parallel { .. }))
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
        let Some(source_state) = chart.parent(element) else {
            return false;
        };
        let Some(namespace) = chart.statemachine_namespace(source_state) else {
            return false;
        };
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let source_name = chart.display_name(source_state);
        let NodeKind::Transition { targets, .. } = chart.kind(element) else {
            return false;
        };
        // Single target supported; additional targets are ignored.
        let target_name = &targets[0];

        let start = chart.start_level(element);
        for level in start..=cx.depth {
            let Some(machine) =
                generated.find_machine(model, &notation::machine_name(doc_name, level))
            else {
                return false;
            };
            let Some(statemachine) = model.find_statemachine(machine, &namespace) else {
                return false;
            };
            let Some(source) = model.find_node(machine, source_name) else {
                return false;
            };
            let Some(target) = model.find_node(machine, target_name) else {
                return false;
            };
            self.refinements.push(LevelRef {
                level,
                machine,
                statemachine,
                source,
                target,
            });
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
        let trigger_name = match chart.kind(element) {
            NodeKind::Transition { event, .. } => match event.as_deref() {
                Some(e) if !e.trim().is_empty() => e.trim().to_owned(),
                _ => UNTRIGGERED.to_owned(),
            },
            _ => UNTRIGGERED.to_owned(),
        };
        let label = combine::transition_label(chart, element).unwrap_or_default();
        let cond = match chart.kind(element) {
            NodeKind::Transition { cond, .. } => cond.clone(),
            _ => None,
        };
        let finalised = chart.finalised_level(element);
        let source_name = chart
            .parent(element)
            .map(|s| chart.display_name(s).to_owned())
            .unwrap_or_default();
        let mut descriptors = Vec::new();

        for level_ref in &self.refinements {
            let transition =
                model.new_transition(&label, level_ref.source, level_ref.target);
            model.attach(level_ref.statemachine, Slot::Transitions, transition)?;

            // Negated enabledness, collected for finalisation guards.
            let mut completion = format!("¬({source_name} = TRUE");

            if let Some(trigger) = cx.triggers.get(&trigger_name) {
                for combination in trigger.combinations(chart, level_ref.level) {
                    if !combination.contains(&element) {
                        continue;
                    }
                    let event = combine::get_or_create_combination_event(
                        chart,
                        model,
                        &mut descriptors,
                        level_ref.machine,
                        level_ref.level,
                        trigger,
                        &combination,
                    )?;
                    let tr = model.transition_mut(transition)?;
                    if !tr.elaborates.contains(&event) {
                        tr.elaborates.push(event);
                    }
                }

                completion.push_str(&if trigger.is_untriggered() {
                    format!(" ∧ {} = ∅", notation::DEQUEUED_SET)
                } else {
                    format!(" ∧ {} ∈ {}", trigger.name(), notation::DEQUEUED_SET)
                });
            }

            // Triggers this transition raises at this level.
            let raised: Vec<String> = chart
                .raises(element)
                .into_iter()
                .filter(|&r| chart.start_level(r) <= level_ref.level)
                .filter_map(|r| match chart.kind(r) {
                    NodeKind::Raise { event } => Some(event.clone()),
                    _ => None,
                })
                .collect();
            if !raised.is_empty() {
                let guard = model.new_guard(
                    &format!(
                        "{}{}",
                        notation::RAISED_INTERNAL_GUARD_NAME,
                        level_ref.level
                    ),
                    false,
                    &notation::specific_raised_internal(&raised),
                    "",
                );
                model.attach(transition, Slot::Guards, guard)?;
            }

            // Explicit parameters of the transition.
            for ann in chart.parameters(element) {
                if chart.annotation_level(element, ann) > level_ref.level {
                    continue;
                }
                let type_hint = ann
                    .attr("type")
                    .map(|t| cx.translate_expr(Some(element), t));
                let parameter =
                    model.new_parameter(ann.name(), type_hint.as_deref(), ann.comment());
                model.attach(transition, Slot::Parameters, parameter)?;
            }

            // The transition's condition attribute, bracket-stripped.
            if let Some(cond) = &cond {
                let predicate =
                    notation::strip_brackets(&cx.translate_expr(Some(element), cond));
                let guard = model.new_guard(
                    &format!("{label}_cond"),
                    false,
                    &predicate,
                    "transition condition",
                );
                model.attach(transition, Slot::Guards, guard)?;
                completion.push_str(&format!(" ∧ {predicate}"));
            }

            // Explicit guards of the transition.
            for ann in chart.guards(element) {
                if chart.annotation_level(element, ann) > level_ref.level {
                    continue;
                }
                let predicate = cx.translate_expr(Some(element), ann.predicate().unwrap_or(""));
                let guard = model.new_guard(ann.name(), ann.derived(), &predicate, ann.comment());
                model.attach(transition, Slot::Guards, guard)?;
                if !ann.derived() {
                    completion.push_str(&format!(" ∧ {predicate}"));
                }
            }

            // Assign actions of the transition.
            let mut index = 0;
            for assign in chart.assigns(element) {
                if chart.start_level(assign) > level_ref.level {
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
                    &format!("{label}_act_{index}"),
                    &notation::assign_action(
                        &notation::flatten_location(&location),
                        &translated,
                        nondet,
                    ),
                    "transition assign",
                );
                model.attach(transition, Slot::Actions, action)?;
                index += 1;
            }

            completion.push(')');

            // Once the refinement is finalised, the completion events must
            // know this transition can no longer be enabled.
            if let Some(f) = finalised {
                if f > 0 && level_ref.level >= f {
                    let completion_event = if trigger_name == UNTRIGGERED {
                        notation::COMPLETION_EVENT
                    } else {
                        notation::NO_ENABLED_EVENT
                    };
                    if let Some(event) = model.find_event(level_ref.machine, completion_event) {
                        let guard_name = notation::completion_guard_name(&label);
                        if !model.event_has_guard_inherited(event, &guard_name) {
                            let guard =
                                model.new_guard(&guard_name, false, &completion, "");
                            model.attach(event, Slot::Guards, guard)?;
                        }
                    }
                }
            }
        }

        Ok(descriptors)
    }
}
