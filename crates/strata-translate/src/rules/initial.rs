//! Initial pseudostate rules: the initial node per level, and the initial
//! transition that elaborates whatever events enter its parent state.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{ElementId, ElementKind, FormalModel, Slot};

use crate::context::{ChainKey, TranslationContext};
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;
use crate::rules::LevelRef;

/// Creates the `{sm}_initialState` node of the owning statemachine at
/// every level, chained by refinement copy.
#[derive(Default)]
pub struct InitialNodeRule {
    refinements: Vec<(u32, ElementId)>,
}

impl Rule for InitialNodeRule {
    fn name(&self) -> &'static str {
        "initial-node"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Initial)
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
        let namespace = chart
            .statemachine_namespace(element)
            .unwrap_or_default();
        let node_name = notation::initial_node_name(&namespace);
        let start = self.refinements.first().map(|&(l, _)| l).unwrap_or(0);

        let mut previous: Option<ElementId> = None;
        for &(_, psm) in &self.refinements {
            let node = match previous {
                None => model.new_initial_node(&node_name),
                Some(p) => model.refine_element(p)?,
            };
            model.attach(psm, Slot::Nodes, node)?;
            cx.record_chain(ChainKey::Source(element), start, node);
            previous = Some(node);
        }
        Ok(Vec::new())
    }
}

/// Translates the transition leaving an initial pseudostate. Runs late:
/// the parent state's incoming transitions must all exist, because the
/// initial transition elaborates the same events they do.
#[derive(Default)]
pub struct InitialTransitionRule {
    refinements: Vec<LevelRef>,
}

impl InitialTransitionRule {
    /// The state whose entry this initial transition implements: the
    /// nearest enclosing state, looking through parallel regions.
    fn true_parent_state(chart: &Chart, initial: NodeId) -> Option<NodeId> {
        let owner = chart.parent(initial)?;
        let state = chart.containing_state(owner)?;
        match chart.parent(state) {
            Some(p) if matches!(chart.kind(p), NodeKind::Parallel { .. }) => {
                chart.containing_state(chart.parent(p)?)
            }
            _ => Some(state),
        }
    }

    /// Whether any transition or initial declaration targets this state.
    fn is_a_target(chart: &Chart, state: NodeId) -> bool {
        let id = chart.display_name(state);
        for t in chart.transitions() {
            if let NodeKind::Transition { targets, .. } = chart.kind(t) {
                if targets.iter().any(|tg| tg == id) {
                    return true;
                }
            }
        }
        chart.ids().any(|n| match chart.kind(n) {
            NodeKind::Document { initial, .. } | NodeKind::State { initial, .. } => {
                initial.iter().any(|i| i == id)
            }
            _ => false,
        })
    }
}

impl Rule for InitialTransitionRule {
    fn name(&self) -> &'static str {
        "initial-transition"
    }

    fn fire_late(&self) -> bool {
        true
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Transition { .. })
            && chart
                .parent(element)
                .is_some_and(|p| matches!(chart.kind(p), NodeKind::Initial))
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
        let Some(initial) = chart.parent(element) else {
            return false;
        };
        let Some(namespace) = chart.statemachine_namespace(initial) else {
            return false;
        };
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let NodeKind::Transition { targets, .. } = chart.kind(element) else {
            return false;
        };
        if targets.is_empty() {
            return false;
        }
        let target_name = &targets[0];
        let source_name = notation::initial_node_name(&namespace);

        let depend_on_incomers = Self::true_parent_state(chart, initial)
            .map(|p| Self::is_a_target(chart, p))
            .unwrap_or(false);

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
            let Some(source) = model.find_node(machine, &source_name) else {
                return false;
            };
            let Some(target) = model.find_node(machine, target_name) else {
                return false;
            };
            // The statemachine's owner state must have its incomers before
            // this transition can share their elaborated events.
            if depend_on_incomers {
                if let Some(owner) = model.parent_of(statemachine) {
                    if matches!(
                        model.get(owner).map(|e| &e.kind),
                        Some(ElementKind::StateNode(_))
                    ) && model.incoming_transitions(owner).is_empty()
                    {
                        return false;
                    }
                }
            }
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
        for level_ref in &self.refinements {
            let transition = model.new_transition("", level_ref.source, level_ref.target);
            model.attach(level_ref.statemachine, Slot::Transitions, transition)?;

            // Entering the parent state fires this initial transition too:
            // it elaborates every event the incomers elaborate.
            if let Some(owner) = model.parent_of(level_ref.statemachine) {
                if matches!(
                    model.get(owner).map(|e| &e.kind),
                    Some(ElementKind::StateNode(_))
                ) {
                    let mut inherited = Vec::new();
                    for incoming in model.incoming_transitions(owner) {
                        inherited.extend(model.transition(incoming)?.elaborates.clone());
                    }
                    let tr = model.transition_mut(transition)?;
                    for event in inherited {
                        if !tr.elaborates.contains(&event) {
                            tr.elaborates.push(event);
                        }
                    }
                }
            }

            // Triggers raised on entry.
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
                    notation::RAISED_INTERNAL_GUARD_NAME,
                    false,
                    &notation::specific_raised_internal(&raised),
                    "",
                );
                model.attach(transition, Slot::Guards, guard)?;
            }

            for ann in chart.guards(element) {
                if chart.annotation_level(element, ann) > level_ref.level {
                    continue;
                }
                let predicate = cx.translate_expr(Some(element), ann.predicate().unwrap_or(""));
                let guard = model.new_guard(ann.name(), ann.derived(), &predicate, ann.comment());
                model.attach(transition, Slot::Guards, guard)?;
            }

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
                    &format!("init_act_{index}"),
                    &notation::assign_action(
                        &notation::flatten_location(&location),
                        &translated,
                        nondet,
                    ),
                    "initial transition assign",
                );
                model.attach(transition, Slot::Actions, action)?;
                index += 1;
            }
        }
        Ok(Vec::new())
    }
}
