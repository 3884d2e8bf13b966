//! Data item rules: variables, constants, and carrier sets, selected by
//! the item's `dataKind` annotation.

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::{ElementId, FormalModel, Slot};

use crate::context::TranslationContext;
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::notation;
use crate::rule::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataKind {
    Variable,
    Constant,
    CarrierSet,
    Unknown,
}

fn data_kind(chart: &Chart, element: NodeId) -> DataKind {
    match chart.attr(element, "dataKind") {
        None => DataKind::Variable,
        Some(k) => {
            let k = k.trim();
            if k.eq_ignore_ascii_case("variable") {
                DataKind::Variable
            } else if k.eq_ignore_ascii_case("constant") {
                DataKind::Constant
            } else if k.eq_ignore_ascii_case("carrierset") {
                DataKind::CarrierSet
            } else {
                DataKind::Unknown
            }
        }
    }
}

fn data_parts(chart: &Chart, element: NodeId) -> Option<(String, Option<String>)> {
    match chart.kind(element) {
        NodeKind::Data { id, expr } => Some((id.clone(), expr.clone())),
        _ => None,
    }
}

/// The state node this data item is scoped to, if it is owned by a state.
fn owning_state_name(chart: &Chart, element: NodeId) -> Option<String> {
    chart
        .parent(element)
        .and_then(|p| chart.containing_state(p))
        .map(|s| chart.display_name(s).to_owned())
}

/// Variables: one re-declaration per level, the typing invariant and the
/// initialisation once at the start level.
#[derive(Default)]
pub struct DataVariableRule {
    refinements: Vec<(ElementId, ElementId)>,
}

impl Rule for DataVariableRule {
    fn name(&self) -> &'static str {
        "data-variable"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Data { .. })
            && data_kind(chart, element) == DataKind::Variable
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
            let Some(init) = model.find_event(machine, notation::INITIALISATION) else {
                return false;
            };
            if level == start {
                if let Some(state) = owning_state_name(chart, element) {
                    if model.find_node(machine, &state).is_none() {
                        return false;
                    }
                }
            }
            self.refinements.push((machine, init));
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
        let Some((id, expr)) = data_parts(chart, element) else {
            return Ok(Vec::new());
        };
        let vname = notation::flatten_location(&id);
        let mut done = false;
        for &(machine, init) in &self.refinements {
            let variable = model.new_variable(&vname, "");
            model.attach(machine, Slot::Variables, variable)?;
            if done {
                continue;
            }
            match notation::data_type(chart.attr(element, "type"), expr.as_deref()) {
                Some(type_text) => {
                    let inv = model.new_invariant(
                        &format!("{vname}_type"),
                        false,
                        &notation::type_predicate(&vname, &type_text),
                        "",
                    );
                    model.attach(machine, Slot::Invariants, inv)?;
                }
                None => cx.diagnostic(
                    Some(element),
                    format!("data item `{id}` has no derivable type; typing invariant skipped"),
                ),
            }
            if let Some(expr) = expr.as_deref() {
                let (nondet, raw) = match expr.strip_prefix("::") {
                    Some(rest) => (true, rest),
                    None => (false, expr),
                };
                let translated = cx.translate_expr(Some(element), raw);
                let action = model.new_action(
                    &format!("{vname}_init"),
                    &notation::assign_action(&vname, &translated, nondet),
                    "",
                );
                model.attach(init, Slot::Actions, action)?;
            }
            done = true;
        }
        Ok(Vec::new())
    }
}

/// Constants: declared once in the start-level context with a typing axiom
/// and, when an initial expression is given, a value axiom (the typing
/// axiom then becomes a theorem).
#[derive(Default)]
pub struct DataConstantRule {
    context: Option<ElementId>,
}

impl Rule for DataConstantRule {
    fn name(&self) -> &'static str {
        "data-constant"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Data { .. })
            && data_kind(chart, element) == DataKind::Constant
    }

    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        _cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool {
        self.context = None;
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let start = chart.start_level(element);
        let Some(context) =
            generated.find_context(model, &notation::context_name(doc_name, start))
        else {
            return false;
        };
        if let Some(state) = owning_state_name(chart, element) {
            let machine = generated.find_machine(model, &notation::machine_name(doc_name, start));
            match machine {
                Some(m) if model.find_node(m, &state).is_some() => {}
                _ => return false,
            }
        }
        self.context = Some(context);
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
        let Some(context) = self.context else {
            return Ok(Vec::new());
        };
        let Some((id, expr)) = data_parts(chart, element) else {
            return Ok(Vec::new());
        };
        let cname = notation::flatten_location(&id);
        let constant = model.new_constant(&cname, "generated from data item");
        model.attach(context, Slot::Constants, constant)?;

        let has_value = expr.as_deref().is_some_and(|e| !e.is_empty());
        if let Some(expr) = expr.as_deref() {
            if !expr.is_empty() {
                let (nondet, raw) = match expr.strip_prefix("::") {
                    Some(rest) => (true, rest),
                    None => (false, expr),
                };
                let translated = cx.translate_expr(Some(element), raw);
                let value = model.new_axiom(
                    &format!("{cname}_value"),
                    false,
                    &notation::value_predicate(&cname, &translated, nondet),
                    "generated from data item",
                );
                model.attach(context, Slot::Axioms, value)?;
            }
        }
        match notation::data_type(chart.attr(element, "type"), expr.as_deref()) {
            Some(type_text) => {
                let typing = model.new_axiom(
                    &format!("{cname}_type"),
                    has_value,
                    &notation::type_predicate(&cname, &type_text),
                    "generated from data item",
                );
                model.attach(context, Slot::Axioms, typing)?;
            }
            None => cx.diagnostic(
                Some(element),
                format!("data item `{id}` has no derivable type; typing axiom skipped"),
            ),
        }
        Ok(Vec::new())
    }
}

/// Carrier sets: declared once in the start-level context.
#[derive(Default)]
pub struct DataCarrierSetRule {
    context: Option<ElementId>,
}

impl Rule for DataCarrierSetRule {
    fn name(&self) -> &'static str {
        "data-carrier-set"
    }

    fn enabled(&self, chart: &Chart, element: NodeId) -> bool {
        matches!(chart.kind(element), NodeKind::Data { .. })
            && data_kind(chart, element) == DataKind::CarrierSet
    }

    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        _cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool {
        self.context = None;
        let Some(document) = chart.containing_document(element) else {
            return false;
        };
        let doc_name = chart.display_name(document);
        let start = chart.start_level(element);
        let Some(context) =
            generated.find_context(model, &notation::context_name(doc_name, start))
        else {
            return false;
        };
        if let Some(state) = owning_state_name(chart, element) {
            let machine = generated.find_machine(model, &notation::machine_name(doc_name, start));
            match machine {
                Some(m) if model.find_node(m, &state).is_some() => {}
                _ => return false,
            }
        }
        self.context = Some(context);
        true
    }

    fn fire(
        &mut self,
        chart: &Chart,
        element: NodeId,
        _cx: &mut TranslationContext,
        model: &mut FormalModel,
        _generated: &Generated,
    ) -> Result<Vec<Descriptor>, TranslateError> {
        let Some(context) = self.context else {
            return Ok(Vec::new());
        };
        let Some((id, _)) = data_parts(chart, element) else {
            return Ok(Vec::new());
        };
        let set = model.new_carrier_set(&notation::flatten_location(&id), "generated from data item");
        model.attach(context, Slot::Sets, set)?;
        Ok(Vec::new())
    }
}
