//! End-to-end translation tests over whole documents.

use strata_chart::{Chart, ChartBuilder};
use strata_formal::{ElementId, FormalModel, NodeRole};
use strata_translate::{
    notation, translate, ChainKey, ExpressionError, ExpressionTranslator, TranslateError,
    TranslationConfig, TranslationOutput,
};

fn run(chart: &Chart) -> TranslationOutput {
    translate(chart, TranslationConfig::default()).expect("translation should succeed")
}

fn machine(model: &FormalModel, name: &str) -> ElementId {
    model
        .machine_by_name(name)
        .unwrap_or_else(|| panic!("machine `{name}` missing"))
}

fn event(model: &FormalModel, machine_name: &str, event_name: &str) -> ElementId {
    let m = machine(model, machine_name);
    model
        .find_event(m, event_name)
        .unwrap_or_else(|| panic!("event `{event_name}` missing from `{machine_name}`"))
}

/// Idle -(start)-> Busy (raising `done`), Busy -> Idle untriggered.
fn simple_chart() -> Chart {
    let mut b = ChartBuilder::new("ctrl");
    let idle = b.state(b.root(), "Idle");
    let busy = b.state(b.root(), "Busy");
    let t1 = b.transition(idle, Some("start"), &["Busy"]);
    b.raise(t1, "done");
    b.transition(busy, None, &["Idle"]);
    b.build()
}

#[test]
fn one_machine_context_pair_per_level_plus_basis() {
    let mut b = ChartBuilder::new("ctrl");
    let s = b.state(b.root(), "S0");
    b.set_level(s, 2);
    let output = run(&b.build());
    let model = &output.model;

    assert_eq!(output.report.depth, 2);
    // basis plus levels 0..=2.
    assert_eq!(model.machines().len(), 4);
    assert_eq!(model.contexts().len(), 4);

    let names: Vec<&str> = model.machines().iter().map(|&m| model.name(m)).collect();
    assert_eq!(names, vec!["basis", "ctrl_0", "ctrl_1", "ctrl_2"]);

    for level in 0..=2u32 {
        let m = machine(model, &format!("ctrl_{level}"));
        let payload = model.machine(m).unwrap();
        let expected_refines = if level == 0 {
            "basis".to_owned()
        } else {
            format!("ctrl_{}", level - 1)
        };
        assert_eq!(payload.refines.as_deref(), Some(expected_refines.as_str()));
        assert_eq!(payload.sees, vec![format!("ctrl_{level}_ctx")]);

        let c = model
            .context_by_name(&format!("ctrl_{level}_ctx"))
            .unwrap();
        let expected_extends = if level == 0 {
            "basis".to_owned()
        } else {
            format!("ctrl_{}_ctx", level - 1)
        };
        assert_eq!(
            model.context(c).unwrap().extends.as_deref(),
            Some(expected_extends.as_str())
        );
    }
}

#[test]
fn simple_document_translates() {
    let output = run(&simple_chart());
    let model = &output.model;
    let m0 = machine(model, "ctrl_0");

    // Statechart structure lands in the top-level statemachine.
    let sm = model.find_statemachine(m0, "ctrl_sm").unwrap();
    assert!(model.find_node(m0, "Idle").is_some());
    assert!(model.find_node(m0, "Busy").is_some());
    assert_eq!(model.statemachine(sm).unwrap().transitions.len(), 2);

    // The triggered transition merges into a combination event refining
    // the future-triggered placeholder and guarded by its trigger.
    let start_ev = event(model, "ctrl_0", "start__Idle_Busy");
    let ev = model.event(start_ev).unwrap();
    assert_eq!(ev.refines, vec![notation::FUTURE_TRIGGERED_EVENT.to_owned()]);
    assert!(ev.extended);
    assert_eq!(ev.guards.len(), 1);
    let guard = model.get(ev.guards[0]).unwrap();
    assert_eq!(guard.name, notation::TRIGGER_GUARD_NAME);

    // The transition elaborates it and carries the raised-trigger guard.
    let transitions = model.statemachine(sm).unwrap().transitions.clone();
    let triggered = transitions
        .iter()
        .copied()
        .find(|&t| model.name(model.transition(t).unwrap().source) == "Idle")
        .unwrap();
    let tr = model.transition(triggered).unwrap();
    assert_eq!(tr.elaborates, vec![start_ev]);
    assert_eq!(tr.guards.len(), 1);
    let raised = model.get(tr.guards[0]).unwrap();
    match &raised.kind {
        strata_formal::ElementKind::Guard(g) => {
            assert_eq!(g.predicate, "{done} ⊆ rtc_raisedTriggers");
        }
        other => panic!("expected guard, got {}", other.tag()),
    }

    // `start` is external (never raised inside): it gets a raising event.
    let ext = event(model, "ctrl_0", "ExternalTriggerEvent_start");
    let ev = model.event(ext).unwrap();
    assert_eq!(
        ev.refines,
        vec![notation::FUTURE_EXTERNAL_RAISE_EVENT.to_owned()]
    );

    // `done` is internal: declared as a constant, partitioned off the
    // future-internal pool.
    let ctx = model.context_by_name("ctrl_0_ctx").unwrap();
    let context = model.context(ctx).unwrap();
    let constant_names: Vec<&str> = context
        .constants
        .iter()
        .map(|&c| model.name(c))
        .collect();
    assert!(constant_names.contains(&"done"));
    assert!(constant_names.contains(&"start"));
    let axiom_predicates: Vec<String> = context
        .axioms
        .iter()
        .map(|&a| match &model.get(a).unwrap().kind {
            strata_formal::ElementKind::Axiom(p) => p.predicate.clone(),
            _ => String::new(),
        })
        .collect();
    assert!(axiom_predicates
        .contains(&"partition(RTC_FutureInternalTrigger,RTC_FutureInternalTrigger0,{done})".to_owned()));
    assert!(axiom_predicates
        .contains(&"partition(RTC_FutureExternalTrigger,RTC_FutureExternalTrigger0,{start})".to_owned()));
}

#[test]
fn untriggered_depth_zero_refines_placeholder_without_guards() {
    let mut b = ChartBuilder::new("doc");
    let s0 = b.state(b.root(), "S0");
    b.state(b.root(), "S1");
    b.transition(s0, None, &["S1"]);
    let output = run(&b.build());
    let model = &output.model;

    assert_eq!(model.machines().len(), 2);
    let ev = event(model, "doc_0", "S0_S1");
    let payload = model.event(ev).unwrap();
    assert_eq!(
        payload.refines,
        vec![notation::FUTURE_UNTRIGGERED_EVENT.to_owned()]
    );
    assert!(payload.extended);
    assert!(payload.guards.is_empty());
}

#[test]
fn level_annotated_guard_appears_only_from_its_level() {
    let mut b = ChartBuilder::new("ctrl");
    let s0 = b.state(b.root(), "S0");
    b.state(b.root(), "S1");
    let t = b.transition(s0, Some("go"), &["S1"]);
    b.annotate(
        t,
        strata_chart::Annotation::new(strata_chart::AnnotationKind::Guard)
            .with_attr("name", "g_x")
            .with_attr("predicate", "x>0")
            .with_attr("refinement", "2"),
    );
    let output = run(&b.build());
    let model = &output.model;
    assert_eq!(output.report.depth, 2);

    // The merged event exists at every level; each refines the previous
    // level's event of the same combination, the lowest the placeholder.
    let ev0 = event(model, "ctrl_0", "go__S0_S1");
    assert_eq!(
        model.event(ev0).unwrap().refines,
        vec![notation::FUTURE_TRIGGERED_EVENT.to_owned()]
    );
    for level in 1..=2 {
        let ev = event(model, &format!("ctrl_{level}"), "go__S0_S1");
        assert_eq!(
            model.event(ev).unwrap().refines,
            vec!["go__S0_S1".to_owned()]
        );
        // The trigger guard is inherited from level 0, not re-attached.
        assert!(model.event(ev).unwrap().guards.is_empty());
    }
    assert_eq!(model.event(ev0).unwrap().guards.len(), 1);

    // The explicit guard reaches only the level-2 transition.
    for level in 0..=2u32 {
        let m = machine(model, &format!("ctrl_{level}"));
        let sm = model.find_statemachine(m, "ctrl_sm").unwrap();
        let transitions = model.statemachine(sm).unwrap().transitions.clone();
        assert_eq!(transitions.len(), 1);
        let guards = model.transition(transitions[0]).unwrap().guards.clone();
        if level < 2 {
            assert!(guards.is_empty(), "no guard expected at level {level}");
        } else {
            assert_eq!(guards.len(), 1);
            assert_eq!(model.name(guards[0]), "g_x");
        }
    }
}

#[test]
fn refinement_chains_cover_start_to_depth() {
    let mut b = ChartBuilder::new("ctrl");
    let s0 = b.state(b.root(), "S0");
    b.state(b.root(), "S1");
    let t = b.transition(s0, Some("go"), &["S1"]);
    b.annotate(
        t,
        strata_chart::Annotation::new(strata_chart::AnnotationKind::Guard)
            .with_attr("name", "g")
            .with_attr("predicate", "x>0")
            .with_attr("refinement", "2"),
    );
    let chart = b.build();
    let output = run(&chart);

    let machine_chain = output.chains.get(&ChainKey::Machine).unwrap();
    assert_eq!(machine_chain.elements.len(), 3);

    let state_chain = output.chains.get(&ChainKey::Source(s0)).unwrap();
    assert_eq!(state_chain.start_level, 0);
    // depth - start + 1 elements.
    assert_eq!(state_chain.elements.len(), 3);
    // Each level's element refines the previous one.
    for pair in state_chain.elements.windows(2) {
        assert_eq!(output.model.refines_of(pair[1]), Some(pair[0]));
    }
}

#[test]
fn parallel_regions_merge_into_one_event() {
    let mut b = ChartBuilder::new("doc");
    let top = b.state(b.root(), "Top");
    let par = b.parallel(top, "P");
    let r1 = b.state(par, "R1");
    let r2 = b.state(par, "R2");
    let a = b.state(r1, "A");
    let c = b.state(r2, "B");
    let ta = b.transition(a, Some("t"), &["A"]);
    b.set_attr(ta, "label", "la");
    let tb = b.transition(c, Some("t"), &["B"]);
    b.set_attr(tb, "label", "lb");
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "doc_0");

    // Each region becomes a statemachine nested in the enclosing state.
    let top_node = model.find_node(m0, "Top").unwrap();
    let nested = &model.state_node(top_node).unwrap().statemachines;
    let names: Vec<&str> = nested.iter().map(|&sm| model.name(sm)).collect();
    assert_eq!(names, vec!["R1_sm", "R2_sm"]);

    // One merged event named from both contributions; both transitions
    // elaborate it.
    let merged = event(model, "doc_0", "t__la__lb");
    for region_sm in ["R1_sm", "R2_sm"] {
        let sm = model.find_statemachine(m0, region_sm).unwrap();
        let transitions = model.statemachine(sm).unwrap().transitions.clone();
        assert_eq!(transitions.len(), 1);
        assert_eq!(
            model.transition(transitions[0]).unwrap().elaborates,
            vec![merged]
        );
    }
}

#[test]
fn misspelled_target_stalls_the_run() {
    let mut b = ChartBuilder::new("doc");
    let s0 = b.state(b.root(), "S0");
    b.transition(s0, Some("go"), &["S9"]);
    let err = translate(&b.build(), TranslationConfig::default()).unwrap_err();
    match err {
        TranslateError::Stalled { summary, stuck } => {
            assert_eq!(stuck.len(), 1);
            assert_eq!(stuck[0].rule, "transition");
            assert!(summary.contains("S9"));
        }
        other => panic!("expected stall, got {other}"),
    }
}

#[test]
fn rerunning_produces_identical_output() {
    let chart = simple_chart();
    let first: serde_json::Value = run(&chart).model.to_json();
    let second: serde_json::Value = run(&chart).model.to_json();
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn data_items_translate_by_kind() {
    let mut b = ChartBuilder::new("doc");
    b.state(b.root(), "S");
    b.data(b.root(), "x", Some("0"));
    let n = b.data(b.root(), "N", Some("5"));
    b.set_attr(n, "dataKind", "Constant");
    let colours = b.data(b.root(), "colours", None);
    b.set_attr(colours, "dataKind", "CarrierSet");
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "doc_0");

    // Variable: re-declared, typed, initialised.
    let vars: Vec<&str> = model
        .machine(m0)
        .unwrap()
        .variables
        .iter()
        .map(|&v| model.name(v))
        .collect();
    assert!(vars.contains(&"x"));
    let invariants = model.machine(m0).unwrap().invariants.clone();
    assert!(invariants.iter().any(|&i| model.name(i) == "x_type"));
    let init = model.find_event(m0, notation::INITIALISATION).unwrap();
    let actions = model.event(init).unwrap().actions.clone();
    let init_action = actions
        .iter()
        .copied()
        .find(|&a| model.name(a) == "x_init")
        .unwrap();
    match &model.get(init_action).unwrap().kind {
        strata_formal::ElementKind::Action(a) => assert_eq!(a.expression, "x ≔ 0"),
        other => panic!("expected action, got {}", other.tag()),
    }

    // Constant: typing axiom becomes a theorem next to the value axiom.
    let ctx = model.context_by_name("doc_0_ctx").unwrap();
    let context = model.context(ctx).unwrap().clone();
    assert!(context.constants.iter().any(|&c| model.name(c) == "N"));
    let mut saw_value = false;
    let mut saw_type = false;
    for &axiom in &context.axioms {
        let el = model.get(axiom).unwrap();
        if let strata_formal::ElementKind::Axiom(p) = &el.kind {
            if el.name == "N_value" {
                assert_eq!(p.predicate, "N = 5");
                saw_value = true;
            }
            if el.name == "N_type" {
                assert_eq!(p.predicate, "N ∈ ℤ");
                assert!(p.theorem);
                saw_type = true;
            }
        }
    }
    assert!(saw_value && saw_type);

    // Carrier set.
    assert!(context.sets.iter().any(|&s| model.name(s) == "colours"));
}

#[test]
fn entry_assigns_become_entry_actions() {
    let mut b = ChartBuilder::new("doc");
    let s = b.state(b.root(), "Idle");
    let entry = b.on_entry(s);
    b.assign(entry, "count", "0");
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "doc_0");

    let node = model.find_node(m0, "Idle").unwrap();
    let entry_actions = model.state_node(node).unwrap().entry_actions.clone();
    assert_eq!(entry_actions.len(), 1);
    assert_eq!(model.name(entry_actions[0]), "Idle_onentry_0");
    match &model.get(entry_actions[0]).unwrap().kind {
        strata_formal::ElementKind::Action(a) => assert_eq!(a.expression, "count ≔ 0"),
        other => panic!("expected action, got {}", other.tag()),
    }
}

#[test]
fn initial_transition_elaborates_incoming_events() {
    let mut b = ChartBuilder::new("ctrl");
    let idle = b.state(b.root(), "Idle");
    let outer = b.state(b.root(), "Outer");
    b.state(outer, "In1");
    b.initial_transition(outer, "In1");
    b.transition(idle, Some("enter"), &["Outer"]);
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "ctrl_0");

    let outer_sm = model.find_statemachine(m0, "Outer_sm").unwrap();
    let initial_node = model
        .find_node(m0, "Outer_sm_initialState")
        .unwrap();
    assert_eq!(
        model.state_node(initial_node).unwrap().role,
        NodeRole::Initial
    );

    let enter_ev = event(model, "ctrl_0", "enter__Idle_Outer");
    let transitions = model.statemachine(outer_sm).unwrap().transitions.clone();
    let initial_tr = transitions
        .iter()
        .copied()
        .find(|&t| model.transition(t).unwrap().source == initial_node)
        .unwrap();
    assert_eq!(
        model.transition(initial_tr).unwrap().elaborates,
        vec![enter_ev]
    );
}

#[test]
fn final_state_generates_node_and_final_transition() {
    let mut b = ChartBuilder::new("ctrl");
    b.state(b.root(), "Idle");
    let outer = b.state(b.root(), "Outer");
    b.final_state(outer, "F");
    b.transition(outer, None, &["Idle"]);
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "ctrl_0");

    let outer_sm = model.find_statemachine(m0, "Outer_sm").unwrap();
    let pre_final = model.find_node(m0, "F").unwrap();
    assert_eq!(model.state_node(pre_final).unwrap().role, NodeRole::State);
    let final_node = model.find_node(m0, "Outer_sm_final").unwrap();
    assert_eq!(model.state_node(final_node).unwrap().role, NodeRole::Final);

    let transitions = model.statemachine(outer_sm).unwrap().transitions.clone();
    assert_eq!(transitions.len(), 1);
    let tr = model.transition(transitions[0]).unwrap();
    assert_eq!(tr.source, pre_final);
    assert_eq!(tr.target, final_node);
    // Leaving Outer leaves the nested region too.
    let leave_ev = event(model, "ctrl_0", "Outer_Idle");
    assert_eq!(tr.elaborates, vec![leave_ev]);
}

#[test]
fn transition_condition_becomes_guard() {
    let mut b = ChartBuilder::new("doc");
    let s0 = b.state(b.root(), "S0");
    b.state(b.root(), "S1");
    let t = b.transition(s0, Some("go"), &["S1"]);
    b.cond(t, "[x == true]");
    let output = run(&b.build());
    let model = &output.model;
    let m0 = machine(model, "doc_0");

    let sm = model.find_statemachine(m0, "doc_sm").unwrap();
    let transitions = model.statemachine(sm).unwrap().transitions.clone();
    let guards = model.transition(transitions[0]).unwrap().guards.clone();
    assert_eq!(guards.len(), 1);
    assert_eq!(model.name(guards[0]), "S0_S1_cond");
    match &model.get(guards[0]).unwrap().kind {
        strata_formal::ElementKind::Guard(g) => assert_eq!(g.predicate, "x = TRUE"),
        other => panic!("expected guard, got {}", other.tag()),
    }
}

struct RejectingTranslator;
impl ExpressionTranslator for RejectingTranslator {
    fn translate(&self, text: &str) -> Result<String, ExpressionError> {
        Err(ExpressionError::new(text, "unsupported syntax"))
    }
}

#[test]
fn expression_failure_degrades_to_sentinel() {
    let mut b = ChartBuilder::new("doc");
    let s0 = b.state(b.root(), "S0");
    b.state(b.root(), "S1");
    let t = b.transition(s0, Some("go"), &["S1"]);
    b.guard(t, "g", "x>0");
    let config = TranslationConfig {
        translator: Box::new(RejectingTranslator),
        ..Default::default()
    };
    let output = translate(&b.build(), config).unwrap();
    assert!(!output.report.diagnostics.is_empty());
    assert!(output.report.diagnostics[0].message.contains("x>0"));

    let model = &output.model;
    let m0 = machine(model, "doc_0");
    let sm = model.find_statemachine(m0, "doc_sm").unwrap();
    let transitions = model.statemachine(sm).unwrap().transitions.clone();
    let guards = model.transition(transitions[0]).unwrap().guards.clone();
    match &model.get(guards[0]).unwrap().kind {
        strata_formal::ElementKind::Guard(g) => {
            assert_eq!(g.predicate, notation::EXPR_SENTINEL);
        }
        other => panic!("expected guard, got {}", other.tag()),
    }
}

#[test]
fn report_counts_scans_and_firings() {
    let output = run(&simple_chart());
    // One obligation per enabled (element, rule) pair: the document, two
    // states, two transitions.
    assert_eq!(output.report.fired, 5);
    // Everything fires in the first scan; one empty scan ends each pass.
    assert_eq!(output.report.scans, 3);
    assert!(output.report.diagnostics.is_empty());
}
