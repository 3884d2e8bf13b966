//! The refinement stratifier: the synthetic basis pair underlying level 0
//! and helpers for the per-level refinement loop.
//!
//! The basis machine models the run-to-completion engine abstractly:
//! internal/external trigger queues, a completion flag, the dequeued
//! trigger set, and the control events every generated level refines.
//! Level 0 of every document refines this machine; each deeper level
//! refines the one before it.

use strata_formal::{ElementId, FormalError, FormalModel, Slot};

use crate::notation;

fn add_guard(
    model: &mut FormalModel,
    owner: ElementId,
    (name, predicate): (String, String),
) -> Result<(), FormalError> {
    let g = model.new_guard(&name, false, &predicate, "");
    model.attach(owner, Slot::Guards, g)?;
    Ok(())
}

fn add_action(
    model: &mut FormalModel,
    owner: ElementId,
    (name, expression): (String, String),
) -> Result<(), FormalError> {
    let a = model.new_action(&name, &expression, "");
    model.attach(owner, Slot::Actions, a)?;
    Ok(())
}

fn add_invariant(
    model: &mut FormalModel,
    machine: ElementId,
    (name, predicate): (String, String),
    comment: &str,
) -> Result<(), FormalError> {
    let inv = model.new_invariant(&name, false, &predicate, comment);
    model.attach(machine, Slot::Invariants, inv)?;
    Ok(())
}

/// Build the basis context: the trigger carrier set, the future
/// internal/external constants, and the partition axiom.
pub fn build_basis_context(model: &mut FormalModel) -> Result<ElementId, FormalError> {
    let context = model.new_context(notation::BASIS, "(generated statechart basis)");
    let set = model.new_carrier_set(notation::TRIGGER_SET, "all possible triggers");
    model.attach(context, Slot::Sets, set)?;
    let internal = model.new_constant(notation::FUTURE_INTERNAL, "all possible internal triggers");
    model.attach(context, Slot::Constants, internal)?;
    let external = model.new_constant(notation::FUTURE_EXTERNAL, "all possible external triggers");
    model.attach(context, Slot::Constants, external)?;
    let (name, predicate) = notation::trigger_partition_axiom();
    let axiom = model.new_axiom(&name, false, &predicate, "");
    model.attach(context, Slot::Axioms, axiom)?;
    Ok(context)
}

/// Build the basis machine: queue variables, typing invariants,
/// initialisation, and the fixed control events.
pub fn build_basis_machine(model: &mut FormalModel) -> Result<ElementId, FormalError> {
    let machine = model.new_machine(notation::BASIS, "(generated statechart basis)");
    model
        .machine_mut(machine)?
        .sees
        .push(notation::BASIS.to_owned());

    for (name, comment) in [
        (notation::INTERNAL_QUEUE, "internal trigger queue"),
        (notation::EXTERNAL_QUEUE, "external trigger queue"),
        (notation::COMPLETION_FLAG, "run to completion flag"),
        (notation::DEQUEUED_SET, "dequeued trigger for this run"),
    ] {
        let v = model.new_variable(name, comment);
        model.attach(machine, Slot::Variables, v)?;
    }

    add_invariant(model, machine, notation::internal_queue_typing(), "internal trigger queue")?;
    add_invariant(model, machine, notation::external_queue_typing(), "external trigger queue")?;
    add_invariant(model, machine, notation::queue_disjointness(), "queues are disjoint")?;
    add_invariant(model, machine, notation::completion_flag_typing(), "completion flag")?;
    add_invariant(model, machine, notation::dequeued_set_typing(), "dequeued triggers")?;
    add_invariant(model, machine, notation::one_dequeued_trigger(), "at most one dequeued trigger")?;

    // INITIALISATION: both queues and the dequeued set start empty, the
    // run is not complete.
    let init = model.new_event(notation::INITIALISATION);
    model.attach(machine, Slot::Events, init)?;
    add_action(model, init, notation::empty_init_action(notation::INTERNAL_QUEUE))?;
    add_action(model, init, notation::empty_init_action(notation::EXTERNAL_QUEUE))?;
    add_action(model, init, notation::set_not_complete_action())?;
    add_action(model, init, notation::empty_init_action(notation::DEQUEUED_SET))?;

    // Abstract basis for future events that raise an external trigger.
    let raise_external = model.new_event(notation::FUTURE_EXTERNAL_RAISE_EVENT);
    model.get_mut(raise_external).expect("freshly allocated").comment =
        "abstract basis of future events raising an external trigger".to_owned();
    model.attach(machine, Slot::Events, raise_external)?;
    let p = model.new_parameter(notation::RAISED_PARAM, None, "");
    model.attach(raise_external, Slot::Parameters, p)?;
    add_guard(model, raise_external, notation::raised_external_typing_guard())?;
    add_action(model, raise_external, notation::raise_external_action())?;

    // Dequeue an internal trigger.
    let dequeue_internal = model.new_event(notation::DEQUEUE_INTERNAL_EVENT);
    model.attach(machine, Slot::Events, dequeue_internal)?;
    let p = model.new_parameter(notation::DEQUEUED_INTERNAL_PARAM, None, "");
    model.attach(dequeue_internal, Slot::Parameters, p)?;
    add_guard(model, dequeue_internal, notation::dequeued_internal_typing_guard())?;
    add_guard(model, dequeue_internal, notation::has_no_dequeued_guard())?;
    add_guard(model, dequeue_internal, notation::is_complete_guard())?;
    add_action(model, dequeue_internal, notation::store_dequeued_action(notation::DEQUEUED_INTERNAL_PARAM))?;
    add_action(
        model,
        dequeue_internal,
        notation::consume_dequeued_action(notation::INTERNAL_QUEUE, notation::DEQUEUED_INTERNAL_PARAM),
    )?;
    add_action(model, dequeue_internal, notation::set_not_complete_action())?;

    // Dequeue an external trigger; internal triggers drain first.
    let dequeue_external = model.new_event(notation::DEQUEUE_EXTERNAL_EVENT);
    model.attach(machine, Slot::Events, dequeue_external)?;
    let p = model.new_parameter(notation::DEQUEUED_EXTERNAL_PARAM, None, "");
    model.attach(dequeue_external, Slot::Parameters, p)?;
    add_guard(model, dequeue_external, notation::dequeued_external_typing_guard())?;
    add_guard(model, dequeue_external, notation::has_no_dequeued_guard())?;
    add_guard(model, dequeue_external, notation::is_complete_guard())?;
    add_guard(model, dequeue_external, notation::internal_queue_empty_guard())?;
    add_action(model, dequeue_external, notation::store_dequeued_action(notation::DEQUEUED_EXTERNAL_PARAM))?;
    add_action(
        model,
        dequeue_external,
        notation::consume_dequeued_action(notation::EXTERNAL_QUEUE, notation::DEQUEUED_EXTERNAL_PARAM),
    )?;
    add_action(model, dequeue_external, notation::set_not_complete_action())?;

    // Abstract basis for future events representing triggered transitions.
    let triggered = model.new_event(notation::FUTURE_TRIGGERED_EVENT);
    model.get_mut(triggered).expect("freshly allocated").comment =
        "abstract basis of future events representing triggered transitions".to_owned();
    model.attach(machine, Slot::Events, triggered)?;
    let p = model.new_parameter(notation::CONSUMED_PARAM, None, "");
    model.attach(triggered, Slot::Parameters, p)?;
    let p = model.new_parameter(notation::RAISED_PARAM, None, "");
    model.attach(triggered, Slot::Parameters, p)?;
    add_guard(model, triggered, notation::consumed_trigger_typing_guard())?;
    add_guard(model, triggered, notation::is_not_complete_guard())?;
    add_guard(model, triggered, notation::raised_internal_typing_guard())?;
    add_action(model, triggered, notation::clear_dequeued_action())?;
    add_action(model, triggered, notation::raise_internal_action())?;

    // Discard a dequeued trigger no transition consumes.
    let discard = model.new_event(notation::NO_ENABLED_EVENT);
    model.attach(machine, Slot::Events, discard)?;
    add_guard(model, discard, notation::is_not_complete_guard())?;
    add_guard(model, discard, notation::has_dequeued_guard())?;
    add_action(model, discard, notation::clear_dequeued_action())?;

    // Abstract basis for future events representing untriggered
    // transitions.
    let untriggered = model.new_event(notation::FUTURE_UNTRIGGERED_EVENT);
    model.get_mut(untriggered).expect("freshly allocated").comment =
        "abstract basis of future events representing untriggered transitions".to_owned();
    model.attach(machine, Slot::Events, untriggered)?;
    let p = model.new_parameter(notation::RAISED_PARAM, None, "");
    model.attach(untriggered, Slot::Parameters, p)?;
    add_guard(model, untriggered, notation::is_not_complete_guard())?;
    add_guard(model, untriggered, notation::has_no_dequeued_guard())?;
    add_guard(model, untriggered, notation::raised_internal_typing_guard())?;
    add_action(model, untriggered, notation::raise_internal_action())?;

    // Completion: no untriggered transition remains enabled.
    let complete = model.new_event(notation::COMPLETION_EVENT);
    model.attach(machine, Slot::Events, complete)?;
    add_guard(model, complete, notation::is_not_complete_guard())?;
    add_guard(model, complete, notation::has_no_dequeued_guard())?;
    add_action(model, complete, notation::set_complete_action())?;

    Ok(machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notation;

    #[test]
    fn basis_context_structure() {
        let mut model = FormalModel::new();
        let ctx = build_basis_context(&mut model).unwrap();
        let c = model.context(ctx).unwrap();
        assert_eq!(c.sets.len(), 1);
        assert_eq!(c.constants.len(), 2);
        assert_eq!(c.axioms.len(), 1);
        assert_eq!(model.name(ctx), notation::BASIS);
    }

    #[test]
    fn basis_machine_structure() {
        let mut model = FormalModel::new();
        let mch = build_basis_machine(&mut model).unwrap();
        let m = model.machine(mch).unwrap().clone();
        assert_eq!(m.variables.len(), 4);
        assert_eq!(m.invariants.len(), 6);
        // INITIALISATION plus the seven control events.
        assert_eq!(m.events.len(), 8);
        assert_eq!(m.sees, vec![notation::BASIS.to_owned()]);

        let init = model.find_event(mch, notation::INITIALISATION).unwrap();
        assert_eq!(model.event(init).unwrap().actions.len(), 4);

        let triggered = model
            .find_event(mch, notation::FUTURE_TRIGGERED_EVENT)
            .unwrap();
        let ev = model.event(triggered).unwrap();
        assert_eq!(ev.parameters.len(), 2);
        assert_eq!(ev.guards.len(), 3);
        assert_eq!(ev.actions.len(), 2);
    }

    #[test]
    fn basis_refines_into_level_zero() {
        let mut model = FormalModel::new();
        let basis = build_basis_machine(&mut model).unwrap();
        let level0 = model.refine_machine(basis, "doc_0", "").unwrap();
        let m = model.machine(level0).unwrap().clone();
        assert_eq!(m.refines.as_deref(), Some(notation::BASIS));
        assert_eq!(m.events.len(), 8);
        for ev_id in m.events {
            let ev = model.event(ev_id).unwrap();
            assert!(ev.extended);
            assert_eq!(ev.refines.len(), 1);
        }
    }
}
