//! The combination resolver: one target event per set of co-triggered
//! transitions, linked by refines to its nearest ancestor combination in
//! the previous level.

use std::collections::BTreeSet;

use tracing::trace;

use strata_chart::{Chart, NodeId, NodeKind, Trigger};
use strata_formal::{ElementId, FormalModel, Slot};

use crate::descriptor::Descriptor;
use crate::error::TranslateError;
use crate::notation;

/// The event label one transition contributes to a combination name:
/// an explicit `label` attribute, else the first non-empty log label, else
/// the `source_target` fallback. Transitions not rooted at a real state
/// contribute nothing.
pub fn transition_label(chart: &Chart, transition: NodeId) -> Option<String> {
    let source = chart.parent(transition)?;
    if !matches!(chart.kind(source), NodeKind::State { .. }) {
        return None;
    }
    if let Some(label) = chart.attr(transition, "label") {
        return Some(label.to_owned());
    }
    for log in chart.logs(transition) {
        if let NodeKind::Log { label } = chart.kind(log) {
            if !label.is_empty() {
                return Some(label.clone());
            }
        }
    }
    let mut label = chart.display_name(source).to_owned();
    if let NodeKind::Transition { targets, .. } = chart.kind(transition) {
        for target in targets {
            label.push('_');
            label.push_str(target);
        }
    }
    Some(label)
}

/// Canonical name of the event merging a combination: the trigger name
/// (empty for the untriggered sentinel) joined with `__` to each member's
/// label, members in id order.
pub fn combination_event_name(
    chart: &Chart,
    trigger_name: &str,
    combination: &BTreeSet<NodeId>,
) -> String {
    let mut name = if trigger_name.is_empty() || trigger_name == strata_chart::UNTRIGGERED {
        String::new()
    } else {
        trigger_name.to_owned()
    };
    for &member in combination {
        if let Some(label) = transition_label(chart, member) {
            if name.is_empty() {
                name = label;
            } else {
                name.push_str("__");
                name.push_str(&label);
            }
        }
    }
    name
}

/// Pick the greatest candidate subset of `target`: largest first, ties
/// broken by smallest name, then by set order. Deterministic for any
/// candidate ordering.
pub(crate) fn select_greatest<T: Ord + Clone>(
    candidates: &[(BTreeSet<T>, String)],
    target: &BTreeSet<T>,
) -> Option<(BTreeSet<T>, String)> {
    let mut best: Option<&(BTreeSet<T>, String)> = None;
    for candidate in candidates {
        if !candidate.0.is_subset(target) {
            continue;
        }
        best = match best {
            None => Some(candidate),
            Some(current) => {
                let better = candidate.0.len() > current.0.len()
                    || (candidate.0.len() == current.0.len()
                        && (candidate.1 < current.1
                            || (candidate.1 == current.1 && candidate.0 < current.0)));
                if better {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        };
    }
    best.cloned()
}

/// The name of the event a combination refines at the previous level: the
/// greatest recorded sub-combination's event, else the level-appropriate
/// abstract placeholder.
pub fn refines_target_name(
    chart: &Chart,
    trigger: &Trigger,
    combination: &BTreeSet<NodeId>,
    level: u32,
) -> String {
    if level > 0 {
        let candidates: Vec<(BTreeSet<NodeId>, String)> = trigger
            .combinations(chart, level - 1)
            .into_iter()
            .map(|c| {
                let name = combination_event_name(chart, trigger.name(), &c);
                (c, name)
            })
            .collect();
        if let Some((_, name)) = select_greatest(&candidates, combination) {
            return name;
        }
    }
    if trigger.is_untriggered() {
        notation::FUTURE_UNTRIGGERED_EVENT.to_owned()
    } else {
        notation::FUTURE_TRIGGERED_EVENT.to_owned()
    }
}

/// Find or create the merged event for a combination in the level's
/// machine, wire up its refines link, and (for real triggers already
/// introduced) queue the trigger guard behind a dedup-on-apply descriptor.
pub fn get_or_create_combination_event(
    chart: &Chart,
    model: &mut FormalModel,
    descriptors: &mut Vec<Descriptor>,
    machine: ElementId,
    level: u32,
    trigger: &Trigger,
    combination: &BTreeSet<NodeId>,
) -> Result<ElementId, TranslateError> {
    let name = combination_event_name(chart, trigger.name(), combination);
    trace!(level, trigger = trigger.name(), event = %name, members = combination.len(),
        "resolving combination event");

    let event = match model.find_event(machine, &name) {
        Some(ev) => ev,
        None => {
            let ev = model.new_event(&name);
            let comment = if trigger.is_untriggered() {
                "untriggered transitions"
            } else if trigger.is_internal() {
                "internally triggered transitions"
            } else {
                "externally triggered transitions"
            };
            model.get_mut(ev).expect("freshly allocated").comment = comment.to_owned();
            model.attach(machine, Slot::Events, ev)?;
            ev
        }
    };

    let refined = refines_target_name(chart, trigger, combination, level);
    {
        let ev = model.event_mut(event)?;
        if !ev.refines.contains(&refined) {
            ev.refines.push(refined);
        }
        ev.extended = !ev.refines.is_empty();
    }

    if !trigger.is_untriggered() && level >= trigger.level(chart) {
        let guard = model.new_guard(
            notation::TRIGGER_GUARD_NAME,
            false,
            &notation::trigger_guard_predicate(trigger.name()),
            "triggered transition",
        );
        descriptors.push(Descriptor::child(event, Slot::Guards, guard, 0));
    }

    Ok(event)
}
