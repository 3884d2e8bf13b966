//! Pending translation descriptors.
//!
//! A descriptor is a not-yet-applied instruction to attach an element into
//! the target model. Rules return descriptors from `fire`; the engine
//! accumulates them so later `dependencies_ok` calls can discover
//! machines and contexts that are built but not yet physically attached.
//! Descriptors are applied once, after both passes reach fixpoint, in
//! priority order — which is also where a guard that extension already
//! provides gets dropped instead of duplicated.

use strata_formal::{ElementId, FormalError, FormalModel, Slot};

/// Where a pending element lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// A machine artifact of the model root.
    Machine(ElementId),
    /// A context artifact of the model root.
    Context(ElementId),
    /// A child in a slot of an existing element.
    Child {
        container: ElementId,
        slot: Slot,
        child: ElementId,
    },
}

/// A pending attachment with an application priority (higher first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub attach: Attach,
    pub priority: i32,
}

impl Descriptor {
    pub fn machine(id: ElementId) -> Self {
        Self {
            attach: Attach::Machine(id),
            priority: 1,
        }
    }

    pub fn context(id: ElementId) -> Self {
        Self {
            attach: Attach::Context(id),
            priority: 1,
        }
    }

    pub fn child(container: ElementId, slot: Slot, child: ElementId, priority: i32) -> Self {
        Self {
            attach: Attach::Child {
                container,
                slot,
                child,
            },
            priority,
        }
    }
}

/// The descriptors accumulated so far in a run, searchable before they are
/// applied.
#[derive(Debug, Default)]
pub struct Generated {
    descriptors: Vec<Descriptor>,
}

impl Generated {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, descriptor: Descriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn extend(&mut self, descriptors: Vec<Descriptor>) {
        self.descriptors.extend(descriptors);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Find a machine by name among attached components and pending
    /// descriptors.
    pub fn find_machine(&self, model: &FormalModel, name: &str) -> Option<ElementId> {
        model.machine_by_name(name).or_else(|| {
            self.descriptors.iter().find_map(|d| match d.attach {
                Attach::Machine(id) if model.name(id) == name => Some(id),
                _ => None,
            })
        })
    }

    /// Find a context by name among attached components and pending
    /// descriptors.
    pub fn find_context(&self, model: &FormalModel, name: &str) -> Option<ElementId> {
        model.context_by_name(name).or_else(|| {
            self.descriptors.iter().find_map(|d| match d.attach {
                Attach::Context(id) if model.name(id) == name => Some(id),
                _ => None,
            })
        })
    }

    /// Apply every pending descriptor, highest priority first (stable
    /// within one priority). A guard that the target event already carries
    /// — directly or through its extension chain — is skipped.
    pub fn apply(self, model: &mut FormalModel) -> Result<(), FormalError> {
        let mut descriptors = self.descriptors;
        descriptors.sort_by_key(|d| std::cmp::Reverse(d.priority));
        for d in descriptors {
            match d.attach {
                Attach::Machine(id) => model.attach_machine(id)?,
                Attach::Context(id) => model.attach_context(id)?,
                Attach::Child {
                    container,
                    slot,
                    child,
                } => {
                    if slot == Slot::Guards {
                        let name = model.name(child).to_owned();
                        if model.event(container).is_ok()
                            && model.event_has_guard_inherited(container, &name)
                        {
                            continue;
                        }
                    }
                    model.attach(container, slot, child)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_machine_is_discoverable() {
        let mut model = FormalModel::new();
        let m = model.new_machine("doc_0", "");
        let mut generated = Generated::new();
        assert!(generated.find_machine(&model, "doc_0").is_none());
        generated.push(Descriptor::machine(m));
        assert_eq!(generated.find_machine(&model, "doc_0"), Some(m));

        generated.apply(&mut model).unwrap();
        assert_eq!(model.machine_by_name("doc_0"), Some(m));
    }

    #[test]
    fn apply_orders_by_priority() {
        let mut model = FormalModel::new();
        let m = model.new_machine("doc_0", "");
        let ev = model.new_event("ev");
        model.attach(m, Slot::Events, ev).unwrap();
        let g = model.new_guard("g", false, "x > 0", "");

        let mut generated = Generated::new();
        // Guard descriptor first but with lower priority; the machine must
        // attach first regardless.
        generated.push(Descriptor::child(ev, Slot::Guards, g, 0));
        generated.push(Descriptor::machine(m));
        generated.apply(&mut model).unwrap();

        assert_eq!(model.machine_by_name("doc_0"), Some(m));
        assert_eq!(model.event(ev).unwrap().guards, vec![g]);
    }

    #[test]
    fn inherited_guard_descriptor_is_dropped() {
        let mut model = FormalModel::new();
        let abs = model.new_machine("m0", "");
        model.attach_machine(abs).unwrap();
        let abs_ev = model.new_event("ev");
        model.attach(abs, Slot::Events, abs_ev).unwrap();
        let abs_g = model.new_guard("trig", false, "t = go", "");
        model.attach(abs_ev, Slot::Guards, abs_g).unwrap();

        let conc = model.new_machine("m1", "");
        model.machine_mut(conc).unwrap().refines = Some("m0".into());
        model.attach_machine(conc).unwrap();
        let conc_ev = model.new_event("ev");
        {
            let e = model.event_mut(conc_ev).unwrap();
            e.refines.push("ev".into());
            e.extended = true;
        }
        model.attach(conc, Slot::Events, conc_ev).unwrap();

        let dup = model.new_guard("trig", false, "t = go", "");
        let mut generated = Generated::new();
        generated.push(Descriptor::child(conc_ev, Slot::Guards, dup, 0));
        generated.apply(&mut model).unwrap();

        // Already guaranteed by the inherited guard; not re-attached.
        assert!(model.event(conc_ev).unwrap().guards.is_empty());
    }
}
