//! The rule contract and the fixed rule registry.

use strata_chart::{Chart, NodeId};
use strata_formal::FormalModel;

use crate::context::TranslationContext;
use crate::descriptor::{Descriptor, Generated};
use crate::error::TranslateError;
use crate::rules;

/// A transformation rule for one source element shape.
///
/// The engine evaluates `enabled` once per element to build the obligation
/// set, then retries `dependencies_ok` every scan until it holds, at which
/// point `fire` runs exactly once, immediately — a rule may cache lookups
/// from `dependencies_ok` for the `fire` that follows it. `dependencies_ok`
/// must stay idempotent: recomputing the same per-level lookups on every
/// call is expected, irrevocable mutation is not.
pub trait Rule {
    /// Rule name used in stall reports.
    fn name(&self) -> &'static str;

    /// Whether this rule belongs to the second (late) pass.
    fn fire_late(&self) -> bool {
        false
    }

    /// Cheap shape/context check; a disabled rule is never scheduled.
    fn enabled(&self, chart: &Chart, element: NodeId) -> bool;

    /// True iff every target element this rule must reference already
    /// exists in the model or among the pending descriptors.
    fn dependencies_ok(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &TranslationContext,
        model: &FormalModel,
        generated: &Generated,
    ) -> bool;

    /// Perform the construction. Returned descriptors are merged into the
    /// run's pending set.
    fn fire(
        &mut self,
        chart: &Chart,
        element: NodeId,
        cx: &mut TranslationContext,
        model: &mut FormalModel,
        generated: &Generated,
    ) -> Result<Vec<Descriptor>, TranslateError>;
}

/// The statically enumerated rule list. Order matters only for
/// determinism: obligations are scheduled per element in this order.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The full standard rule set, one rule per source element shape.
    pub fn standard() -> Self {
        let mut set = Self::new();
        set.register(Box::new(rules::document::DocumentRule));
        set.register(Box::new(rules::state::StateRule::default()));
        set.register(Box::new(rules::transition::TransitionRule::default()));
        set.register(Box::new(rules::initial::InitialNodeRule::default()));
        set.register(Box::new(rules::initial::InitialTransitionRule::default()));
        set.register(Box::new(rules::final_state::FinalStateRule::default()));
        set.register(Box::new(rules::final_state::FinalNodeRule::default()));
        set.register(Box::new(rules::data::DataVariableRule::default()));
        set.register(Box::new(rules::data::DataConstantRule::default()));
        set.register(Box::new(rules::data::DataCarrierSetRule::default()));
        set.register(Box::new(rules::entry::EntryActionRule::default()));
        set
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, index: usize) -> &dyn Rule {
        self.rules[index].as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> &mut Box<dyn Rule> {
        &mut self.rules[index]
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_set_covers_every_shape() {
        let set = RuleSet::standard();
        assert_eq!(set.len(), 11);
        let names: Vec<&str> = (0..set.len()).map(|i| set.get(i).name()).collect();
        assert!(names.contains(&"document"));
        assert!(names.contains(&"transition"));
        assert!(names.contains(&"final-node"));
    }
}
