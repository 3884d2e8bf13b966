//! The trigger index: one pre-pass over a document collecting every
//! distinct event name, the transitions it triggers, and the raise sites
//! that emit it — plus the per-level enumeration of transition
//! combinations (maximal sets of transitions a shared trigger can fire
//! simultaneously).
//!
//! Trigger names only exist as string attributes of transitions, so most
//! of a trigger's identity is implicit; this index makes it explicit once
//! per document before any translation rule runs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::document::{Chart, NodeId, NodeKind};

/// The sentinel trigger name for untriggered transitions.
pub const UNTRIGGERED: &str = "null";

/// A named trigger and its uses across the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    name: String,
    /// Transitions fired by this trigger, document order.
    triggered: Vec<NodeId>,
    /// Raise sites emitting this trigger, document order.
    raised_by: Vec<NodeId>,
}

impl Trigger {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            triggered: Vec::new(),
            raised_by: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_untriggered(&self) -> bool {
        self.name == UNTRIGGERED
    }

    /// A trigger never raised inside the model must come from outside.
    pub fn is_external(&self) -> bool {
        !self.is_untriggered() && self.raised_by.is_empty()
    }

    pub fn is_internal(&self) -> bool {
        !self.raised_by.is_empty()
    }

    pub fn transitions(&self) -> &[NodeId] {
        &self.triggered
    }

    pub fn raise_sites(&self) -> &[NodeId] {
        &self.raised_by
    }

    /// The refinement level at which this trigger is introduced: the
    /// minimum starting level among the transitions and raise sites that
    /// first mention it.
    pub fn level(&self, chart: &Chart) -> u32 {
        self.triggered
            .iter()
            .chain(self.raised_by.iter())
            .map(|&id| chart.start_level(id))
            .min()
            .unwrap_or(0)
    }

    /// Every maximal set of this trigger's transitions that can fire
    /// together at the given refinement level.
    ///
    /// Only transitions already present at the level and rooted at a real
    /// state (not a pseudostate, not a region state) participate. Two
    /// transitions can fire together iff their source states can be
    /// simultaneously active: one contains the other, or they sit in
    /// orthogonal regions of a parallel. Sibling sources in one region —
    /// including two transitions of the same state — are exclusive.
    pub fn combinations(&self, chart: &Chart, level: u32) -> Vec<BTreeSet<NodeId>> {
        let candidates: Vec<NodeId> = self
            .triggered
            .iter()
            .copied()
            .filter(|&t| chart.start_level(t) <= level && eligible_source(chart, t))
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }
        maximal_co_enabled_sets(chart, &candidates)
    }
}

/// A transition joins combinations only when its source is a state that is
/// not itself a parallel region.
fn eligible_source(chart: &Chart, transition: NodeId) -> bool {
    let Some(source) = chart.parent(transition) else {
        return false;
    };
    if !matches!(chart.kind(source), NodeKind::State { .. }) {
        return false;
    }
    match chart.parent(source) {
        Some(p) => !matches!(chart.kind(p), NodeKind::Parallel { .. }),
        None => false,
    }
}

/// Whether two distinct states can be active at the same time.
fn simultaneously_active(chart: &Chart, a: NodeId, b: NodeId) -> bool {
    if chart.is_ancestor(a, b) || chart.is_ancestor(b, a) {
        return true;
    }
    // Walk to the lowest common ancestor; the pair is orthogonal exactly
    // when the paths diverge at a parallel composition.
    let a_chain: Vec<NodeId> = std::iter::once(a).chain(chart.ancestors(a)).collect();
    for anc in std::iter::once(b).chain(chart.ancestors(b)) {
        if a_chain.contains(&anc) {
            return matches!(chart.kind(anc), NodeKind::Parallel { .. });
        }
    }
    false
}

fn co_enabled(chart: &Chart, a: NodeId, b: NodeId) -> bool {
    let (Some(sa), Some(sb)) = (chart.parent(a), chart.parent(b)) else {
        return false;
    };
    // Two transitions of one state conflict; only one fires.
    if sa == sb {
        return false;
    }
    simultaneously_active(chart, sa, sb)
}

/// Enumerate the maximal pairwise-co-enabled subsets of `candidates`.
///
/// Bron–Kerbosch without pivoting over id-sorted vertices; the input order
/// and the `BTreeSet` representation make the result deterministic for
/// identical documents.
fn maximal_co_enabled_sets(chart: &Chart, candidates: &[NodeId]) -> Vec<BTreeSet<NodeId>> {
    let mut verts: Vec<NodeId> = candidates.to_vec();
    verts.sort_unstable();
    verts.dedup();

    let n = verts.len();
    let mut adj = vec![vec![false; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if co_enabled(chart, verts[i], verts[j]) {
                adj[i][j] = true;
                adj[j][i] = true;
            }
        }
    }

    fn extend(
        r: &mut Vec<usize>,
        p: Vec<usize>,
        x: Vec<usize>,
        adj: &[Vec<bool>],
        out: &mut Vec<Vec<usize>>,
    ) {
        if p.is_empty() && x.is_empty() {
            out.push(r.clone());
            return;
        }
        let mut p = p;
        let mut x = x;
        while let Some(&v) = p.first() {
            r.push(v);
            let p2: Vec<usize> = p.iter().copied().filter(|&u| adj[v][u]).collect();
            let x2: Vec<usize> = x.iter().copied().filter(|&u| adj[v][u]).collect();
            extend(r, p2, x2, adj, out);
            r.pop();
            p.remove(0);
            x.push(v);
        }
    }

    let mut cliques = Vec::new();
    extend(
        &mut Vec::new(),
        (0..n).collect(),
        Vec::new(),
        &adj,
        &mut cliques,
    );

    cliques
        .into_iter()
        .map(|c| c.into_iter().map(|i| verts[i]).collect())
        .collect()
}

/// Registry of every trigger mentioned in a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerIndex {
    triggers: std::collections::BTreeMap<String, Trigger>,
}

impl TriggerIndex {
    /// One full traversal collecting trigger names from transition events
    /// and raise sites. An absent or blank event name registers under the
    /// [`UNTRIGGERED`] sentinel.
    pub fn build(chart: &Chart) -> Self {
        let mut triggers = std::collections::BTreeMap::new();
        for transition in chart.transitions() {
            let name = match chart.kind(transition) {
                NodeKind::Transition { event, .. } => match event.as_deref() {
                    Some(e) if !e.trim().is_empty() => e.trim().to_owned(),
                    _ => UNTRIGGERED.to_owned(),
                },
                _ => continue,
            };
            triggers
                .entry(name.clone())
                .or_insert_with(|| Trigger::new(&name))
                .triggered
                .push(transition);

            for raise in chart.raises(transition) {
                if let NodeKind::Raise { event } = chart.kind(raise) {
                    triggers
                        .entry(event.clone())
                        .or_insert_with(|| Trigger::new(event))
                        .raised_by
                        .push(raise);
                }
            }
        }
        Self { triggers }
    }

    pub fn get(&self, name: &str) -> Option<&Trigger> {
        self.triggers.get(name)
    }

    /// Triggers in name order (deterministic).
    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.values()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChartBuilder;

    #[test]
    fn index_collects_triggers_and_raises() {
        let mut b = ChartBuilder::new("doc");
        let s0 = b.state(b.root(), "S0");
        let s1 = b.state(b.root(), "S1");
        let t = b.transition(s0, Some("go"), &["S1"]);
        b.raise(t, "done");
        b.transition(s1, None, &["S0"]);
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        assert_eq!(idx.len(), 3); // go, done, null

        let go = idx.get("go").unwrap();
        assert_eq!(go.transitions().len(), 1);
        assert!(go.is_external());

        let done = idx.get("done").unwrap();
        assert!(done.is_internal());
        assert_eq!(done.transitions().len(), 0);
        assert_eq!(done.raise_sites().len(), 1);

        let null = idx.get(UNTRIGGERED).unwrap();
        assert!(null.is_untriggered());
        assert!(!null.is_external());
    }

    #[test]
    fn blank_event_is_untriggered() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        b.transition(s, Some("  "), &["S"]);
        let chart = b.build();
        let idx = TriggerIndex::build(&chart);
        assert!(idx.get(UNTRIGGERED).is_some());
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn trigger_level_is_minimum_start() {
        let mut b = ChartBuilder::new("doc");
        let s0 = b.state(b.root(), "S0");
        b.set_level(s0, 1);
        let inner = b.state(s0, "I");
        b.transition(inner, Some("go"), &["I"]); // starts at level 1
        let s1 = b.state(b.root(), "S1");
        b.transition(s1, Some("go"), &["S1"]); // starts at level 0
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        assert_eq!(idx.get("go").unwrap().level(&chart), 0);
    }

    #[test]
    fn exclusive_siblings_never_combine() {
        let mut b = ChartBuilder::new("doc");
        let s0 = b.state(b.root(), "S0");
        let s1 = b.state(b.root(), "S1");
        let a = b.transition(s0, Some("go"), &["S1"]);
        let c = b.transition(s1, Some("go"), &["S0"]);
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        let combos = idx.get("go").unwrap().combinations(&chart, 0);
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.len() == 1));
        assert!(combos[0].contains(&a));
        assert!(combos[1].contains(&c));
    }

    #[test]
    fn orthogonal_regions_combine() {
        let mut b = ChartBuilder::new("doc");
        let top = b.state(b.root(), "Top");
        let par = b.parallel(top, "P");
        let r1 = b.state(par, "R1");
        let r2 = b.state(par, "R2");
        let a_state = b.state(r1, "A");
        let b_state = b.state(r2, "B");
        let ta = b.transition(a_state, Some("go"), &["A"]);
        let tb = b.transition(b_state, Some("go"), &["B"]);
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        let combos = idx.get("go").unwrap().combinations(&chart, 0);
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0], [ta, tb].into_iter().collect());
    }

    #[test]
    fn level_scopes_candidates() {
        let mut b = ChartBuilder::new("doc");
        let top = b.state(b.root(), "Top");
        let par = b.parallel(top, "P");
        let r1 = b.state(par, "R1");
        let r2 = b.state(par, "R2");
        let a_state = b.state(r1, "A");
        let late_state = b.state(r2, "B");
        b.set_level(r2, 1); // region B's content appears at level 1
        let ta = b.transition(a_state, Some("go"), &["A"]);
        let tb = b.transition(late_state, Some("go"), &["B"]);
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        let at0 = idx.get("go").unwrap().combinations(&chart, 0);
        assert_eq!(at0, vec![[ta].into_iter().collect::<BTreeSet<_>>()]);
        let at1 = idx.get("go").unwrap().combinations(&chart, 1);
        assert_eq!(at1, vec![[ta, tb].into_iter().collect::<BTreeSet<_>>()]);
    }

    #[test]
    fn pseudostate_sources_are_excluded() {
        let mut b = ChartBuilder::new("doc");
        b.state(b.root(), "S");
        b.initial_transition(b.root(), "S");
        let chart = b.build();
        let idx = TriggerIndex::build(&chart);
        let combos = idx.get(UNTRIGGERED).unwrap().combinations(&chart, 0);
        assert!(combos.is_empty());
    }

    #[test]
    fn nested_state_combines_with_ancestor() {
        let mut b = ChartBuilder::new("doc");
        let outer = b.state(b.root(), "Outer");
        let inner = b.state(outer, "Inner");
        let t_outer = b.transition(outer, Some("go"), &["Outer"]);
        let t_inner = b.transition(inner, Some("go"), &["Inner"]);
        let chart = b.build();

        let idx = TriggerIndex::build(&chart);
        let combos = idx.get("go").unwrap().combinations(&chart, 0);
        // Outer and Inner are simultaneously active, so the two
        // transitions form one maximal combination.
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0], [t_outer, t_inner].into_iter().collect());
    }
}
