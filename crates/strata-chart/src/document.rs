//! The source document arena: nodes, kinds, attributes, annotations.
//!
//! Node ids are dense indices allocated in construction order, which is
//! also document order — the deterministic scan order the translation
//! engine relies on.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node in a [`Chart`] arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Arena index of this id.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The shape of a source element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The document root.
    Document { name: String, initial: Vec<String> },
    /// A (possibly compound) state.
    State { id: String, initial: Vec<String> },
    /// A parallel composition; its direct children are region states.
    Parallel { id: String },
    /// An initial pseudostate.
    Initial,
    /// A final pseudostate.
    Final { id: String },
    /// A transition. `event` is the triggering event name (`None` for
    /// untriggered); only the first target is translated.
    Transition {
        event: Option<String>,
        cond: Option<String>,
        targets: Vec<String>,
    },
    /// An event raised while a transition fires.
    Raise { event: String },
    /// An assignment performed by a transition or entry handler.
    Assign { location: String, expr: String },
    /// A log statement; its label is a naming fallback for merged events.
    Log { label: String },
    /// A data item (variable, constant, or carrier set per its `dataKind`
    /// attribute).
    Data { id: String, expr: Option<String> },
    /// An entry-action container owned by a state.
    OnEntry,
}

impl NodeKind {
    /// Short kind tag, used in diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            NodeKind::Document { .. } => "document",
            NodeKind::State { .. } => "state",
            NodeKind::Parallel { .. } => "parallel",
            NodeKind::Initial => "initial",
            NodeKind::Final { .. } => "final",
            NodeKind::Transition { .. } => "transition",
            NodeKind::Raise { .. } => "raise",
            NodeKind::Assign { .. } => "assign",
            NodeKind::Log { .. } => "log",
            NodeKind::Data { .. } => "data",
            NodeKind::OnEntry => "onentry",
        }
    }
}

/// Kinds of foreign annotation children an element may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationKind {
    Guard,
    Invariant,
    Parameter,
}

/// A guard/invariant/parameter annotation attached to a source element.
///
/// Annotations are attribute bags: `name`, `derived`, `predicate`,
/// `trigger`, `type`, `comment`, and `refinement` are all read from
/// `attrs` on demand, so an unparsable or missing value degrades instead
/// of failing document construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub attrs: BTreeMap<String, String>,
}

impl Annotation {
    pub fn new(kind: AnnotationKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attrs.insert(key.to_owned(), value.to_owned());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn name(&self) -> &str {
        self.attr("name").unwrap_or("")
    }

    pub fn predicate(&self) -> Option<&str> {
        self.attr("predicate")
    }

    pub fn derived(&self) -> bool {
        self.attr("derived")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn comment(&self) -> &str {
        self.attr("comment").unwrap_or("")
    }

    /// Explicit refinement level of the annotation itself, if present and
    /// well-formed.
    pub fn explicit_level(&self) -> Option<u32> {
        self.attr("refinement").and_then(|v| v.trim().parse().ok())
    }
}

/// A node in the source document tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    /// Open attribute map; `refinement`, `finalised`, `dataKind`, `label`,
    /// and `type` are the keys the translation reads.
    pub attrs: BTreeMap<String, String>,
    pub annotations: Vec<Annotation>,
}

/// The source document: an arena of [`ChartNode`]s rooted at a
/// [`NodeKind::Document`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    nodes: Vec<ChartNode>,
}

impl Chart {
    pub(crate) fn with_root(kind: NodeKind) -> Self {
        let root = ChartNode {
            id: NodeId(0),
            parent: None,
            children: Vec::new(),
            kind,
            attrs: BTreeMap::new(),
            annotations: Vec::new(),
        };
        Self { nodes: vec![root] }
    }

    pub(crate) fn add_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(ChartNode {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind,
            attrs: BTreeMap::new(),
            annotations: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut ChartNode {
        &mut self.nodes[id.index()]
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &ChartNode {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// All node ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.nodes[id.index()].attrs.get(key).map(String::as_str)
    }

    pub fn annotations(&self, id: NodeId) -> &[Annotation] {
        &self.nodes[id.index()].annotations
    }

    /// Annotations of one kind, in declaration order.
    pub fn annotations_of(&self, id: NodeId, kind: AnnotationKind) -> Vec<&Annotation> {
        self.annotations(id)
            .iter()
            .filter(|a| a.kind == kind)
            .collect()
    }

    pub fn guards(&self, id: NodeId) -> Vec<&Annotation> {
        self.annotations_of(id, AnnotationKind::Guard)
    }

    pub fn invariants(&self, id: NodeId) -> Vec<&Annotation> {
        self.annotations_of(id, AnnotationKind::Invariant)
    }

    pub fn parameters(&self, id: NodeId) -> Vec<&Annotation> {
        self.annotations_of(id, AnnotationKind::Parameter)
    }

    /// Display name of a node: the id of states/finals/parallels/data, the
    /// document name, or the kind tag for anonymous nodes.
    pub fn display_name(&self, id: NodeId) -> &str {
        match self.kind(id) {
            NodeKind::Document { name, .. } => name,
            NodeKind::State { id, .. } => id,
            NodeKind::Parallel { id } => id,
            NodeKind::Final { id } => id,
            NodeKind::Data { id, .. } => id,
            other => other.tag(),
        }
    }

    // --- Containment navigation ---

    /// Ancestors of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let next = current?;
            current = self.parent(next);
            Some(next)
        })
    }

    /// Whether `ancestor` contains `id` (strictly).
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// The nearest enclosing `State`, starting from `id` itself.
    pub fn containing_state(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| matches!(self.kind(n), NodeKind::State { .. }))
    }

    /// The document root containing `id` (always the arena root here, but
    /// kept as an upward walk so queries mirror the containment contract).
    pub fn containing_document(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| matches!(self.kind(n), NodeKind::Document { .. }))
    }

    /// The name of the statemachine that owns the translation of `id`:
    /// `{state-id}_sm` for the nearest enclosing state above `id`, else
    /// `{document-name}_sm`.
    ///
    /// Region states (direct children of a parallel) are themselves
    /// namespaces: elements inside them resolve to `{region-id}_sm`.
    pub fn statemachine_namespace(&self, id: NodeId) -> Option<String> {
        for anc in self.ancestors(id) {
            match self.kind(anc) {
                NodeKind::State { id: sid, .. } => return Some(format!("{sid}_sm")),
                NodeKind::Document { name, .. } => return Some(format!("{name}_sm")),
                _ => continue,
            }
        }
        None
    }

    // --- Typed child access ---

    fn children_of_kind(&self, id: NodeId, pred: fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| pred(self.kind(c)))
            .collect()
    }

    /// All transitions in the document, in document order.
    pub fn transitions(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids()
            .filter(|&id| matches!(self.kind(id), NodeKind::Transition { .. }))
    }

    pub fn raises(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_kind(id, |k| matches!(k, NodeKind::Raise { .. }))
    }

    pub fn assigns(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_kind(id, |k| matches!(k, NodeKind::Assign { .. }))
    }

    pub fn logs(&self, id: NodeId) -> Vec<NodeId> {
        self.children_of_kind(id, |k| matches!(k, NodeKind::Log { .. }))
    }

    /// Whether a state has compound content of its own (child states or
    /// pseudostates, not counting parallel regions).
    pub fn has_own_region(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|&c| {
            matches!(
                self.kind(c),
                NodeKind::State { .. } | NodeKind::Initial | NodeKind::Final { .. }
            )
        })
    }

    /// Region states of all parallel children of `id`, in document order.
    pub fn parallel_regions(&self, id: NodeId) -> Vec<NodeId> {
        let mut regions = Vec::new();
        for &c in self.children(id) {
            if matches!(self.kind(c), NodeKind::Parallel { .. }) {
                regions.extend(
                    self.children_of_kind(c, |k| matches!(k, NodeKind::State { .. })),
                );
            }
        }
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChartBuilder;

    fn sample() -> Chart {
        let mut b = ChartBuilder::new("ctrl");
        let s0 = b.state(b.root(), "S0");
        let s1 = b.state(b.root(), "S1");
        let nested = b.state(s0, "S0a");
        let t = b.transition(nested, Some("go"), &["S1"]);
        b.raise(t, "done");
        let _ = s1;
        b.build()
    }

    #[test]
    fn document_order_ids() {
        let c = sample();
        let ids: Vec<_> = c.ids().collect();
        assert_eq!(ids.len(), c.node_count());
        assert_eq!(ids[0], c.root());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn containment_navigation() {
        let c = sample();
        let nested = c
            .ids()
            .find(|&id| c.display_name(id) == "S0a")
            .unwrap();
        let s0 = c.containing_state(c.parent(nested).unwrap()).unwrap();
        assert_eq!(c.display_name(s0), "S0");
        assert!(c.is_ancestor(c.root(), nested));
        assert_eq!(c.containing_document(nested), Some(c.root()));
    }

    #[test]
    fn statemachine_namespace_resolution() {
        let c = sample();
        let nested = c.ids().find(|&id| c.display_name(id) == "S0a").unwrap();
        assert_eq!(c.statemachine_namespace(nested).unwrap(), "S0_sm");
        let s0 = c.ids().find(|&id| c.display_name(id) == "S0").unwrap();
        assert_eq!(c.statemachine_namespace(s0).unwrap(), "ctrl_sm");
    }

    #[test]
    fn transition_children() {
        let c = sample();
        let t = c.transitions().next().unwrap();
        assert_eq!(c.raises(t).len(), 1);
        assert!(c.assigns(t).is_empty());
        match c.kind(t) {
            NodeKind::Transition { event, targets, .. } => {
                assert_eq!(event.as_deref(), Some("go"));
                assert_eq!(targets, &["S1".to_owned()]);
            }
            _ => panic!("expected transition"),
        }
    }

    #[test]
    fn annotation_accessors() {
        let ann = Annotation::new(AnnotationKind::Guard)
            .with_attr("name", "g1")
            .with_attr("derived", "TRUE")
            .with_attr("predicate", "x>0")
            .with_attr("refinement", "2");
        assert_eq!(ann.name(), "g1");
        assert!(ann.derived());
        assert_eq!(ann.predicate(), Some("x>0"));
        assert_eq!(ann.explicit_level(), Some(2));

        let malformed = Annotation::new(AnnotationKind::Invariant).with_attr("refinement", "two");
        assert_eq!(malformed.explicit_level(), None);
    }
}
