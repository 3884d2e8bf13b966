//! Programmatic construction API for source documents.
//!
//! # Example
//!
//! ```rust
//! use strata_chart::ChartBuilder;
//!
//! let mut b = ChartBuilder::new("controller");
//! let idle = b.state(b.root(), "Idle");
//! let busy = b.state(b.root(), "Busy");
//! b.initial_transition(b.root(), "Idle");
//! let t = b.transition(idle, Some("start"), &["Busy"]);
//! b.raise(t, "started");
//! let _ = busy;
//! let chart = b.build();
//! assert_eq!(chart.transitions().count(), 2);
//! ```

use crate::document::{Annotation, AnnotationKind, Chart, NodeId, NodeKind};

/// Builds a [`Chart`] top-down. Ids are handed out in construction order,
/// so building in reading order yields document order.
pub struct ChartBuilder {
    chart: Chart,
}

impl ChartBuilder {
    /// Start a new document with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            chart: Chart::with_root(NodeKind::Document {
                name: name.to_owned(),
                initial: Vec::new(),
            }),
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.chart.root()
    }

    pub fn state(&mut self, parent: NodeId, id: &str) -> NodeId {
        self.chart.add_node(
            parent,
            NodeKind::State {
                id: id.to_owned(),
                initial: Vec::new(),
            },
        )
    }

    pub fn parallel(&mut self, parent: NodeId, id: &str) -> NodeId {
        self.chart
            .add_node(parent, NodeKind::Parallel { id: id.to_owned() })
    }

    pub fn initial(&mut self, parent: NodeId) -> NodeId {
        self.chart.add_node(parent, NodeKind::Initial)
    }

    pub fn final_state(&mut self, parent: NodeId, id: &str) -> NodeId {
        self.chart
            .add_node(parent, NodeKind::Final { id: id.to_owned() })
    }

    pub fn transition(
        &mut self,
        source: NodeId,
        event: Option<&str>,
        targets: &[&str],
    ) -> NodeId {
        self.chart.add_node(
            source,
            NodeKind::Transition {
                event: event.map(str::to_owned),
                cond: None,
                targets: targets.iter().map(|t| (*t).to_owned()).collect(),
            },
        )
    }

    /// Convenience: an initial pseudostate plus its outgoing transition.
    /// Returns the transition id.
    pub fn initial_transition(&mut self, parent: NodeId, target: &str) -> NodeId {
        let initial = self.initial(parent);
        self.transition(initial, None, &[target])
    }

    /// Set a transition's condition expression.
    pub fn cond(&mut self, transition: NodeId, cond: &str) {
        if let NodeKind::Transition { cond: slot, .. } =
            &mut self.chart.node_mut(transition).kind
        {
            *slot = Some(cond.to_owned());
        }
    }

    pub fn raise(&mut self, transition: NodeId, event: &str) -> NodeId {
        self.chart.add_node(
            transition,
            NodeKind::Raise {
                event: event.to_owned(),
            },
        )
    }

    pub fn assign(&mut self, owner: NodeId, location: &str, expr: &str) -> NodeId {
        self.chart.add_node(
            owner,
            NodeKind::Assign {
                location: location.to_owned(),
                expr: expr.to_owned(),
            },
        )
    }

    pub fn log(&mut self, transition: NodeId, label: &str) -> NodeId {
        self.chart.add_node(
            transition,
            NodeKind::Log {
                label: label.to_owned(),
            },
        )
    }

    pub fn data(&mut self, owner: NodeId, id: &str, expr: Option<&str>) -> NodeId {
        self.chart.add_node(
            owner,
            NodeKind::Data {
                id: id.to_owned(),
                expr: expr.map(str::to_owned),
            },
        )
    }

    pub fn on_entry(&mut self, state: NodeId) -> NodeId {
        self.chart.add_node(state, NodeKind::OnEntry)
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        self.chart
            .node_mut(id)
            .attrs
            .insert(key.to_owned(), value.to_owned());
    }

    /// Shorthand for the `refinement` level attribute.
    pub fn set_level(&mut self, id: NodeId, level: u32) {
        self.set_attr(id, "refinement", &level.to_string());
    }

    pub fn annotate(&mut self, id: NodeId, annotation: Annotation) {
        self.chart.node_mut(id).annotations.push(annotation);
    }

    /// Shorthand for a guard annotation with a name and predicate.
    pub fn guard(&mut self, owner: NodeId, name: &str, predicate: &str) {
        self.annotate(
            owner,
            Annotation::new(AnnotationKind::Guard)
                .with_attr("name", name)
                .with_attr("predicate", predicate),
        );
    }

    /// Shorthand for an invariant annotation with a name and predicate.
    pub fn invariant(&mut self, owner: NodeId, name: &str, predicate: &str) {
        self.annotate(
            owner,
            Annotation::new(AnnotationKind::Invariant)
                .with_attr("name", name)
                .with_attr("predicate", predicate),
        );
    }

    pub fn build(self) -> Chart {
        self.chart
    }
}
