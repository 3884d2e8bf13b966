//! Refinement-level queries over the source document.
//!
//! The level an element *starts* at depends on its shape, not only on its
//! own annotation: a transition starts with its source state, and a
//! state's own annotation names the level where its nested region appears
//! while the state itself first appears with its parent's region. The
//! starting level is the first refinement the element's translation is
//! generated for; extension carries it through every deeper level.

use crate::document::{Annotation, Chart, NodeId, NodeKind};

impl Chart {
    /// The element's own `refinement` annotation, if present and
    /// well-formed. A malformed value reads as unset.
    pub fn explicit_level(&self, id: NodeId) -> Option<u32> {
        self.attr(id, "refinement")
            .and_then(|v| v.trim().parse().ok())
    }

    /// The element's `finalised` annotation, if present and well-formed.
    pub fn finalised_level(&self, id: NodeId) -> Option<u32> {
        self.attr(id, "finalised")
            .and_then(|v| v.trim().parse().ok())
    }

    /// The basic inherited level: the element's own annotation, else the
    /// nearest annotated ancestor's, else 0.
    pub fn chained_level(&self, id: NodeId) -> u32 {
        match self.explicit_level(id) {
            Some(level) => level,
            None => match self.parent(id) {
                Some(parent) => self.chained_level(parent),
                None => 0,
            },
        }
    }

    /// The refinement level at which this element's translation first
    /// appears.
    pub fn start_level(&self, id: NodeId) -> u32 {
        match self.kind(id) {
            // A transition starts with its source state.
            NodeKind::Transition { .. } => match self.parent(id) {
                Some(parent) => self.start_level(parent),
                None => 0,
            },
            // Raises and assigns may carry their own level; otherwise they
            // follow their owning transition or handler.
            NodeKind::Raise { .. } | NodeKind::Assign { .. } => {
                self.explicit_level(id).unwrap_or_else(|| {
                    self.parent(id).map(|p| self.start_level(p)).unwrap_or(0)
                })
            }
            // A state's own annotation is the level of its nested region;
            // the state itself appears with its parent's region.
            NodeKind::State { .. }
            | NodeKind::Parallel { .. }
            | NodeKind::Final { .. }
            | NodeKind::Initial => self
                .parent(id)
                .map(|p| self.chained_level(p))
                .unwrap_or(0),
            _ => self.chained_level(id),
        }
    }

    /// The level at which a state's nested statemachines appear: its own
    /// annotation chain, never earlier than the state itself.
    pub fn region_level(&self, id: NodeId) -> u32 {
        self.chained_level(id).max(self.start_level(id))
    }

    /// Level of an annotation attached to `owner`: its own `refinement`
    /// attribute, else the owner's starting level.
    pub fn annotation_level(&self, owner: NodeId, annotation: &Annotation) -> u32 {
        annotation
            .explicit_level()
            .unwrap_or_else(|| self.start_level(owner))
    }

    /// The refinement depth of the document: the maximum explicit level
    /// found on any element or annotation, 0 if none.
    pub fn depth(&self) -> u32 {
        let mut depth = 0;
        for id in self.ids() {
            if let Some(level) = self.explicit_level(id) {
                depth = depth.max(level);
            }
            for ann in self.annotations(id) {
                if let Some(level) = ann.explicit_level() {
                    depth = depth.max(level);
                }
            }
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use crate::document::{Annotation, AnnotationKind};
    use crate::ChartBuilder;

    #[test]
    fn depth_defaults_to_zero() {
        let mut b = ChartBuilder::new("doc");
        b.state(b.root(), "S");
        assert_eq!(b.build().depth(), 0);
    }

    #[test]
    fn depth_is_max_annotation() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        let t = b.transition(s, Some("go"), &["S"]);
        b.set_level(s, 1);
        b.annotate(
            t,
            Annotation::new(AnnotationKind::Guard)
                .with_attr("predicate", "x>0")
                .with_attr("refinement", "3"),
        );
        assert_eq!(b.build().depth(), 3);
    }

    #[test]
    fn malformed_level_reads_as_unset() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        b.set_attr(s, "refinement", "not-a-number");
        let chart = b.build();
        assert_eq!(chart.explicit_level(s), None);
        assert_eq!(chart.depth(), 0);
    }

    #[test]
    fn transition_follows_source_state() {
        let mut b = ChartBuilder::new("doc");
        let outer = b.state(b.root(), "Outer");
        b.set_level(outer, 2);
        let inner = b.state(outer, "Inner");
        let t = b.transition(inner, Some("go"), &["Inner"]);
        let chart = b.build();
        // Inner appears with Outer's region (level 2); so does its
        // transition.
        assert_eq!(chart.start_level(inner), 2);
        assert_eq!(chart.start_level(t), 2);
    }

    #[test]
    fn state_annotation_names_region_level() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        b.set_level(s, 1);
        let chart = b.build();
        // The state itself appears at its parent's level...
        assert_eq!(chart.start_level(s), 0);
        // ...while its nested region appears at the annotated level.
        assert_eq!(chart.region_level(s), 1);
    }

    #[test]
    fn raise_overrides_then_inherits() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        b.set_level(s, 1);
        let inner = b.state(s, "I");
        let t = b.transition(inner, Some("go"), &["I"]);
        let annotated = b.raise(t, "a");
        b.set_level(annotated, 2);
        let inherited = b.raise(t, "b");
        let chart = b.build();
        assert_eq!(chart.start_level(annotated), 2);
        assert_eq!(chart.start_level(inherited), chart.start_level(t));
        assert_eq!(chart.start_level(inherited), 1);
    }

    #[test]
    fn annotation_level_defaults_to_owner() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        let t = b.transition(s, Some("go"), &["S"]);
        b.guard(t, "g0", "x>0");
        b.annotate(
            t,
            Annotation::new(AnnotationKind::Guard)
                .with_attr("name", "g2")
                .with_attr("predicate", "y>0")
                .with_attr("refinement", "2"),
        );
        let chart = b.build();
        let guards = chart.guards(t);
        assert_eq!(chart.annotation_level(t, guards[0]), 0);
        assert_eq!(chart.annotation_level(t, guards[1]), 2);
    }

    #[test]
    fn finalised_annotation() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        let t = b.transition(s, Some("go"), &["S"]);
        b.set_attr(t, "finalised", "1");
        let chart = b.build();
        assert_eq!(chart.finalised_level(t), Some(1));
        assert_eq!(chart.finalised_level(s), None);
    }
}
