//! The per-document translation context.
//!
//! Everything a rule needs beyond the source document and the target
//! model lives here: the computed refinement depth, the trigger index,
//! the refinement-chain registry, accumulated diagnostics, and the
//! expression translator. One context is built at the start of each
//! document run and dropped with it — rules never share state through
//! anything process-wide.

use std::collections::BTreeMap;

use strata_chart::{Chart, NodeId, TriggerIndex};
use strata_formal::ElementId;

use crate::expr::ExpressionTranslator;
use crate::notation;
use crate::report::Diagnostic;

/// Key of a refinement chain: a source element, a synthetic statemachine
/// name, or the document-level machine/context chains.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ChainKey {
    Source(NodeId),
    Statemachine(String),
    Machine,
    Context,
}

/// The per-level target elements generated for one chain key. The element
/// at position `i` refines the element at position `i - 1`.
#[derive(Debug, Clone, Default)]
pub struct RefinementChain {
    pub start_level: u32,
    pub elements: Vec<ElementId>,
}

/// Per-document scratch state, reset at the start of each run.
pub struct TranslationContext {
    pub depth: u32,
    pub triggers: TriggerIndex,
    chains: BTreeMap<ChainKey, RefinementChain>,
    pub diagnostics: Vec<Diagnostic>,
    translator: Box<dyn ExpressionTranslator>,
}

impl TranslationContext {
    pub fn new(chart: &Chart, translator: Box<dyn ExpressionTranslator>) -> Self {
        Self {
            depth: chart.depth(),
            triggers: TriggerIndex::build(chart),
            chains: BTreeMap::new(),
            diagnostics: Vec::new(),
            translator,
        }
    }

    /// Translate an expression through the external syntax translator and
    /// apply the uniform normalisation pass. A rejected expression is
    /// replaced by [`notation::EXPR_SENTINEL`] and recorded as a
    /// diagnostic; the run continues.
    pub fn translate_expr(&mut self, element: Option<NodeId>, text: &str) -> String {
        match self.translator.translate(text) {
            Ok(translated) => notation::normalize_expression(&translated),
            Err(err) => {
                self.diagnostics.push(Diagnostic {
                    element,
                    message: err.to_string(),
                });
                notation::EXPR_SENTINEL.to_owned()
            }
        }
    }

    pub fn diagnostic(&mut self, element: Option<NodeId>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            element,
            message: message.into(),
        });
    }

    /// Append the element generated at the next level of a chain.
    pub fn record_chain(&mut self, key: ChainKey, start_level: u32, element: ElementId) {
        let chain = self.chains.entry(key).or_insert_with(|| RefinementChain {
            start_level,
            elements: Vec::new(),
        });
        chain.elements.push(element);
    }

    pub fn chain(&self, key: &ChainKey) -> Option<&RefinementChain> {
        self.chains.get(key)
    }

    pub fn chains(&self) -> impl Iterator<Item = (&ChainKey, &RefinementChain)> {
        self.chains.iter()
    }

    pub(crate) fn take_chains(&mut self) -> BTreeMap<ChainKey, RefinementChain> {
        std::mem::take(&mut self.chains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ExpressionError, VerbatimTranslator};
    use strata_chart::{Chart, ChartBuilder};

    struct RejectingTranslator;
    impl ExpressionTranslator for RejectingTranslator {
        fn translate(&self, text: &str) -> Result<String, ExpressionError> {
            Err(ExpressionError::new(text, "unsupported"))
        }
    }

    fn chart() -> Chart {
        let mut b = ChartBuilder::new("doc");
        b.state(b.root(), "S");
        b.build()
    }

    #[test]
    fn context_computes_depth_and_triggers() {
        let mut b = ChartBuilder::new("doc");
        let s = b.state(b.root(), "S");
        b.set_level(s, 2);
        b.transition(s, Some("go"), &["S"]);
        let chart = b.build();
        let cx = TranslationContext::new(&chart, Box::new(VerbatimTranslator));
        assert_eq!(cx.depth, 2);
        assert!(cx.triggers.get("go").is_some());
    }

    #[test]
    fn translate_expr_normalises() {
        let chart = chart();
        let mut cx = TranslationContext::new(&chart, Box::new(VerbatimTranslator));
        assert_eq!(cx.translate_expr(None, "x == true"), "x = TRUE");
        assert!(cx.diagnostics.is_empty());
    }

    #[test]
    fn rejected_expr_becomes_sentinel_with_diagnostic() {
        let chart = chart();
        let mut cx = TranslationContext::new(&chart, Box::new(RejectingTranslator));
        assert_eq!(cx.translate_expr(None, "x ++"), notation::EXPR_SENTINEL);
        assert_eq!(cx.diagnostics.len(), 1);
        assert!(cx.diagnostics[0].message.contains("x ++"));
    }
}
