//! Run report and non-fatal diagnostics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use strata_chart::NodeId;
use strata_formal::FormalModel;

use crate::context::{ChainKey, RefinementChain};

/// A non-fatal degradation observed during translation (an untranslatable
/// expression, a skipped malformed detail). The run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub element: Option<NodeId>,
    pub message: String,
}

/// Statistics and diagnostics from one translation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationReport {
    /// Refinement depth of the source document.
    pub depth: u32,
    /// Scans performed across both passes.
    pub scans: usize,
    /// Obligations fired.
    pub fired: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Output of a successful translation run.
#[derive(Debug)]
pub struct TranslationOutput {
    /// The completed multi-level target model.
    pub model: FormalModel,
    /// The refinement chain recorded per source element (or synthetic
    /// key): one target element per level from the chain's start level to
    /// the document depth.
    pub chains: BTreeMap<ChainKey, RefinementChain>,
    /// Run statistics.
    pub report: TranslationReport,
}
