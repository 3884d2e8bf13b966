//! Translation errors.
//!
//! Deferral is not an error — a rule whose dependencies are unmet is
//! simply retried on the next scan. What surfaces here is the fatal end of
//! that retry loop: obligations still unfired at the final fixpoint, a
//! runaway dependency cycle hitting the scan ceiling, or a broken target
//! model operation.

use thiserror::Error;

use strata_formal::FormalError;

/// An obligation that never became ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalledObligation {
    /// Human-readable description of the stuck source element.
    pub element: String,
    /// Name of the rule that could not fire.
    pub rule: &'static str,
}

impl std::fmt::Display for StalledObligation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} via rule `{}`", self.element, self.rule)
    }
}

/// Errors that abort a translation run. No partial target model escapes
/// alongside any of these.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation stalled after fixpoint: {summary}")]
    Stalled {
        summary: String,
        stuck: Vec<StalledObligation>,
    },

    #[error("scan ceiling of {max_scans} exceeded; dependency cycle suspected")]
    ScanCeiling { max_scans: usize },

    #[error("target model error: {0}")]
    Formal(#[from] FormalError),
}

impl TranslateError {
    /// Build the stall error from the stuck obligations.
    pub fn stalled(stuck: Vec<StalledObligation>) -> Self {
        let summary = stuck
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        TranslateError::Stalled { summary, stuck }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stall_names_element_and_rule() {
        let err = TranslateError::stalled(vec![StalledObligation {
            element: "transition `S0` -> `S9` (n4)".into(),
            rule: "transition",
        }]);
        let msg = err.to_string();
        assert!(msg.contains("S9"));
        assert!(msg.contains("transition"));
    }
}
