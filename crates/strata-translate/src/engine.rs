//! The translation engine: obligation scheduling over the rule set.
//!
//! Every (element, rule) pair with `enabled` true is an obligation. The
//! engine scans the unfired obligations in document order, firing each one
//! whose dependencies now hold, and repeats until a scan fires nothing —
//! first over the normal rules, then again including the late rules. An
//! obligation still unfired after the final fixpoint is a stall, reported
//! as a failure for the whole run; a scan ceiling guards against
//! non-terminating dependency cycles.

use tracing::debug;

use strata_chart::{Chart, NodeId, NodeKind};
use strata_formal::FormalModel;

use crate::context::TranslationContext;
use crate::descriptor::Generated;
use crate::error::{StalledObligation, TranslateError};
use crate::expr::{ExpressionTranslator, VerbatimTranslator};
use crate::report::{TranslationOutput, TranslationReport};
use crate::rule::RuleSet;

/// Configuration of one translation run.
pub struct TranslationConfig {
    /// Upper bound on scans across both passes; exceeding it aborts the
    /// run with [`TranslateError::ScanCeiling`].
    pub max_scans: usize,
    /// The external action-language translator.
    pub translator: Box<dyn ExpressionTranslator>,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_scans: 64,
            translator: Box::new(VerbatimTranslator),
        }
    }
}

struct Obligation {
    element: NodeId,
    rule: usize,
    fired: bool,
}

/// Translate a document with the standard rule set.
pub fn translate(
    chart: &Chart,
    config: TranslationConfig,
) -> Result<TranslationOutput, TranslateError> {
    translate_with(chart, config, RuleSet::standard())
}

/// Translate a document with an explicit rule set.
pub fn translate_with(
    chart: &Chart,
    config: TranslationConfig,
    mut rules: RuleSet,
) -> Result<TranslationOutput, TranslateError> {
    let mut cx = TranslationContext::new(chart, config.translator);
    let mut model = FormalModel::new();
    let mut generated = Generated::new();

    // Schedule one obligation per enabled (element, rule) pair, in
    // document order then rule order.
    let mut obligations = Vec::new();
    for element in chart.ids() {
        for rule_index in 0..rules.len() {
            if rules.get(rule_index).enabled(chart, element) {
                obligations.push(Obligation {
                    element,
                    rule: rule_index,
                    fired: false,
                });
            }
        }
    }
    debug!(
        obligations = obligations.len(),
        depth = cx.depth,
        "translation scheduled"
    );

    let mut scans = 0usize;
    let mut fired = 0usize;
    for include_late in [false, true] {
        run_to_fixpoint(
            chart,
            &mut rules,
            &mut obligations,
            &mut cx,
            &mut model,
            &mut generated,
            include_late,
            config.max_scans,
            &mut scans,
            &mut fired,
        )?;
    }

    let stuck: Vec<StalledObligation> = obligations
        .iter()
        .filter(|ob| !ob.fired)
        .map(|ob| StalledObligation {
            element: describe_element(chart, ob.element),
            rule: rules.get(ob.rule).name(),
        })
        .collect();
    if !stuck.is_empty() {
        return Err(TranslateError::stalled(stuck));
    }

    generated.apply(&mut model)?;

    let chains = cx.take_chains();
    let report = TranslationReport {
        depth: cx.depth,
        scans,
        fired,
        diagnostics: cx.diagnostics,
    };
    Ok(TranslationOutput {
        model,
        chains,
        report,
    })
}

fn describe_element(chart: &Chart, id: NodeId) -> String {
    match chart.kind(id) {
        NodeKind::Transition { targets, .. } => {
            let source = chart
                .parent(id)
                .map(|s| chart.display_name(s).to_owned())
                .unwrap_or_default();
            let target = targets.first().cloned().unwrap_or_default();
            format!("transition `{source}` -> `{target}` ({id})")
        }
        kind => format!("{} `{}` ({})", kind.tag(), chart.display_name(id), id),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_to_fixpoint(
    chart: &Chart,
    rules: &mut RuleSet,
    obligations: &mut [Obligation],
    cx: &mut TranslationContext,
    model: &mut FormalModel,
    generated: &mut Generated,
    include_late: bool,
    max_scans: usize,
    scans: &mut usize,
    fired: &mut usize,
) -> Result<(), TranslateError> {
    loop {
        *scans += 1;
        if *scans > max_scans {
            return Err(TranslateError::ScanCeiling { max_scans });
        }
        let mut fired_this_scan = 0usize;
        for ob in obligations.iter_mut() {
            if ob.fired {
                continue;
            }
            let rule = rules.get_mut(ob.rule);
            if !include_late && rule.fire_late() {
                continue;
            }
            if !rule.dependencies_ok(chart, ob.element, cx, model, generated) {
                continue;
            }
            let descriptors = rule.fire(chart, ob.element, cx, model, generated)?;
            generated.extend(descriptors);
            ob.fired = true;
            fired_this_scan += 1;
        }
        debug!(
            scan = *scans,
            include_late,
            fired = fired_this_scan,
            "scan complete"
        );
        *fired += fired_this_scan;
        if fired_this_scan == 0 {
            return Ok(());
        }
    }
}
