//! Generated names and formal-notation predicate text.
//!
//! Everything the translation writes into the target model — component
//! names, the run-to-completion basis vocabulary, guard and action
//! predicates, and the uniform expression normalisation applied after the
//! external syntax translator — is built here, so naming stays consistent
//! and reproducible across runs.

// --- Basis vocabulary ---

/// Name shared by the synthetic basis machine and context.
pub const BASIS: &str = "basis";

/// Carrier set of all possible triggers.
pub const TRIGGER_SET: &str = "RTC_TRIGGER";
/// Constant for triggers not yet introduced that will be raised internally.
pub const FUTURE_INTERNAL: &str = "RTC_FutureInternalTrigger";
/// Constant for triggers not yet introduced that arrive from outside.
pub const FUTURE_EXTERNAL: &str = "RTC_FutureExternalTrigger";

pub const INTERNAL_QUEUE: &str = "rtc_iq";
pub const EXTERNAL_QUEUE: &str = "rtc_eq";
pub const COMPLETION_FLAG: &str = "rtc_cf";
pub const DEQUEUED_SET: &str = "rtc_dt";

pub const RAISED_PARAM: &str = "rtc_raisedTriggers";
pub const CONSUMED_PARAM: &str = "rtc_trigger";
pub const DEQUEUED_INTERNAL_PARAM: &str = "rtc_it";
pub const DEQUEUED_EXTERNAL_PARAM: &str = "rtc_et";

pub const INITIALISATION: &str = "INITIALISATION";
pub const FUTURE_EXTERNAL_RAISE_EVENT: &str = "RTC_futureRaiseExternalTrigger";
pub const DEQUEUE_INTERNAL_EVENT: &str = "RTC_dequeueInternalTrigger";
pub const DEQUEUE_EXTERNAL_EVENT: &str = "RTC_dequeueExternalTrigger";
pub const FUTURE_TRIGGERED_EVENT: &str = "RTC_futureTriggeredTransitionSet";
pub const NO_ENABLED_EVENT: &str = "RTC_noTriggeredTransitionsEnabled";
pub const FUTURE_UNTRIGGERED_EVENT: &str = "RTC_futureUntriggeredTransitionSet";
pub const COMPLETION_EVENT: &str = "RTC_noUntriggeredTransitions";

pub const TRIGGER_GUARD_NAME: &str = "rtc_triggerGd";
pub const RAISED_EXTERNAL_GUARD_NAME: &str = "raisedExternalTrigger";
pub const RAISED_INTERNAL_GUARD_NAME: &str = "raisedInternalTriggers";

/// Replacement text for an expression the syntax translator rejected.
pub const EXPR_SENTINEL: &str = "⟨untranslatable⟩";

// --- Component and structure names ---

pub fn machine_name(document: &str, level: u32) -> String {
    format!("{document}_{level}")
}

pub fn context_name(document: &str, level: u32) -> String {
    format!("{machine}_ctx", machine = machine_name(document, level))
}

pub fn statemachine_name(owner: &str) -> String {
    format!("{owner}_sm")
}

pub fn initial_node_name(statemachine: &str) -> String {
    format!("{statemachine}_initialState")
}

pub fn final_node_name(statemachine: &str) -> String {
    format!("{statemachine}_final")
}

pub fn internal_triggers_name(level: u32) -> String {
    format!("{FUTURE_INTERNAL}{level}")
}

pub fn external_triggers_name(level: u32) -> String {
    format!("{FUTURE_EXTERNAL}{level}")
}

// --- Basis predicates ---

pub fn trigger_partition_axiom() -> (String, String) {
    (
        "axm1".to_owned(),
        format!("partition({TRIGGER_SET},{FUTURE_INTERNAL},{FUTURE_EXTERNAL})"),
    )
}

pub fn internal_queue_typing() -> (String, String) {
    (
        format!("typeof_{INTERNAL_QUEUE}"),
        format!("{INTERNAL_QUEUE} ⊆ {FUTURE_INTERNAL}"),
    )
}

pub fn external_queue_typing() -> (String, String) {
    (
        format!("typeof_{EXTERNAL_QUEUE}"),
        format!("{EXTERNAL_QUEUE} ⊆ {FUTURE_EXTERNAL}"),
    )
}

pub fn queue_disjointness() -> (String, String) {
    (
        "disjointQueues".to_owned(),
        format!("{INTERNAL_QUEUE} ∩ {EXTERNAL_QUEUE} = ∅"),
    )
}

pub fn completion_flag_typing() -> (String, String) {
    (
        format!("typeof_{COMPLETION_FLAG}"),
        format!("{COMPLETION_FLAG} ∈ BOOL"),
    )
}

pub fn dequeued_set_typing() -> (String, String) {
    (
        format!("typeof_{DEQUEUED_SET}"),
        format!("{DEQUEUED_SET} ⊆ {TRIGGER_SET}"),
    )
}

pub fn one_dequeued_trigger() -> (String, String) {
    (
        "oneDequeuedTrigger".to_owned(),
        format!("finite({DEQUEUED_SET}) ∧ card({DEQUEUED_SET}) ≤ 1"),
    )
}

pub fn empty_init_action(variable: &str) -> (String, String) {
    (format!("init_{variable}"), format!("{variable} ≔ ∅"))
}

pub fn set_complete_action() -> (String, String) {
    (
        "rtc_setComplete".to_owned(),
        format!("{COMPLETION_FLAG} ≔ TRUE"),
    )
}

pub fn set_not_complete_action() -> (String, String) {
    (
        "rtc_setNotComplete".to_owned(),
        format!("{COMPLETION_FLAG} ≔ FALSE"),
    )
}

pub fn clear_dequeued_action() -> (String, String) {
    (
        "rtc_clearDequeuedTriggers".to_owned(),
        format!("{DEQUEUED_SET} ≔ ∅"),
    )
}

pub fn store_dequeued_action(param: &str) -> (String, String) {
    (
        "rtc_storeDequeuedTrigger".to_owned(),
        format!("{DEQUEUED_SET} ≔ {{{param}}}"),
    )
}

pub fn consume_dequeued_action(queue: &str, param: &str) -> (String, String) {
    (
        "rtc_consumeDequeuedTrigger".to_owned(),
        format!("{queue} ≔ {queue} ∖ {{{param}}}"),
    )
}

pub fn raise_internal_action() -> (String, String) {
    (
        "rtc_raiseInternalTriggers".to_owned(),
        format!("{INTERNAL_QUEUE} ≔ {INTERNAL_QUEUE} ∪ {RAISED_PARAM}"),
    )
}

pub fn raise_external_action() -> (String, String) {
    (
        "rtc_raiseExternalTriggers".to_owned(),
        format!("{EXTERNAL_QUEUE} ≔ {EXTERNAL_QUEUE} ∪ {RAISED_PARAM}"),
    )
}

pub fn is_complete_guard() -> (String, String) {
    ("rtc_isComplete".to_owned(), format!("{COMPLETION_FLAG} = TRUE"))
}

pub fn is_not_complete_guard() -> (String, String) {
    (
        "rtc_isNotComplete".to_owned(),
        format!("{COMPLETION_FLAG} = FALSE"),
    )
}

pub fn has_dequeued_guard() -> (String, String) {
    (
        "rtc_hasDequeuedTriggers".to_owned(),
        format!("{DEQUEUED_SET} ≠ ∅"),
    )
}

pub fn has_no_dequeued_guard() -> (String, String) {
    (
        "rtc_hasNoDequeuedTriggers".to_owned(),
        format!("{DEQUEUED_SET} = ∅"),
    )
}

pub fn internal_queue_empty_guard() -> (String, String) {
    (
        "rtc_internalQEmpty".to_owned(),
        format!("{INTERNAL_QUEUE} = ∅"),
    )
}

pub fn raised_internal_typing_guard() -> (String, String) {
    (
        format!("typeof_{RAISED_PARAM}"),
        format!("{RAISED_PARAM} ⊆ {FUTURE_INTERNAL}"),
    )
}

pub fn raised_external_typing_guard() -> (String, String) {
    (
        format!("typeof_{RAISED_PARAM}"),
        format!("{RAISED_PARAM} ⊆ {FUTURE_EXTERNAL}"),
    )
}

pub fn dequeued_internal_typing_guard() -> (String, String) {
    (
        format!("typeof_{DEQUEUED_INTERNAL_PARAM}"),
        format!("{DEQUEUED_INTERNAL_PARAM} ∈ {INTERNAL_QUEUE}"),
    )
}

pub fn dequeued_external_typing_guard() -> (String, String) {
    (
        format!("typeof_{DEQUEUED_EXTERNAL_PARAM}"),
        format!("{DEQUEUED_EXTERNAL_PARAM} ∈ {EXTERNAL_QUEUE}"),
    )
}

pub fn consumed_trigger_typing_guard() -> (String, String) {
    (
        format!("typeof_{CONSUMED_PARAM}"),
        format!("{CONSUMED_PARAM} ∈ {DEQUEUED_SET}"),
    )
}

// --- Per-level guards and axioms ---

/// Guard added to the refined future-external-raise event at each level:
/// raised triggers must be a non-empty subset of what is still future.
pub fn raised_external_level_guard(level: u32) -> (String, String) {
    (
        format!("typeof_{RAISED_PARAM}{level}"),
        format!(
            "{RAISED_PARAM} ∈ ℙ1({external})",
            external = external_triggers_name(level)
        ),
    )
}

/// Guard added to the refined future-triggered event at each level:
/// the consumed trigger cannot be one of the triggers now defined.
pub fn defined_triggers_guard(level: u32, defined: &[String]) -> (String, String) {
    (
        format!("rtc_definedTriggers{level}"),
        format!(
            "{CONSUMED_PARAM} ∉ {{{list}}}",
            list = defined.join(",")
        ),
    )
}

fn trigger_definition_axiom(
    family: &str,
    level: u32,
    introduced: &[String],
) -> (String, String) {
    let current = format!("{family}{level}");
    let previous = if level == 0 {
        family.to_owned()
    } else {
        format!("{family}{prev}", prev = level - 1)
    };
    let predicate = if introduced.is_empty() {
        format!("{current} = {previous}")
    } else {
        format!(
            "partition({previous},{current},{{{list}}})",
            list = introduced.join(",")
        )
    };
    (format!("typeof_{current}"), predicate)
}

pub fn external_trigger_axiom(level: u32, introduced: &[String]) -> (String, String) {
    trigger_definition_axiom(FUTURE_EXTERNAL, level, introduced)
}

pub fn internal_trigger_axiom(level: u32, introduced: &[String]) -> (String, String) {
    trigger_definition_axiom(FUTURE_INTERNAL, level, introduced)
}

/// Axiom spelling out the complete trigger set for animation back-ends.
pub fn animation_setup_axiom(level: u32, all_triggers: &[String]) -> (String, String) {
    (
        format!("setup_{TRIGGER_SET}{level}"),
        format!(
            "partition({TRIGGER_SET},{{{list}}},{ext},{int})",
            list = all_triggers.join(","),
            ext = external_triggers_name(level),
            int = internal_triggers_name(level)
        ),
    )
}

// --- Event-level guards ---

pub fn trigger_guard_predicate(trigger: &str) -> String {
    format!("{CONSUMED_PARAM} = {trigger}")
}

pub fn specific_raised_external(trigger: &str) -> String {
    format!("{RAISED_PARAM} = {{{trigger}}}")
}

pub fn specific_raised_internal(raised: &[String]) -> String {
    format!("{{{list}}} ⊆ {RAISED_PARAM}", list = raised.join(","))
}

pub fn completion_guard_name(label: &str) -> String {
    format!("completionOf_{label}")
}

// --- State invariants, data typing, assignments ---

/// A state invariant predicate, guarded by its trigger when one is named.
pub fn state_invariant(trigger: Option<&str>, predicate: &str) -> String {
    match trigger {
        Some(t) if !t.is_empty() => format!("{t} ∈ {DEQUEUED_SET} ⇒ ({predicate})"),
        _ => predicate.to_owned(),
    }
}

pub fn type_predicate(name: &str, type_text: &str) -> String {
    format!("{name} ∈ {type_text}")
}

/// Deterministic or nondeterministic value axiom for a constant.
pub fn value_predicate(name: &str, expr: &str, nondeterministic: bool) -> String {
    if nondeterministic {
        format!("{name} ∈ {expr}")
    } else {
        format!("{name} = {expr}")
    }
}

/// Deterministic or nondeterministic assignment text.
pub fn assign_action(location: &str, expr: &str, nondeterministic: bool) -> String {
    if nondeterministic {
        format!("{location} :∈ {expr}")
    } else {
        format!("{location} ≔ {expr}")
    }
}

/// The formal type of a data item: the `type` annotation (with the NAT/INT
/// shorthands expanded), else inferred from the initial expression.
pub fn data_type(type_attr: Option<&str>, expr: Option<&str>) -> Option<String> {
    if let Some(t) = type_attr {
        let t = t.trim();
        if !t.is_empty() {
            return Some(match t {
                "NAT" => "ℕ".to_owned(),
                "INT" => "ℤ".to_owned(),
                other => other.to_owned(),
            });
        }
    }
    let expr = expr?.trim();
    if expr.parse::<i64>().is_ok() {
        return Some("ℤ".to_owned());
    }
    if expr == "true" || expr == "false" {
        return Some("BOOL".to_owned());
    }
    None
}

// --- Expression normalisation ---

/// Replace whole-word occurrences of `from` with `to`; word characters are
/// ASCII alphanumerics and `_`.
fn replace_word(text: &str, from: &str, to: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    while i < bytes.len() {
        if text[i..].starts_with(from) {
            let before_ok = i == 0 || !is_word(bytes[i - 1]);
            let after = i + from.len();
            let after_ok = after >= bytes.len() || !is_word(bytes[after]);
            if before_ok && after_ok {
                out.push_str(to);
                i = after;
                continue;
            }
        }
        let ch = text[i..].chars().next().unwrap_or('\u{fffd}');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Upper-case boolean literals the way the target notation expects.
pub fn normalize_booleans(expr: &str) -> String {
    replace_word(&replace_word(expr, "true", "TRUE"), "false", "FALSE")
}

/// The action language's equality test is the target notation's equality.
pub fn normalize_equality(expr: &str) -> String {
    expr.replace("==", "=")
}

/// Dotted locations flatten to identifier-safe names.
pub fn flatten_location(location: &str) -> String {
    location.replace('.', "_")
}

/// Condition expressions may arrive wrapped in one pair of brackets.
pub fn strip_brackets(expr: &str) -> String {
    if expr.len() >= 2 && expr.starts_with('[') && expr.ends_with(']') {
        expr[1..expr.len() - 1].to_owned()
    } else {
        expr.to_owned()
    }
}

/// The uniform post-pass applied to every translated expression.
pub fn normalize_expression(expr: &str) -> String {
    normalize_booleans(&normalize_equality(expr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_names() {
        assert_eq!(machine_name("ctrl", 2), "ctrl_2");
        assert_eq!(context_name("ctrl", 0), "ctrl_0_ctx");
        assert_eq!(statemachine_name("S0"), "S0_sm");
        assert_eq!(initial_node_name("S0_sm"), "S0_sm_initialState");
    }

    #[test]
    fn trigger_axiom_chains_to_previous_level() {
        let (_, at_zero) = external_trigger_axiom(0, &[]);
        assert_eq!(at_zero, "RTC_FutureExternalTrigger0 = RTC_FutureExternalTrigger");
        let (_, at_two) = external_trigger_axiom(2, &["go".into(), "stop".into()]);
        assert_eq!(
            at_two,
            "partition(RTC_FutureExternalTrigger1,RTC_FutureExternalTrigger2,{go,stop})"
        );
    }

    #[test]
    fn boolean_normalisation_respects_word_boundaries() {
        assert_eq!(normalize_booleans("x = true"), "x = TRUE");
        assert_eq!(normalize_booleans("untrue = false"), "untrue = FALSE");
        assert_eq!(normalize_booleans("trueish"), "trueish");
    }

    #[test]
    fn equality_normalisation() {
        assert_eq!(normalize_equality("x == 1 ∧ y >= 2"), "x = 1 ∧ y >= 2");
    }

    #[test]
    fn location_flattening() {
        assert_eq!(flatten_location("engine.rpm"), "engine_rpm");
        assert_eq!(flatten_location("plain"), "plain");
    }

    #[test]
    fn bracket_stripping() {
        assert_eq!(strip_brackets("[x > 0]"), "x > 0");
        assert_eq!(strip_brackets("x > 0"), "x > 0");
        assert_eq!(strip_brackets("[]"), "");
    }

    #[test]
    fn data_type_inference() {
        assert_eq!(data_type(Some("NAT"), None).as_deref(), Some("ℕ"));
        assert_eq!(data_type(Some("INT"), None).as_deref(), Some("ℤ"));
        assert_eq!(data_type(Some("COLOUR"), None).as_deref(), Some("COLOUR"));
        assert_eq!(data_type(None, Some("42")).as_deref(), Some("ℤ"));
        assert_eq!(data_type(None, Some("false")).as_deref(), Some("BOOL"));
        assert_eq!(data_type(None, Some("reset()")), None);
    }

    #[test]
    fn assignment_forms() {
        assert_eq!(assign_action("x", "1", false), "x ≔ 1");
        assert_eq!(assign_action("x", "ℕ", true), "x :∈ ℕ");
    }

    #[test]
    fn state_invariant_forms() {
        assert_eq!(state_invariant(None, "x > 0"), "x > 0");
        assert_eq!(
            state_invariant(Some("go"), "x > 0"),
            "go ∈ rtc_dt ⇒ (x > 0)"
        );
    }
}
