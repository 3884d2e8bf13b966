//! strata-translate: the rule-based statechart-to-refinement-chain
//! translation engine.
//!
//! Translation turns a [`strata_chart::Chart`] into a chain of
//! machine/context pairs in a [`strata_formal::FormalModel`], one pair per
//! refinement level. The engine schedules one obligation per (element,
//! rule) pair, retries rules whose dependencies are not yet satisfied, and
//! runs normal rules to fixpoint before the late ones. Transitions sharing
//! a trigger merge into combination events, each refining its greatest
//! sub-combination at the previous level.
//!
//! # Example
//!
//! ```rust
//! use strata_chart::ChartBuilder;
//! use strata_translate::{translate, TranslationConfig};
//!
//! let mut b = ChartBuilder::new("ctrl");
//! let idle = b.state(b.root(), "Idle");
//! let busy = b.state(b.root(), "Busy");
//! b.transition(idle, Some("start"), &["Busy"]);
//! b.transition(busy, None, &["Idle"]);
//! let chart = b.build();
//!
//! let output = translate(&chart, TranslationConfig::default()).unwrap();
//! // Depth 0: the basis pair plus one generated level.
//! assert_eq!(output.model.machines().len(), 2);
//! assert_eq!(output.model.contexts().len(), 2);
//! ```

pub mod combine;
pub mod context;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod expr;
pub mod notation;
pub mod report;
pub mod rule;
pub mod rules;
pub mod stratify;

pub use context::{ChainKey, RefinementChain, TranslationContext};
pub use descriptor::{Attach, Descriptor, Generated};
pub use engine::{translate, translate_with, TranslationConfig};
pub use error::{StalledObligation, TranslateError};
pub use expr::{ExpressionError, ExpressionTranslator, VerbatimTranslator};
pub use report::{Diagnostic, TranslationOutput, TranslationReport};
pub use rule::{Rule, RuleSet};
