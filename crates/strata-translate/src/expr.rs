//! The expression-syntax seam.
//!
//! The action-language-to-formal-notation translator is an external
//! collaborator consumed behind a trait; the engine only relies on it
//! being a pure text-to-text function. Whatever it returns goes through
//! the uniform normalisation pass in [`crate::notation`]; whatever it
//! rejects is replaced by a sentinel so one bad expression cannot hide
//! unrelated diagnostics.

use thiserror::Error;

/// A rejected expression.
#[derive(Debug, Clone, Error)]
#[error("cannot translate expression `{text}`: {reason}")]
pub struct ExpressionError {
    pub text: String,
    pub reason: String,
}

impl ExpressionError {
    pub fn new(text: &str, reason: &str) -> Self {
        Self {
            text: text.to_owned(),
            reason: reason.to_owned(),
        }
    }
}

/// Pure syntax translator from the source action language to the target
/// formal notation.
pub trait ExpressionTranslator {
    fn translate(&self, text: &str) -> Result<String, ExpressionError>;
}

/// Pass-through translator for sources already written in the target
/// notation. The default when no translator is configured.
#[derive(Debug, Default)]
pub struct VerbatimTranslator;

impl ExpressionTranslator for VerbatimTranslator {
    fn translate(&self, text: &str) -> Result<String, ExpressionError> {
        Ok(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbatim_is_identity() {
        let t = VerbatimTranslator;
        assert_eq!(t.translate("x + 1").unwrap(), "x + 1");
    }

    #[test]
    fn error_display() {
        let e = ExpressionError::new("x ++", "unexpected operator");
        assert!(e.to_string().contains("x ++"));
        assert!(e.to_string().contains("unexpected operator"));
    }
}
