//! Guardrail checks at the three trust boundaries: user input, retrieved
//! context and generated output.

use crate::context::ContextText;
use crate::patterns::UnsafePatterns;
use crate::types::{Rejection, Subject, ValidationResult};
use std::sync::Arc;

pub const MIN_INPUT_CHARS: usize = 3;
pub const MAX_INPUT_CHARS: usize = 1000;
pub const MIN_OUTPUT_CHARS: usize = 10;
pub const MAX_OUTPUT_CHARS: usize = 5000;

/// Stateless validator over a shared pattern set.
#[derive(Debug, Clone)]
pub struct Guardrails {
    patterns: Arc<UnsafePatterns>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self::new(UnsafePatterns::shared_default())
    }
}

impl Guardrails {
    pub fn new(patterns: Arc<UnsafePatterns>) -> Self {
        Self { patterns }
    }

    /// Check raw or sanitized user input.
    ///
    /// Order: too short (trimmed), unsafe content, too long.
    pub fn validate_input(&self, text: &str) -> ValidationResult {
        if text.trim().chars().count() < MIN_INPUT_CHARS {
            return Err(Rejection::TooShort(Subject::Query));
        }
        if self.patterns.is_match(text) {
            return Err(Rejection::UnsafeContent(Subject::Query));
        }
        if text.chars().count() > MAX_INPUT_CHARS {
            return Err(Rejection::TooLong(Subject::Query));
        }
        Ok(())
    }

    /// Redact every unsafe substring. Never fails and is idempotent; the
    /// result still has to pass [`Guardrails::validate_input`].
    pub fn sanitize_input(&self, text: &str) -> String {
        self.patterns.redact(text)
    }

    /// Check generated text (and each context item's text).
    pub fn validate_output(&self, text: &str) -> ValidationResult {
        if text.trim().chars().count() < MIN_OUTPUT_CHARS {
            return Err(Rejection::TooShort(Subject::Response));
        }
        if self.patterns.is_match(text) {
            return Err(Rejection::UnsafeContent(Subject::Response));
        }
        if text.chars().count() > MAX_OUTPUT_CHARS {
            return Err(Rejection::TooLong(Subject::Response));
        }
        Ok(())
    }

    /// Check context items in input order; the first failing item decides.
    pub fn validate_context<T: ContextText>(&self, items: &[T]) -> ValidationResult {
        if items.is_empty() {
            return Err(Rejection::EmptyContext);
        }

        for (position, item) in items.iter().enumerate() {
            let text = item.context_text()?;
            if let Err(reason) = self.validate_output(text) {
                tracing::debug!("Context item {} rejected: {}", position + 1, reason);
                return Err(Rejection::InvalidContextContent(Box::new(reason)));
            }
        }

        Ok(())
    }
}
