//! Guardrail rejection types.

use grounded_core::AppError;
use std::fmt;
use thiserror::Error;

/// What kind of text a length or content check was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Query,
    Response,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Query => f.write_str("Query"),
            Subject::Response => f.write_str("Response"),
        }
    }
}

/// Why a single guardrail check failed. `Display` is the human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{0} is too short")]
    TooShort(Subject),

    #[error("{0} is too long")]
    TooLong(Subject),

    #[error("{0} contains potentially harmful content")]
    UnsafeContent(Subject),

    #[error("No context retrieved")]
    EmptyContext,

    #[error("Invalid context format")]
    MalformedItem,

    #[error("Missing text in context")]
    MissingText,

    /// The first context item whose text failed output validation.
    #[error("Invalid context content: {0}")]
    InvalidContextContent(Box<Rejection>),
}

/// Outcome of one check: `Ok(())` passes, `Err` carries the reason.
pub type ValidationResult = Result<(), Rejection>;

/// Which trust boundary stopped the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardrailError {
    #[error("Input rejected: {0}")]
    InputRejected(Rejection),

    #[error("Context rejected: {0}")]
    ContextRejected(Rejection),

    #[error("Output rejected: {0}")]
    OutputRejected(Rejection),
}

impl GuardrailError {
    pub fn rejection(&self) -> &Rejection {
        match self {
            GuardrailError::InputRejected(r)
            | GuardrailError::ContextRejected(r)
            | GuardrailError::OutputRejected(r) => r,
        }
    }
}

impl From<GuardrailError> for AppError {
    fn from(err: GuardrailError) -> Self {
        AppError::Guardrail(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_messages() {
        assert_eq!(Rejection::TooShort(Subject::Query).to_string(), "Query is too short");
        assert_eq!(
            Rejection::UnsafeContent(Subject::Response).to_string(),
            "Response contains potentially harmful content"
        );
        assert_eq!(Rejection::EmptyContext.to_string(), "No context retrieved");
        assert_eq!(
            Rejection::InvalidContextContent(Box::new(Rejection::TooShort(Subject::Response)))
                .to_string(),
            "Invalid context content: Response is too short"
        );
    }

    #[test]
    fn test_guardrail_error_into_app_error() {
        let err: AppError = GuardrailError::InputRejected(Rejection::TooLong(Subject::Query)).into();
        assert_eq!(
            err.to_string(),
            "Guardrail rejection: Input rejected: Query is too long"
        );
    }

    #[test]
    fn test_rejection_accessor() {
        let err = GuardrailError::ContextRejected(Rejection::EmptyContext);
        assert_eq!(err.rejection(), &Rejection::EmptyContext);
    }
}
