//! Error types for Grounded.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, LLM, retrieval, web search,
//! guardrail rejections and feedback persistence.

use thiserror::Error;

/// Unified error type for Grounded.
///
/// Fallible functions return `Result<T, AppError>`. Adapter failures are
/// absorbed by the router and never reach the caller as this type; guardrail
/// rejections do, through the `Guardrail` variant.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Knowledge base lookup errors (index, embeddings)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Web search provider errors
    #[error("Search error: {0}")]
    Search(String),

    /// A guardrail rejected a value at a trust boundary
    #[error("Guardrail rejection: {0}")]
    Guardrail(String),

    /// Feedback log errors
    #[error("Feedback error: {0}")]
    Feedback(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = AppError::Guardrail("Query is too short".to_string());
        assert_eq!(err.to_string(), "Guardrail rejection: Query is too short");

        let err = AppError::Other("plain".to_string());
        assert_eq!(err.to_string(), "plain");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
