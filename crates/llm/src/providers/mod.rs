//! LLM provider implementations.

pub mod ollama;
pub mod openai;

pub use ollama::OllamaClient;
pub use openai::OpenAiCompatClient;

use grounded_core::{AppError, AppResult};
use std::time::Duration;

/// Default request timeout for completion calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Build an HTTP client with a bounded request timeout.
pub(crate) fn http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Llm(format!("Failed to create HTTP client: {}", e)))
}
