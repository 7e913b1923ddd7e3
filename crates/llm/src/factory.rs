//! LLM provider factory.
//!
//! Creates LLM clients from a provider name, resolving the default endpoint
//! and enforcing credential requirements.

use crate::client::LlmClient;
use crate::providers::{openai, OllamaClient, OpenAiCompatClient, DEFAULT_TIMEOUT};
use std::sync::Arc;
use std::time::Duration;

/// Optional knobs for client creation.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions<'a> {
    /// Custom endpoint URL
    pub endpoint: Option<&'a str>,
    /// API key (for providers that require it)
    pub api_key: Option<&'a str>,
    /// Request timeout
    pub timeout: Option<Duration>,
}

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("ollama", "openai", "groq")
/// * `options` - Endpoint, credential and timeout overrides
///
/// # Errors
/// Returns a message if the provider is unknown, a required API key is
/// missing, or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    options: ClientOptions<'_>,
) -> Result<Arc<dyn LlmClient>, String> {
    let timeout = options.timeout.unwrap_or(DEFAULT_TIMEOUT);

    match provider.to_lowercase().as_str() {
        "ollama" => {
            let base_url = options.endpoint.unwrap_or("http://localhost:11434");
            let client =
                OllamaClient::with_base_url(base_url, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        "openai" | "groq" => {
            let name = provider.to_lowercase();
            let api_key = options
                .api_key
                .ok_or_else(|| format!("{} provider requires API key", name))?;
            let default_url = if name == "groq" {
                openai::GROQ_URL
            } else {
                openai::OPENAI_URL
            };
            let client = OpenAiCompatClient::new(
                name.clone(),
                options.endpoint.unwrap_or(default_url),
                api_key,
                Some(timeout),
            )
            .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        _ => Err(format!("Unknown provider: {}", provider)),
    }
}
