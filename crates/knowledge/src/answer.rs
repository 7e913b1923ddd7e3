//! Answer generation from routed context.

use crate::types::ContextItem;
use grounded_core::{AppError, AppResult};
use grounded_llm::{LlmClient, LlmRequest};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;

/// Prefix of every generated text that reports a generation failure.
pub const ERROR_MARKER: &str = "Error generating response";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that provides accurate and concise answers based on the given context.
Follow these guidelines:
1. Only use information from the provided context
2. If the context doesn't contain enough information, say so
3. Be precise and avoid speculation
4. Format your response in a clear, readable way
5. If the question is unclear, ask for clarification
6. For mathematical content, use proper notation and show steps clearly";

const CONTEXT_TEMPLATE: &str = "Context:
{{#each items}}
Context {{this.position}}: {{this.text}}
{{#with this.source}}Source: {{value}}
{{/with}}{{#with this.page}}Page: {{value}}
{{/with}}{{#with this.url}}URL: {{value}}
{{/with}}
{{/each}}

Question: {{query}}";

/// Produces an answer for a query from its context.
///
/// Failures are reported in-band: the returned text starts with
/// [`ERROR_MARKER`] and is expected to fail output validation downstream.
#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, context: &[ContextItem]) -> String;
}

/// Wraps a provenance field so presence, not truthiness, decides whether a
/// line is rendered. Page `0` and an empty document name still show.
#[derive(Serialize)]
struct Field<T> {
    value: T,
}

impl<T> Field<T> {
    fn wrap(value: Option<T>) -> Option<Self> {
        value.map(|value| Self { value })
    }
}

#[derive(Serialize)]
struct ContextView<'a> {
    position: usize,
    text: &'a str,
    source: Option<Field<&'a str>>,
    page: Option<Field<u32>>,
    url: Option<Field<&'a str>>,
}

#[derive(Serialize)]
struct PromptView<'a> {
    query: &'a str,
    items: Vec<ContextView<'a>>,
}

/// LLM-backed answer generator.
pub struct LlmAnswerGenerator {
    client: Arc<dyn LlmClient>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    registry: Handlebars<'static>,
}

impl LlmAnswerGenerator {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string("context", CONTEXT_TEMPLATE)
            .map_err(|e| AppError::Llm(format!("Failed to register template: {}", e)))?;

        Ok(Self {
            client,
            model: model.into(),
            temperature: 0.1,
            max_tokens: 1024,
            registry,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Render the user prompt: numbered context blocks, then the question.
    pub fn render_prompt(&self, query: &str, context: &[ContextItem]) -> AppResult<String> {
        let view = PromptView {
            query,
            items: context
                .iter()
                .enumerate()
                .map(|(i, item)| ContextView {
                    position: i + 1,
                    text: &item.text,
                    source: Field::wrap(item.document_name()),
                    page: Field::wrap(item.page_number()),
                    url: Field::wrap(item.url()),
                })
                .collect(),
        };

        self.registry
            .render("context", &view)
            .map_err(|e| AppError::Llm(format!("Failed to render template: {}", e)))
    }

    async fn try_generate(&self, query: &str, context: &[ContextItem]) -> AppResult<String> {
        let prompt = self.render_prompt(query, context)?;
        let request = LlmRequest::new(prompt, &self.model)
            .with_system(SYSTEM_PROMPT)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.client.complete(&request).await?;
        tracing::debug!(
            "Generated answer with {} ({} tokens)",
            response.model,
            response.usage.total_tokens
        );
        Ok(response.content)
    }
}

#[async_trait::async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, query: &str, context: &[ContextItem]) -> String {
        match self.try_generate(query, context).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                format!("{}: {}", ERROR_MARKER, e)
            }
        }
    }
}
