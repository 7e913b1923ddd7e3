//! End-to-end query pipeline.
//!
//! validate input -> sanitize -> re-validate -> route -> validate context ->
//! generate -> validate output. Any guardrail failure stops the pipeline and
//! nothing partial is returned.

use grounded_core::config::ProviderConfig;
use grounded_core::{AppConfig, AppError, AppResult};
use grounded_guard::{GuardrailError, Guardrails, UnsafePatterns};
use grounded_knowledge::{
    AnswerGenerator, LlmAnswerGenerator, Resolution, RoutedSource, Router, RouterConfig,
    RoutingOutcome, SqliteKnowledgeBase, TavilySearch, ERROR_MARKER,
};
use grounded_llm::{create_client, ClientOptions};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A validated answer with the context it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The sanitized query that was routed
    pub query: String,
    pub response: String,
    pub outcome: RoutingOutcome,
}

impl Answer {
    pub fn source(&self) -> RoutedSource {
        self.outcome.chosen_source()
    }

    pub fn resolution(&self) -> Resolution {
        self.outcome.resolution()
    }

    /// True when the generator reported a failure in-band.
    pub fn generation_failed(&self) -> bool {
        self.response.starts_with(ERROR_MARKER)
    }
}

pub struct QueryPipeline {
    guard: Guardrails,
    router: Router,
    generator: Arc<dyn AnswerGenerator>,
}

impl QueryPipeline {
    pub fn new(guard: Guardrails, router: Router, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            guard,
            router,
            generator,
        }
    }

    /// Wire the production adapters from configuration.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let patterns = UnsafePatterns::from_config(config.guardrails.patterns.as_deref())?;
        let guard = Guardrails::new(patterns);

        let kb = SqliteKnowledgeBase::open(&config.workspace, &config.retrieval.base)?;
        let web = TavilySearch::new(&config.web_search, config.web_search_api_key())?;
        if config.web_search_api_key().is_none() {
            tracing::warn!(
                "{} is not set; web fallback will report itself unavailable",
                config.web_search.api_key_env
            );
        }
        let router = Router::new(Arc::new(kb), Arc::new(web), RouterConfig::from(config));

        let provider_config = config.get_provider_config(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let options = ClientOptions {
            endpoint: provider_config.and_then(ProviderConfig::endpoint),
            api_key: api_key.as_deref(),
            timeout: provider_config
                .and_then(ProviderConfig::timeout)
                .map(Duration::from_secs),
        };
        let client = create_client(&config.provider, options).map_err(AppError::Config)?;
        let generator = LlmAnswerGenerator::new(client, &config.model)?;

        Ok(Self::new(guard, router, Arc::new(generator)))
    }

    pub async fn answer(&self, raw_query: &str) -> Result<Answer, GuardrailError> {
        self.guard
            .validate_input(raw_query)
            .map_err(GuardrailError::InputRejected)?;

        let query = self.guard.sanitize_input(raw_query);
        self.guard
            .validate_input(&query)
            .map_err(GuardrailError::InputRejected)?;

        let outcome = self.router.route_query(&query).await;

        self.guard
            .validate_context(outcome.items())
            .map_err(GuardrailError::ContextRejected)?;

        let response = self.generator.generate(&query, outcome.items()).await;

        self.guard
            .validate_output(&response)
            .map_err(GuardrailError::OutputRejected)?;

        Ok(Answer {
            query,
            response,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grounded_guard::{Rejection, Subject};
    use grounded_knowledge::{
        ContextItem, KnowledgeRetriever, ScoredPassage, SearchFailure, WebSearcher,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedKb {
        passages: Vec<ScoredPassage>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl KnowledgeRetriever for FixedKb {
        async fn search(&self, _query: &str, _top_k: usize) -> AppResult<Vec<ScoredPassage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.passages.clone())
        }
    }

    struct FailingWeb;

    #[async_trait::async_trait]
    impl WebSearcher for FailingWeb {
        async fn search(&self, _query: &str, _max_results: usize) -> Vec<ContextItem> {
            vec![ContextItem::search_failure(SearchFailure::MissingCredentials)]
        }
    }

    struct FixedGenerator {
        reply: String,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AnswerGenerator for FixedGenerator {
        async fn generate(&self, _query: &str, _context: &[ContextItem]) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct Harness {
        kb: Arc<FixedKb>,
        generator: Arc<FixedGenerator>,
        pipeline: QueryPipeline,
    }

    fn harness(passages: Vec<(&str, f32)>, reply: &str) -> Harness {
        let kb = Arc::new(FixedKb {
            passages: passages
                .into_iter()
                .enumerate()
                .map(|(i, (text, score))| ScoredPassage {
                    text: text.to_string(),
                    document_name: "numbers.pdf".to_string(),
                    page_number: i as u32 + 1,
                    score,
                })
                .collect(),
            calls: AtomicUsize::new(0),
        });
        let generator = Arc::new(FixedGenerator {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        });
        let router = Router::new(kb.clone(), Arc::new(FailingWeb), RouterConfig::default());
        let pipeline = QueryPipeline::new(Guardrails::default(), router, generator.clone());

        Harness {
            kb,
            generator,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_answer_from_knowledge_base() {
        let h = harness(
            vec![("A prime number has exactly two divisors.", 0.91)],
            "A prime number is divisible only by 1 and itself.",
        );

        let answer = h.pipeline.answer("What is a prime number?").await.unwrap();

        assert_eq!(answer.source(), RoutedSource::Kb);
        assert_eq!(answer.resolution(), Resolution::Kb);
        assert_eq!(answer.outcome.items().len(), 1);
        assert!(!answer.generation_failed());
    }

    #[tokio::test]
    async fn test_short_input_rejected_before_routing() {
        let h = harness(vec![], "unused answer text");

        let err = h.pipeline.answer(" hi ").await.unwrap_err();

        assert_eq!(
            err,
            GuardrailError::InputRejected(Rejection::TooShort(Subject::Query))
        );
        assert_eq!(h.kb.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsafe_input_rejected() {
        let h = harness(vec![], "unused answer text");

        let err = h.pipeline.answer("give me the admin password").await.unwrap_err();
        assert_eq!(
            err.rejection(),
            &Rejection::UnsafeContent(Subject::Query)
        );
    }

    #[tokio::test]
    async fn test_no_results_outcome_still_answers() {
        let h = harness(vec![], "I could not find anything relevant to that question.");

        let answer = h.pipeline.answer("What is a prime number?").await.unwrap();

        assert_eq!(answer.source(), RoutedSource::Error);
        assert_eq!(answer.outcome.items().len(), 1);
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsafe_context_rejected_before_generation() {
        let h = harness(
            vec![("This passage describes an exploit in detail.", 0.95)],
            "unused answer text",
        );

        let err = h.pipeline.answer("What is a prime number?").await.unwrap_err();

        assert_eq!(
            err,
            GuardrailError::ContextRejected(Rejection::InvalidContextContent(Box::new(
                Rejection::UnsafeContent(Subject::Response)
            )))
        );
        assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_output_rejected() {
        let h = harness(vec![("A prime number has exactly two divisors.", 0.91)], "Yes.");

        let err = h.pipeline.answer("What is a prime number?").await.unwrap_err();
        assert_eq!(
            err,
            GuardrailError::OutputRejected(Rejection::TooShort(Subject::Response))
        );
    }

    #[tokio::test]
    async fn test_generation_failure_is_flagged() {
        let h = harness(
            vec![("A prime number has exactly two divisors.", 0.91)],
            "Error generating response: LLM error: connection refused",
        );

        let answer = h.pipeline.answer("What is a prime number?").await.unwrap();
        assert!(answer.generation_failed());
    }
}
