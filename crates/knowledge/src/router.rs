//! Source-selection router.
//!
//! State machine per query:
//!
//! ```text
//! Start -> KbQueried -> KbAccepted                      -> Resolved(kb)
//!                    -> KbBelowThreshold -> WebQueried  -> Resolved(web)
//!                                                       -> Resolved(kb-fallback)
//!                                                       -> Resolved(error)
//! ```
//!
//! The web adapter is only called once the knowledge base is known to be
//! insufficient. Adapter failures and timeouts never leave this module; they
//! shape the outcome instead.

use crate::merge::merge;
use crate::retriever::KnowledgeRetriever;
use crate::types::{ContextItem, Resolution, RoutingOutcome, ScoredPassage, SearchFailure};
use crate::web::WebSearcher;
use grounded_core::AppConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Routing parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Inclusive minimum top score for accepting knowledge base results
    pub similarity_threshold: f32,
    pub top_k: usize,
    pub max_results: usize,
    pub kb_timeout: Duration,
    pub web_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            top_k: 3,
            max_results: 5,
            kb_timeout: Duration::from_secs(10),
            web_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&AppConfig> for RouterConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            similarity_threshold: config.retrieval.similarity_threshold,
            top_k: config.retrieval.top_k,
            max_results: config.web_search.max_results,
            kb_timeout: Duration::from_secs(config.retrieval.timeout_secs),
            web_timeout: Duration::from_secs(config.web_search.timeout_secs),
        }
    }
}

/// Chooses between knowledge base and web context for a query.
pub struct Router {
    kb: Arc<dyn KnowledgeRetriever>,
    web: Arc<dyn WebSearcher>,
    config: RouterConfig,
}

impl Router {
    pub fn new(
        kb: Arc<dyn KnowledgeRetriever>,
        web: Arc<dyn WebSearcher>,
        config: RouterConfig,
    ) -> Self {
        Self { kb, web, config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Route a (sanitized) query to a single context source.
    pub async fn route_query(&self, query: &str) -> RoutingOutcome {
        let kb_items = self.query_knowledge_base(query).await;
        tracing::debug!("Router state: KbQueried ({} passages)", kb_items.len());

        if self.meets_threshold(&kb_items) {
            tracing::debug!("Router state: KbAccepted");
            return resolve(Resolution::Kb, sort_by_score(kb_items));
        }
        tracing::debug!(
            "Router state: KbBelowThreshold (threshold {:.2})",
            self.config.similarity_threshold
        );

        let web_items = self.query_web(query).await;
        tracing::debug!("Router state: WebQueried ({} items)", web_items.len());

        if !is_failed_search(&web_items) {
            return resolve(Resolution::Web, merge([web_items]));
        }

        if !kb_items.is_empty() {
            return resolve(Resolution::KbFallback, sort_by_score(kb_items));
        }

        let outcome = RoutingOutcome::no_results();
        tracing::info!("Query resolved to error: no source produced context");
        outcome
    }

    /// Merge both result lists regardless of threshold.
    ///
    /// Knowledge base and web scores live on different scales and are
    /// sorted together without normalization.
    pub fn get_combined_context(
        kb_items: Vec<ContextItem>,
        web_items: Vec<ContextItem>,
    ) -> Vec<ContextItem> {
        merge([kb_items, web_items])
    }

    fn meets_threshold(&self, items: &[ContextItem]) -> bool {
        items
            .iter()
            .map(|item| item.score)
            .max_by(f32::total_cmp)
            .is_some_and(|max_score| max_score >= self.config.similarity_threshold)
    }

    async fn query_knowledge_base(&self, query: &str) -> Vec<ContextItem> {
        let passages: Vec<ScoredPassage> =
            match timeout(self.config.kb_timeout, self.kb.search(query, self.config.top_k)).await {
                Ok(Ok(passages)) => passages,
                Ok(Err(e)) => {
                    tracing::warn!("Knowledge base unavailable, treating as no match: {}", e);
                    Vec::new()
                }
                Err(_) => {
                    tracing::warn!(
                        "Knowledge base search timed out after {:?}, treating as no match",
                        self.config.kb_timeout
                    );
                    Vec::new()
                }
            };

        passages
            .into_iter()
            .filter(|p| !p.text.trim().is_empty())
            .map(ScoredPassage::into_context_item)
            .collect()
    }

    async fn query_web(&self, query: &str) -> Vec<ContextItem> {
        let items = match timeout(
            self.config.web_timeout,
            self.web.search(query, self.config.max_results),
        )
        .await
        {
            Ok(items) => items,
            Err(_) => {
                tracing::warn!("Web search timed out after {:?}", self.config.web_timeout);
                return vec![ContextItem::search_failure(SearchFailure::Timeout)];
            }
        };

        if is_failed_search(&items) {
            if let Some(item) = items.first() {
                tracing::warn!("Web search degraded: {}", item.text);
            }
            return items;
        }

        items
            .into_iter()
            .filter(|item| !item.text.trim().is_empty())
            .collect()
    }
}

/// A web search failed if it produced nothing, or exactly one item that
/// carries a failure marker.
fn is_failed_search(items: &[ContextItem]) -> bool {
    match items {
        [] => true,
        [only] => only.is_search_failure(),
        _ => false,
    }
}

fn sort_by_score(mut items: Vec<ContextItem>) -> Vec<ContextItem> {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items
}

fn resolve(resolution: Resolution, items: Vec<ContextItem>) -> RoutingOutcome {
    let outcome = RoutingOutcome::new(resolution, items);
    tracing::info!(
        "Query resolved to {:?} (source '{}', {} items)",
        resolution,
        outcome.chosen_source(),
        outcome.items().len()
    );
    outcome
}
