//! Web search adapter over the Tavily search API.
//!
//! Every failure (missing credentials, HTTP status, timeout, connectivity,
//! unreadable body) degrades to exactly one synthetic item carrying a
//! `SearchFailure` marker and score `0.0`. A successful search with no
//! usable hits returns an empty list.

use crate::types::{ContextItem, ContextOrigin, SearchFailure, WebRef};
use chrono::Utc;
use grounded_core::config::WebSearchConfig;
use grounded_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Keyword/semantic web search.
///
/// Implementations never fail; see the module docs for the degrade contract.
#[async_trait::async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<ContextItem>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: String,
    max_results: usize,
    search_depth: &'a str,
    include_answer: bool,
    #[serde(skip_serializing_if = "no_domains")]
    include_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

#[derive(Debug, Deserialize)]
pub struct TavilyResponse {
    #[serde(default)]
    pub results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
pub struct TavilyResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: f32,
}

/// Tavily-backed web searcher.
pub struct TavilySearch {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    search_depth: String,
    include_domains: Vec<String>,
    query_prefix: Option<String>,
}

impl TavilySearch {
    /// Build a searcher from configuration. A missing key is not an error;
    /// searches then degrade to a `MissingCredentials` item.
    pub fn new(config: &WebSearchConfig, api_key: Option<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            search_depth: config.search_depth.clone(),
            include_domains: config.include_domains.clone(),
            query_prefix: config.query_prefix.clone(),
        })
    }

    fn effective_query(&self, query: &str) -> String {
        match &self.query_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{} {}", prefix, query),
            _ => query.to_string(),
        }
    }

    async fn request(
        &self,
        api_key: &str,
        query: &str,
        max_results: usize,
    ) -> Result<TavilyResponse, SearchFailure> {
        let body = TavilyRequest {
            query: self.effective_query(query),
            max_results,
            search_depth: &self.search_depth,
            include_answer: true,
            include_domains: &self.include_domains,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchFailure::Http {
                status: status.as_u16(),
            });
        }

        response.json::<TavilyResponse>().await.map_err(|e| {
            tracing::error!("Failed to parse web search response: {}", e);
            SearchFailure::InvalidResponse
        })
    }
}

fn classify_transport_error(e: &reqwest::Error) -> SearchFailure {
    if e.is_timeout() {
        SearchFailure::Timeout
    } else {
        SearchFailure::Connection
    }
}

#[async_trait::async_trait]
impl WebSearcher for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<ContextItem> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("Web search API key not set. Web search functionality disabled.");
            return vec![ContextItem::search_failure(SearchFailure::MissingCredentials)];
        };

        match self.request(api_key, query, max_results).await {
            Ok(response) => {
                let items = parse_results(response);
                tracing::debug!("Web search returned {} results", items.len());
                items
            }
            Err(failure) => {
                tracing::error!("Web search failed: {}", failure);
                vec![ContextItem::search_failure(failure)]
            }
        }
    }
}

/// Map provider results into web context items, dropping empty snippets.
pub fn parse_results(response: TavilyResponse) -> Vec<ContextItem> {
    let now = Utc::now();
    response
        .results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(|r| ContextItem {
            text: r.content,
            score: r.score,
            origin: ContextOrigin::Web(WebRef {
                domain: extract_domain(&r.url),
                title: r.title,
                url: r.url,
                timestamp: Some(now),
                failure: None,
            }),
        })
        .collect()
}

/// Host part of an absolute http(s) URL.
pub fn extract_domain(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    parsed.host_str().map(str::to_string)
}
