//! Context and routing data model shared by the adapters, merger and router.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed message carried by the synthetic item of an `error` outcome.
pub const NO_RESULTS_MESSAGE: &str = "Sorry, I couldn't find any relevant information for your query. Please try asking a different question or providing more details.";

/// Title of the synthetic item of an `error` outcome.
pub const NO_RESULTS_TITLE: &str = "No Results Found";

/// One retrieved passage plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub text: String,
    pub score: f32,
    #[serde(flatten)]
    pub origin: ContextOrigin,
}

/// Provenance of a context item, discriminated by `source_tag`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_tag", rename_all = "snake_case")]
pub enum ContextOrigin {
    KnowledgeBase(DocumentRef),
    Web(WebRef),
    /// Synthetic explanation emitted when no source produced usable context.
    Error { title: String },
}

/// Knowledge base passage provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_name: String,
    pub page_number: u32,
}

/// Web search result provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebRef {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Present only on the synthetic item a failed search degrades to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<SearchFailure>,
}

/// Why a web search degraded to a single explanatory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchFailure {
    #[error("Web search is currently unavailable: no API key is configured")]
    MissingCredentials,

    #[error("Web search encountered an HTTP error: {}", http_detail(.status))]
    Http { status: u16 },

    #[error("Web search timed out. Falling back to knowledge base only.")]
    Timeout,

    #[error("Web search could not reach the provider. Falling back to knowledge base only.")]
    Connection,

    #[error("Web search returned a response that could not be read")]
    InvalidResponse,
}

fn http_detail(status: &u16) -> String {
    match *status {
        401 => "invalid or missing API key (status 401)".to_string(),
        404 => "search endpoint not found (status 404)".to_string(),
        429 => "rate limit exceeded (status 429)".to_string(),
        other => format!("Status code: {}", other),
    }
}

/// The discriminator of an item's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    KnowledgeBase,
    Web,
    Error,
}

impl ContextItem {
    /// Build a knowledge base item.
    pub fn from_document(
        text: impl Into<String>,
        score: f32,
        document_name: impl Into<String>,
        page_number: u32,
    ) -> Self {
        Self {
            text: text.into(),
            score,
            origin: ContextOrigin::KnowledgeBase(DocumentRef {
                document_name: document_name.into(),
                page_number,
            }),
        }
    }

    /// Build a genuine web result item.
    pub fn from_web(
        text: impl Into<String>,
        score: f32,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            score,
            origin: ContextOrigin::Web(WebRef {
                title: title.into(),
                url: url.into(),
                domain: None,
                timestamp: None,
                failure: None,
            }),
        }
    }

    /// Build the single item a failed web search degrades to.
    pub fn search_failure(failure: SearchFailure) -> Self {
        let title = match failure {
            SearchFailure::MissingCredentials => "API Key Not Found",
            _ => "Search Error",
        };
        Self {
            text: failure.to_string(),
            score: 0.0,
            origin: ContextOrigin::Web(WebRef {
                title: title.to_string(),
                url: String::new(),
                domain: None,
                timestamp: Some(Utc::now()),
                failure: Some(failure),
            }),
        }
    }

    /// Build the synthetic "no relevant information" item.
    pub fn no_results() -> Self {
        Self {
            text: NO_RESULTS_MESSAGE.to_string(),
            score: 0.0,
            origin: ContextOrigin::Error {
                title: NO_RESULTS_TITLE.to_string(),
            },
        }
    }

    pub fn source_tag(&self) -> SourceTag {
        match self.origin {
            ContextOrigin::KnowledgeBase(_) => SourceTag::KnowledgeBase,
            ContextOrigin::Web(_) => SourceTag::Web,
            ContextOrigin::Error { .. } => SourceTag::Error,
        }
    }

    /// True only for the synthetic item of a degraded web search.
    pub fn is_search_failure(&self) -> bool {
        matches!(
            self.origin,
            ContextOrigin::Web(WebRef {
                failure: Some(_),
                ..
            })
        )
    }

    pub fn document_name(&self) -> Option<&str> {
        match &self.origin {
            ContextOrigin::KnowledgeBase(doc) => Some(&doc.document_name),
            _ => None,
        }
    }

    pub fn page_number(&self) -> Option<u32> {
        match &self.origin {
            ContextOrigin::KnowledgeBase(doc) => Some(doc.page_number),
            _ => None,
        }
    }

    /// URL of a web item; empty URLs count as absent.
    pub fn url(&self) -> Option<&str> {
        match &self.origin {
            ContextOrigin::Web(web) if !web.url.is_empty() => Some(&web.url),
            _ => None,
        }
    }
}

/// A passage returned by the knowledge retriever, before routing.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPassage {
    pub text: String,
    pub document_name: String,
    pub page_number: u32,
    pub score: f32,
}

impl ScoredPassage {
    pub fn into_context_item(self) -> ContextItem {
        ContextItem::from_document(self.text, self.score, self.document_name, self.page_number)
    }
}

/// Source reported to callers and persisted with feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutedSource {
    Kb,
    Web,
    Error,
}

impl RoutedSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutedSource::Kb => "kb",
            RoutedSource::Web => "web",
            RoutedSource::Error => "error",
        }
    }
}

impl std::fmt::Display for RoutedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of the router's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Knowledge base met the similarity threshold.
    Kb,
    /// Knowledge base was insufficient and web search succeeded.
    Web,
    /// Web search failed, below-threshold knowledge base results were used.
    KbFallback,
    /// Neither source produced anything.
    Error,
}

impl Resolution {
    pub fn chosen_source(&self) -> RoutedSource {
        match self {
            Resolution::Kb | Resolution::KbFallback => RoutedSource::Kb,
            Resolution::Web => RoutedSource::Web,
            Resolution::Error => RoutedSource::Error,
        }
    }
}

/// Result of routing one query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingOutcome {
    resolution: Resolution,
    chosen_source: RoutedSource,
    items: Vec<ContextItem>,
}

impl RoutingOutcome {
    pub(crate) fn new(resolution: Resolution, items: Vec<ContextItem>) -> Self {
        Self {
            resolution,
            chosen_source: resolution.chosen_source(),
            items,
        }
    }

    /// The `error` outcome always carries exactly one synthetic item.
    pub(crate) fn no_results() -> Self {
        Self::new(Resolution::Error, vec![ContextItem::no_results()])
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn chosen_source(&self) -> RoutedSource {
        self.chosen_source
    }

    pub fn items(&self) -> &[ContextItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ContextItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_item_serializes_source_tag() {
        let item = ContextItem::from_document("Pythagoras", 0.9, "geometry.pdf", 4);
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["source_tag"], "knowledge_base");
        assert_eq!(json["document_name"], "geometry.pdf");
        assert_eq!(json["page_number"], 4);
        assert_eq!(json["text"], "Pythagoras");
    }

    #[test]
    fn test_context_item_deserializes_web() {
        let item: ContextItem = serde_json::from_str(
            r#"{"text":"t","score":1.5,"source_tag":"web","title":"T","url":"https://a.org/x"}"#,
        )
        .unwrap();

        assert_eq!(item.source_tag(), SourceTag::Web);
        assert_eq!(item.url(), Some("https://a.org/x"));
        assert!(!item.is_search_failure());
    }

    #[test]
    fn test_search_failure_item_is_marked() {
        let item = ContextItem::search_failure(SearchFailure::Http { status: 429 });
        assert!(item.is_search_failure());
        assert_eq!(item.score, 0.0);
        assert!(item.text.contains("rate limit"));
        assert_eq!(item.url(), None);
    }

    #[test]
    fn test_genuine_zero_score_web_item_is_not_failure() {
        let item = ContextItem::from_web("Search Error handling in Rust", 0.0, "Search Error", "");
        assert!(!item.is_search_failure());
    }

    #[test]
    fn test_resolution_maps_to_chosen_source() {
        assert_eq!(Resolution::KbFallback.chosen_source(), RoutedSource::Kb);
        assert_eq!(Resolution::Web.chosen_source(), RoutedSource::Web);
        assert_eq!(Resolution::Error.chosen_source().to_string(), "error");
    }

    #[test]
    fn test_no_results_outcome_has_single_item() {
        let outcome = RoutingOutcome::no_results();
        assert_eq!(outcome.chosen_source(), RoutedSource::Error);
        assert_eq!(outcome.items().len(), 1);
        assert_eq!(outcome.items()[0].text, NO_RESULTS_MESSAGE);
        assert_eq!(outcome.items()[0].source_tag(), SourceTag::Error);
    }
}
