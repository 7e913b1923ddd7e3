//! Retrieval routing for grounded question answering.
//!
//! A query is first matched against a local knowledge base; when the best
//! passage falls below the similarity threshold the router falls back to a
//! web search, and when both come up empty it resolves to a single
//! explanatory item. The chosen context feeds answer generation and is
//! persisted with user feedback.

pub mod answer;
pub mod config;
pub mod embeddings;
pub mod feedback;
pub mod index;
pub mod merge;
pub mod retriever;
pub mod router;
pub mod types;
pub mod web;


// Re-export commonly used types
pub use answer::{AnswerGenerator, LlmAnswerGenerator, ERROR_MARKER};
pub use config::KnowledgeBaseConfig;
pub use feedback::{FeedbackAnalysis, FeedbackLog, FeedbackRecord};
pub use merge::merge;
pub use retriever::{BaseStats, KnowledgeRetriever, SqliteKnowledgeBase};
pub use router::{Router, RouterConfig};
pub use types::{
    ContextItem, ContextOrigin, DocumentRef, Resolution, RoutedSource, RoutingOutcome,
    ScoredPassage, SearchFailure, SourceTag, WebRef,
};
pub use web::{TavilySearch, WebSearcher};
