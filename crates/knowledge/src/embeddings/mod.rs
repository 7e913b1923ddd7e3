//! Embedding providers used to index and query knowledge base passages.
//!
//! # Providers
//! - **mock**: deterministic hashed-trigram vectors, no network
//! - **ollama**: `/api/embeddings` on a local Ollama runtime

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
