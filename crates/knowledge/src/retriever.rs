//! Knowledge retriever adapter: similarity search over a local passage index.

use crate::config::{self, KnowledgeBaseConfig};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::index::{self, StoredPassage};
use crate::types::ScoredPassage;
use grounded_core::{AppError, AppResult};
use rusqlite::Connection;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Similarity search over a knowledge base.
///
/// Implementations return passages sorted by score descending. Errors are
/// reported as `AppError::Retrieval`; the router absorbs them into an empty
/// result set.
#[async_trait::async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredPassage>>;
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct BaseStats {
    pub base_name: String,
    pub documents_count: u32,
    pub passages_count: u32,
    pub db_size_bytes: u64,
    pub provider: String,
    pub model: String,
}

/// Knowledge base backed by `.grounded/knowledge/<base>/index.sqlite`.
pub struct SqliteKnowledgeBase {
    config: KnowledgeBaseConfig,
    index_path: PathBuf,
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteKnowledgeBase {
    /// Open (creating if needed) the named base in `workspace`.
    pub fn open(workspace: &Path, base_name: &str) -> AppResult<Self> {
        let config = config::load_config(workspace, base_name)?;
        let embedder = create_provider(&config)?;
        let index_path = config::get_index_path(workspace, base_name);
        let conn = index::init_index(&index_path)?;

        if !config::get_config_path(workspace, base_name).exists() {
            config::save_config(workspace, &config)?;
        }

        tracing::debug!(
            "Opened knowledge base '{}' ({} / {})",
            base_name,
            config.provider,
            config.model
        );

        Ok(Self::with_parts(config, index_path, conn, embedder))
    }

    /// Assemble a base from already-open parts.
    pub fn with_parts(
        config: KnowledgeBaseConfig,
        index_path: PathBuf,
        conn: Connection,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            config,
            index_path,
            conn: Mutex::new(conn),
            embedder,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("Knowledge base index lock poisoned".to_string()))
    }

    /// Embed and store one passage. Returns the new passage id.
    pub async fn add_passage(
        &self,
        text: &str,
        document_name: &str,
        page_number: u32,
    ) -> AppResult<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Retrieval(
                "Cannot add an empty passage to the knowledge base".to_string(),
            ));
        }

        let embedding = self.embedder.embed(text).await?;
        let passage = StoredPassage {
            id: uuid::Uuid::new_v4().to_string(),
            document_name: document_name.to_string(),
            page_number,
            text: text.to_string(),
        };

        index::insert_passage(&*self.lock()?, &passage, &embedding)?;

        tracing::info!(
            "Added passage from '{}' (page {}) to knowledge base '{}'",
            document_name,
            page_number,
            self.name()
        );
        Ok(passage.id)
    }

    /// Get statistics for this base.
    pub fn stats(&self) -> AppResult<BaseStats> {
        let (documents_count, passages_count) = index::get_stats(&*self.lock()?)?;
        let db_size_bytes = std::fs::metadata(&self.index_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(BaseStats {
            base_name: self.name().to_string(),
            documents_count,
            passages_count,
            db_size_bytes,
            provider: self.embedder.provider_name().to_string(),
            model: self.embedder.model_name().to_string(),
        })
    }

    /// Delete every passage in this base.
    pub fn clean(&self) -> AppResult<()> {
        index::reset_index(&*self.lock()?)?;
        tracing::info!("Knowledge base '{}' cleaned", self.name());
        Ok(())
    }
}

#[async_trait::async_trait]
impl KnowledgeRetriever for SqliteKnowledgeBase {
    async fn search(&self, query: &str, top_k: usize) -> AppResult<Vec<ScoredPassage>> {
        let query_embedding = self.embedder.embed(query).await?;
        let results = index::query_passages(&*self.lock()?, &query_embedding, top_k)?;

        let passages: Vec<ScoredPassage> = results
            .into_iter()
            .filter(|(passage, _)| !passage.text.trim().is_empty())
            .map(|(passage, score)| ScoredPassage {
                text: passage.text,
                document_name: passage.document_name,
                page_number: passage.page_number,
                // Cosine similarity below zero carries no more signal than zero.
                score: score.clamp(0.0, 1.0),
            })
            .collect();

        if let Some(top) = passages.first() {
            tracing::debug!(
                "Knowledge base '{}' returned {} passages (top score {:.3})",
                self.name(),
                passages.len(),
                top.score
            );
        }

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_add_and_search() {
        let temp = TempDir::new().unwrap();
        let kb = SqliteKnowledgeBase::open(temp.path(), "math").unwrap();

        kb.add_passage(
            "The quadratic formula gives the roots of a quadratic equation",
            "algebra.pdf",
            12,
        )
        .await
        .unwrap();
        kb.add_passage("Photosynthesis converts light into chemical energy", "bio.pdf", 3)
            .await
            .unwrap();

        let results = kb.search("quadratic formula roots", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_name, "algebra.pdf");
        assert_eq!(results[0].page_number, 12);
        assert!(results[0].score > results[1].score);
        assert!(results.iter().all(|p| (0.0..=1.0).contains(&p.score)));
    }

    #[tokio::test]
    async fn test_open_persists_default_config() {
        let temp = TempDir::new().unwrap();
        let _kb = SqliteKnowledgeBase::open(temp.path(), "math").unwrap();

        assert!(config::get_config_path(temp.path(), "math").exists());
        assert!(config::get_index_path(temp.path(), "math").exists());
    }

    #[tokio::test]
    async fn test_empty_passage_rejected() {
        let temp = TempDir::new().unwrap();
        let kb = SqliteKnowledgeBase::open(temp.path(), "math").unwrap();

        assert!(kb.add_passage("   ", "x.pdf", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_and_clean() {
        let temp = TempDir::new().unwrap();
        let kb = SqliteKnowledgeBase::open(temp.path(), "math").unwrap();

        kb.add_passage("Euler's identity links five constants", "analysis.pdf", 1)
            .await
            .unwrap();
        kb.add_passage("The derivative of sine is cosine", "analysis.pdf", 2)
            .await
            .unwrap();

        let stats = kb.stats().unwrap();
        assert_eq!(stats.base_name, "math");
        assert_eq!(stats.documents_count, 1);
        assert_eq!(stats.passages_count, 2);
        assert_eq!(stats.provider, "mock");

        kb.clean().unwrap();
        assert_eq!(kb.stats().unwrap().passages_count, 0);
        assert!(kb.search("sine", 3).await.unwrap().is_empty());
    }
}
