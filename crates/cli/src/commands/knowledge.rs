//! Knowledge command handler.
//!
//! Manages the local passage index the router consults first. The base is
//! selected with the global `--knowledge-base` flag.

use clap::{Args, Subcommand};
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::{KnowledgeRetriever, SqliteKnowledgeBase};

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Add a passage to the knowledge base
    Add(KnowledgeAddCommand),
    /// Search the knowledge base directly, without routing
    Search(KnowledgeSearchCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// Delete every passage in the knowledge base
    Clean,
}

/// Add a passage
#[derive(Args, Debug)]
pub struct KnowledgeAddCommand {
    /// Passage text
    pub text: String,

    /// Document the passage comes from
    #[arg(short, long)]
    pub document: String,

    /// Page number within the document
    #[arg(long, default_value_t = 0)]
    pub page: u32,
}

/// Search passages
#[derive(Args, Debug)]
pub struct KnowledgeSearchCommand {
    /// Query text
    pub query: String,

    /// Number of passages to retrieve (default: retrieval.topK)
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Show statistics
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let base_name = config.retrieval.base.as_str();
        tracing::info!("Executing knowledge command for base '{}'", base_name);

        let kb = SqliteKnowledgeBase::open(&config.workspace, base_name)?;

        match &self.action {
            KnowledgeAction::Add(cmd) => {
                let id = kb.add_passage(&cmd.text, &cmd.document, cmd.page).await?;
                println!("Added passage {} to '{}'", id, base_name);
            }
            KnowledgeAction::Search(cmd) => {
                let top_k = cmd.top_k.unwrap_or(config.retrieval.top_k);
                let passages = kb.search(&cmd.query, top_k).await?;

                if cmd.json {
                    let output: Vec<_> = passages
                        .iter()
                        .map(|p| {
                            serde_json::json!({
                                "text": p.text,
                                "documentName": p.document_name,
                                "pageNumber": p.page_number,
                                "score": p.score,
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&output)?);
                } else if passages.is_empty() {
                    println!("No passages found in '{}'", base_name);
                } else {
                    for (i, p) in passages.iter().enumerate() {
                        println!(
                            "{}. [{:.3}] {} (page {})",
                            i + 1,
                            p.score,
                            p.document_name,
                            p.page_number
                        );
                        println!("   {}", p.text);
                    }
                }
            }
            KnowledgeAction::Stats(cmd) => {
                let stats = kb.stats()?;
                if cmd.json {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                } else {
                    println!("Knowledge base: {}", stats.base_name);
                    println!("  Documents: {}", stats.documents_count);
                    println!("  Passages:  {}", stats.passages_count);
                    println!("  Size:      {} bytes", stats.db_size_bytes);
                    println!("  Embedding: {} / {}", stats.provider, stats.model);
                }
            }
            KnowledgeAction::Clean => {
                kb.clean()?;
                println!("Knowledge base '{}' cleaned", base_name);
            }
        }

        Ok(())
    }
}
