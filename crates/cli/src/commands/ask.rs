//! Ask command handler.
//!
//! Runs one question through the guarded routing pipeline and optionally
//! records feedback on the answer.

use crate::pipeline::{Answer, QueryPipeline};
use clap::{Args, ValueEnum};
use grounded_core::{config::AppConfig, AppError, AppResult};
use grounded_knowledge::{ContextItem, ContextOrigin, FeedbackLog, FeedbackRecord};

/// Rating attached to an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Rating {
    Helpful,
    Unhelpful,
}

/// Ask a question grounded in the knowledge base or the web
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Print the retrieved context after the answer
    #[arg(long)]
    pub show_context: bool,

    /// Record whether the answer was helpful
    #[arg(long, value_enum)]
    pub feedback: Option<Rating>,

    /// Comment stored with the feedback
    #[arg(long, requires = "feedback")]
    pub comment: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let pipeline = QueryPipeline::from_config(config)?;
        let answer = pipeline.answer(&self.question).await?;

        if answer.generation_failed() {
            return Err(AppError::Llm(answer.response));
        }

        if self.json {
            let output = serde_json::json!({
                "query": answer.query,
                "answer": answer.response,
                "source": answer.source(),
                "resolution": answer.resolution(),
                "context": answer.outcome.items(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", answer.response);
            println!();
            println!("Source: {}", answer.source());

            if self.show_context {
                print_context(answer.outcome.items());
            }
        }

        if let Some(rating) = self.feedback {
            self.record_feedback(config, &answer, rating)?;
        }

        Ok(())
    }

    fn record_feedback(&self, config: &AppConfig, answer: &Answer, rating: Rating) -> AppResult<()> {
        let log = FeedbackLog::new(config.feedback_path());
        let record = FeedbackRecord::new(
            &answer.query,
            &answer.response,
            answer.outcome.items().to_vec(),
            answer.source(),
            rating == Rating::Helpful,
            self.comment.clone(),
        );
        log.record(&record)?;

        tracing::info!("Feedback recorded to {:?}", log.path());
        Ok(())
    }
}

fn print_context(items: &[ContextItem]) {
    println!();
    println!("Context:");
    for (i, item) in items.iter().enumerate() {
        let provenance = match &item.origin {
            ContextOrigin::KnowledgeBase(doc) => {
                format!("{} (page {})", doc.document_name, doc.page_number)
            }
            ContextOrigin::Web(web) => {
                let domain = web.domain.as_deref().unwrap_or("unknown");
                format!("{} [{}]", web.title, domain)
            }
            ContextOrigin::Error { title } => title.clone(),
        };
        println!("{}. {} (score {:.3})", i + 1, provenance, item.score);
        println!("   {}", item.text);
    }
}
