//! Feedback command handler.

use clap::{Args, Subcommand};
use grounded_core::{config::AppConfig, AppResult};
use grounded_knowledge::FeedbackLog;

/// Inspect recorded answer feedback
#[derive(Args, Debug)]
pub struct FeedbackCommand {
    #[command(subcommand)]
    pub action: FeedbackAction,
}

#[derive(Subcommand, Debug)]
pub enum FeedbackAction {
    /// Helpfulness overall and per source, with improvement suggestions
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl FeedbackCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let FeedbackAction::Stats { json } = self.action;
        let log = FeedbackLog::new(config.feedback_path());

        let Some(analysis) = log.analyze()? else {
            if json {
                println!("{}", serde_json::json!({ "error": "No feedback data available" }));
            } else {
                println!("No feedback data available");
            }
            return Ok(());
        };
        let suggestions = analysis.improvement_suggestions();

        if json {
            let output = serde_json::json!({
                "analysis": analysis,
                "suggestions": suggestions,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            return Ok(());
        }

        println!("Total feedback:   {}", analysis.total_feedback);
        println!(
            "Helpfulness rate: {:.1}%",
            analysis.helpfulness_rate * 100.0
        );
        println!("By source:");
        for (source, count) in &analysis.source_distribution {
            let rate = analysis.source_helpfulness.get(source).copied().unwrap_or(0.0);
            println!(
                "  {:<6} {:>4} answers, {:.1}% helpful",
                source.as_str(),
                count,
                rate * 100.0
            );
        }

        if !suggestions.is_empty() {
            println!();
            println!("Suggestions:");
            for suggestion in &suggestions {
                println!("  - {}", suggestion);
            }
        }

        Ok(())
    }
}
