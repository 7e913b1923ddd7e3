//! Grounded CLI
//!
//! Answers questions from a local knowledge base, falling back to web search
//! when retrieval confidence is low, with guardrails on input, context and
//! output.

mod commands;
mod pipeline;

use clap::{Parser, Subcommand};
use commands::{AskCommand, FeedbackCommand, KnowledgeCommand};
use grounded_core::config::{AppConfig, ConfigOverrides};
use grounded_core::logging::{self, LogFormat};
use grounded_core::AppResult;
use std::path::PathBuf;

/// Grounded - knowledge-base-first question answering with web fallback
#[derive(Parser, Debug)]
#[command(name = "grounded")]
#[command(about = "Knowledge-base-first question answering with web fallback", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "GROUNDED_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "GROUNDED_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// LLM provider (ollama, openai, groq)
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(long, global = true)]
    model: Option<String>,

    /// Knowledge base to query
    #[arg(short = 'k', long, global = true)]
    knowledge_base: Option<String>,

    /// Minimum top similarity for trusting the knowledge base (0.0-1.0)
    #[arg(long, global = true)]
    threshold: Option<f32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question
    Ask(AskCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Answer feedback
    Feedback(FeedbackCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(ConfigOverrides {
        workspace: cli.workspace,
        config_file: cli.config,
        provider: cli.provider,
        model: cli.model,
        log_level: cli.log_level,
        log_format: cli.log_format,
        knowledge_base: cli.knowledge_base,
        similarity_threshold: cli.threshold,
        verbose: cli.verbose,
        no_color: cli.no_color,
    })?;
    config.validate()?;

    let log_format = LogFormat::parse(&config.log_format).unwrap_or_default();
    logging::init_logging(config.log_level.as_deref(), config.no_color, log_format)?;

    tracing::info!("Grounded CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} ({})", config.provider, config.model);
    tracing::debug!(
        "Knowledge base: {} (threshold {:.2})",
        config.retrieval.base,
        config.retrieval.similarity_threshold
    );

    config.ensure_grounded_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Knowledge(_) => "knowledge",
        Commands::Feedback(_) => "feedback",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Feedback(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
