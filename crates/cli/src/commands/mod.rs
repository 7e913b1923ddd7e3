//! Command handlers for the Grounded CLI.

pub mod ask;
pub mod feedback;
pub mod knowledge;

pub use ask::AskCommand;
pub use feedback::FeedbackCommand;
pub use knowledge::KnowledgeCommand;
