//! Guardrails for grounded question answering.
//!
//! Every value crossing a trust boundary is checked here: the user's query
//! (validated, sanitized, re-validated), the retrieved context and the
//! generated answer. Checks are pure functions over one compiled pattern set
//! shared for the life of the process.

pub mod context;
pub mod patterns;
pub mod types;
pub mod validator;

pub use context::ContextText;
pub use patterns::{UnsafePatterns, DEFAULT_PATTERNS, REDACTION_MARKER};
pub use types::{GuardrailError, Rejection, Subject, ValidationResult};
pub use validator::Guardrails;
