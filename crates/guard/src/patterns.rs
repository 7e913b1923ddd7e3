//! The compiled unsafe-content pattern set.
//!
//! One set is compiled at startup and shared read-only by every check.

use grounded_core::{AppError, AppResult};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Replacement for every unsafe match in sanitized input.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Sensitive-term disclosure, exploit/illegality references, adult content
/// and hate speech.
pub const DEFAULT_PATTERNS: &[&str] = &[
    r"(?i)(password|api key|secret|token)",
    r"(?i)(hack|exploit|vulnerability)",
    r"(?i)(illegal|unlawful|criminal)",
    r"(?i)(porn|adult|nsfw)",
    r"(?i)(hate|racist|sexist)",
];

/// Characters tried on either side of the marker when checking a pattern.
const MARKER_NEIGHBOURS: &[&str] = &["[", "]", "a", "Z", "0", " ", ".", "-", "_", "\n"];

static DEFAULT_SET: LazyLock<Arc<UnsafePatterns>> = LazyLock::new(|| {
    Arc::new(UnsafePatterns::compile(DEFAULT_PATTERNS).expect("default unsafe patterns are valid"))
});

/// An ordered set of compiled unsafe-content patterns.
#[derive(Debug)]
pub struct UnsafePatterns {
    patterns: Vec<Regex>,
}

impl UnsafePatterns {
    /// Compile a pattern set.
    ///
    /// Fails on invalid syntax, and on any pattern that can match inside or
    /// across a [`REDACTION_MARKER`]: any piece of the marker, the marker
    /// next to a neighbouring character, or two adjacent markers.
    pub fn compile<S: AsRef<str>>(sources: &[S]) -> AppResult<Self> {
        let patterns = sources
            .iter()
            .map(|source| {
                let source = source.as_ref();
                let regex = Regex::new(source).map_err(|e| {
                    AppError::Config(format!("Invalid guardrail pattern '{}': {}", source, e))
                })?;
                if touches_marker(&regex) {
                    return Err(AppError::Config(format!(
                        "Guardrail pattern '{}' matches the redaction marker",
                        source
                    )));
                }
                Ok(regex)
            })
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!("Compiled {} guardrail patterns", patterns.len());
        Ok(Self { patterns })
    }

    /// The process-wide default set.
    pub fn shared_default() -> Arc<Self> {
        Arc::clone(&DEFAULT_SET)
    }

    /// Compile `overrides` when present, otherwise share the default set.
    pub fn from_config(overrides: Option<&[String]>) -> AppResult<Arc<Self>> {
        match overrides {
            Some(sources) => Ok(Arc::new(Self::compile(sources)?)),
            None => Ok(Self::shared_default()),
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }

    /// Replace every match of every pattern, in pattern order.
    pub fn redact(&self, text: &str) -> String {
        self.patterns.iter().fold(text.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, REDACTION_MARKER).into_owned()
        })
    }
}

/// True when `regex` could match text that redaction has already produced.
fn touches_marker(regex: &Regex) -> bool {
    let marker = REDACTION_MARKER;
    let pieces = (0..marker.len())
        .flat_map(|start| (start + 1..=marker.len()).map(move |end| &marker[start..end]));
    if pieces.into_iter().any(|piece| regex.is_match(piece)) {
        return true;
    }

    if regex.is_match(&marker.repeat(2)) {
        return true;
    }

    MARKER_NEIGHBOURS.iter().any(|c| {
        regex.is_match(&format!("{c}{marker}")) || regex.is_match(&format!("{marker}{c}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_compiles() {
        let set = UnsafePatterns::shared_default();
        assert_eq!(set.len(), DEFAULT_PATTERNS.len());
        assert!(Arc::ptr_eq(&set, &UnsafePatterns::shared_default()));
    }

    #[test]
    fn test_case_insensitive_match() {
        let set = UnsafePatterns::shared_default();
        assert!(set.is_match("What is my PASSWORD?"));
        assert!(set.is_match("nsfw"));
        assert!(!set.is_match("What is a prime number?"));
    }

    #[test]
    fn test_redact_replaces_all_matches() {
        let set = UnsafePatterns::shared_default();
        assert_eq!(
            set.redact("share the secret token and hack it"),
            "share the [REDACTED] [REDACTED] and [REDACTED] it"
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = UnsafePatterns::compile(&["(unclosed"]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_pattern_matching_marker_rejected() {
        let result = UnsafePatterns::compile(&["(?i)redacted"]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_pattern_matching_across_marker_rejected() {
        for source in [r"\]\]", r"\]\[", r"E\w", r"\[", r"D\]\s"] {
            let result = UnsafePatterns::compile(&[source]);
            assert!(
                matches!(result, Err(AppError::Config(_))),
                "{source} should be rejected"
            );
        }
    }

    #[test]
    fn test_override_set_redaction_is_idempotent() {
        let set = UnsafePatterns::compile(&[r"(?i)cheat(ing)?", r"\d{4}-\d{4}", r"!!+"]).unwrap();
        for text in [
            "a]]] cheating [x]",
            "card 1234-5678!!! please",
            "[REDACTED] cheat [REDACTED]",
            "CHEAT]cheat[",
        ] {
            let once = set.redact(text);
            assert_eq!(set.redact(&once), once, "input: {text}");
        }
    }

    #[test]
    fn test_from_config_override() {
        let custom = vec!["(?i)homework answers".to_string()];
        let set = UnsafePatterns::from_config(Some(custom.as_slice())).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.is_match("give me HOMEWORK ANSWERS"));
        assert!(!set.is_match("password"));
    }
}
