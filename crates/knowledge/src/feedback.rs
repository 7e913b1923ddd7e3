//! Append-only feedback log.
//!
//! Each answered query can be rated; records are appended as JSON lines to
//! `.grounded/feedback.jsonl` and analyzed per routed source.

use crate::types::{ContextItem, RoutedSource};
use chrono::{DateTime, Utc};
use grounded_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Overall helpfulness below this triggers a quality suggestion.
const OVERALL_HELPFULNESS_FLOOR: f64 = 0.7;

/// Per-source helpfulness below this triggers a source suggestion.
const SOURCE_HELPFULNESS_FLOOR: f64 = 0.6;

/// One rated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub response: String,
    pub context: Vec<ContextItem>,
    pub source: RoutedSource,
    pub is_helpful: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FeedbackRecord {
    pub fn new(
        query: impl Into<String>,
        response: impl Into<String>,
        context: Vec<ContextItem>,
        source: RoutedSource,
        is_helpful: bool,
        comment: Option<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            query: query.into(),
            response: response.into(),
            context,
            source,
            is_helpful,
            comment,
        }
    }
}

/// Aggregate view over the feedback log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnalysis {
    pub total_feedback: usize,
    pub helpful_count: usize,
    pub helpfulness_rate: f64,
    pub source_distribution: BTreeMap<RoutedSource, usize>,
    pub source_helpfulness: BTreeMap<RoutedSource, f64>,
}

impl FeedbackAnalysis {
    /// Suggestions for sources or overall quality that fall below target.
    pub fn improvement_suggestions(&self) -> Vec<String> {
        let mut suggestions = Vec::new();

        if self.helpfulness_rate < OVERALL_HELPFULNESS_FLOOR {
            suggestions.push("Consider improving response quality and relevance".to_string());
        }

        for (source, helpfulness) in &self.source_helpfulness {
            if *helpfulness < SOURCE_HELPFULNESS_FLOOR {
                suggestions.push(format!("Improve quality of {} responses", source));
            }
        }

        suggestions
    }
}

/// JSONL-backed feedback store.
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn record(&self, record: &FeedbackRecord) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::Feedback(format!("Failed to open feedback log: {}", e)))?;

        let json_line = serde_json::to_string(record)?;
        writeln!(file, "{}", json_line)
            .map_err(|e| AppError::Feedback(format!("Failed to write feedback: {}", e)))?;

        tracing::debug!(
            "Recorded {} feedback for source '{}'",
            if record.is_helpful { "helpful" } else { "unhelpful" },
            record.source
        );
        Ok(())
    }

    /// Read every record. A missing log is empty.
    pub fn load(&self) -> AppResult<Vec<FeedbackRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| AppError::Feedback(format!("Failed to open feedback log: {}", e)))?;

        let mut records = Vec::new();
        for (line_num, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| {
                AppError::Feedback(format!("Failed to read line {}: {}", line_num + 1, e))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let record: FeedbackRecord = serde_json::from_str(&line).map_err(|e| {
                AppError::Feedback(format!(
                    "Failed to parse line {} in feedback log: {}",
                    line_num + 1,
                    e
                ))
            })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Analyze the log. Returns `None` when no feedback has been recorded.
    pub fn analyze(&self) -> AppResult<Option<FeedbackAnalysis>> {
        Ok(analyze_records(&self.load()?))
    }
}

/// Compute helpfulness overall and per source.
pub fn analyze_records(records: &[FeedbackRecord]) -> Option<FeedbackAnalysis> {
    if records.is_empty() {
        return None;
    }

    let mut source_distribution: BTreeMap<RoutedSource, usize> = BTreeMap::new();
    let mut source_helpful: BTreeMap<RoutedSource, usize> = BTreeMap::new();
    for record in records {
        *source_distribution.entry(record.source).or_insert(0) += 1;
        if record.is_helpful {
            *source_helpful.entry(record.source).or_insert(0) += 1;
        }
    }

    let source_helpfulness = source_distribution
        .iter()
        .map(|(source, count)| {
            let helpful = source_helpful.get(source).copied().unwrap_or(0);
            (*source, helpful as f64 / *count as f64)
        })
        .collect();

    let helpful_count = records.iter().filter(|r| r.is_helpful).count();

    Some(FeedbackAnalysis {
        total_feedback: records.len(),
        helpful_count,
        helpfulness_rate: helpful_count as f64 / records.len() as f64,
        source_distribution,
        source_helpfulness,
    })
}
