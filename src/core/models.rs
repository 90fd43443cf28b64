//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// One input file loaded into memory for a single run
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub output: PathBuf,
    pub content: String,
}

impl Document {
    pub fn new(source: PathBuf, output: PathBuf, content: String) -> Self {
        Self {
            source,
            output,
            content,
        }
    }
}

/// Result of translating one chunk.
///
/// Every chunk handed to the dispatcher ends up with exactly one outcome, and
/// [`ChunkOutcome::text`] always yields something that can be written back
/// into the document at that chunk's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkOutcome {
    /// Text returned by the model after cleanup
    Translated(String),
    /// Dry-run marker, no request was made
    Placeholder(String),
    /// Whitespace-only chunk, passed through untouched
    Skipped(String),
    /// Translation failed; the original text is kept
    Fallback { original: String, reason: String },
}

impl ChunkOutcome {
    pub fn fallback(original: impl Into<String>, reason: impl Into<String>) -> Self {
        ChunkOutcome::Fallback {
            original: original.into(),
            reason: reason.into(),
        }
    }

    /// Text to splice into the reassembled document
    pub fn text(&self) -> &str {
        match self {
            ChunkOutcome::Translated(text)
            | ChunkOutcome::Placeholder(text)
            | ChunkOutcome::Skipped(text) => text,
            ChunkOutcome::Fallback { original, .. } => original,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ChunkOutcome::Translated(text)
            | ChunkOutcome::Placeholder(text)
            | ChunkOutcome::Skipped(text) => text,
            ChunkOutcome::Fallback { original, .. } => original,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ChunkOutcome::Fallback { .. })
    }

    /// Failure reason, if this chunk fell back
    pub fn reason(&self) -> Option<&str> {
        match self {
            ChunkOutcome::Fallback { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for ChunkOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkOutcome::Translated(_) => write!(f, "translated"),
            ChunkOutcome::Placeholder(_) => write!(f, "placeholder"),
            ChunkOutcome::Skipped(_) => write!(f, "skipped"),
            ChunkOutcome::Fallback { reason, .. } => write!(f, "fallback ({})", reason),
        }
    }
}

/// Summary of one translated file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub chunks: usize,
    pub translated: usize,
    pub skipped: usize,
    pub fallbacks: usize,
    /// False in dry-run mode
    pub written: bool,
}

impl FileReport {
    /// Tally outcomes for a file
    pub fn from_outcomes(source: PathBuf, output: PathBuf, outcomes: &[ChunkOutcome]) -> Self {
        let mut report = Self {
            source,
            output,
            chunks: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Translated(_) | ChunkOutcome::Placeholder(_) => report.translated += 1,
                ChunkOutcome::Skipped(_) => report.skipped += 1,
                ChunkOutcome::Fallback { .. } => report.fallbacks += 1,
            }
        }

        report
    }
}
