// Interaction log
// Append-only record of every question and what the assistant answered

#[cfg(test)]
mod tests;

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use itertools::Itertools;

use crate::Result;
use crate::retrieval::RetrievalOutcome;

const RULE_WIDTH: usize = 80;

/// Sink for completed interactions
pub trait InteractionLog {
    fn record(&self, question: &str, outcome: &RetrievalOutcome) -> Result<()>;
}

/// Plain-text prompt log, one block per query
#[derive(Debug, Clone)]
pub struct PromptLog {
    path: PathBuf,
}

impl PromptLog {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InteractionLog for PromptLog {
    #[inline]
    fn record(&self, question: &str, outcome: &RetrievalOutcome) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let entry = format_entry(Local::now(), question, outcome);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())?;

        Ok(())
    }
}

/// Render one log block
#[inline]
pub fn format_entry(timestamp: DateTime<Local>, question: &str, outcome: &RetrievalOutcome) -> String {
    let rule = "=".repeat(RULE_WIDTH);

    let context = if outcome.sources.is_empty() {
        "(none)".to_string()
    } else {
        outcome
            .sources
            .iter()
            .enumerate()
            .map(|(i, source)| format!("[Chunk {} - Page {}]\n{}", i + 1, source.page, source.text))
            .join("\n\n")
    };

    let scores = outcome
        .sources
        .iter()
        .enumerate()
        .map(|(i, source)| format!("Chunk {}: {:.3}", i + 1, source.score))
        .join(", ");

    let lines = [
        String::new(),
        rule.clone(),
        format!("Timestamp: {}", timestamp.format("%Y-%m-%d %H:%M:%S")),
        rule,
        String::new(),
        "QUESTION:".to_string(),
        question.to_string(),
        String::new(),
        format!("RETRIEVED CONTEXT (Top-{} chunks):", outcome.sources.len()),
        context,
        String::new(),
        "SIMILARITY SCORES:".to_string(),
        scores,
        format!("Confidence: {} (max score: {:.3})", outcome.confidence, outcome.max_score),
        String::new(),
        "ANSWER:".to_string(),
        outcome.answer.clone(),
        String::new(),
        "PAGE REFERENCES:".to_string(),
        format!("Pages: {}", outcome.pages.iter().join(", ")),
        String::new(),
    ];

    format!("{}\n", lines.join("\n"))
}
