use super::*;
use chrono::TimeZone;
use tempfile::TempDir;

use crate::embeddings::chunking::Chunk;
use crate::formatter::DECLINE_MESSAGE;
use crate::retrieval::{Confidence, SourceView};

fn answered() -> RetrievalOutcome {
    let chunk = Chunk {
        id: 4,
        text: "Margins must be one inch on all sides.".to_string(),
        page: 3,
        section: "FORMATTING".to_string(),
        word_count: 8,
    };
    let other = Chunk {
        id: 9,
        text: "Use 12pt font.".to_string(),
        page: 5,
        section: "FONTS".to_string(),
        word_count: 3,
    };
    RetrievalOutcome {
        answer: "Margins must be one inch on all sides. (p. 3)\n\nUse 12pt font. (p. 5)".to_string(),
        sources: vec![SourceView::new(&chunk, 0.6123), SourceView::new(&other, 0.2)],
        pages: vec![3, 5],
        confidence: Confidence::High,
        max_score: 0.6123,
    }
}

fn timestamp() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

#[test]
fn entry_contains_every_section() {
    let entry = format_entry(timestamp(), "What margins?", &answered());

    assert!(entry.contains("Timestamp: 2024-03-01 09:30:00"));
    assert!(entry.contains("QUESTION:\nWhat margins?\n"));
    assert!(entry.contains("RETRIEVED CONTEXT (Top-2 chunks):"));
    assert!(entry.contains("[Chunk 1 - Page 3]\nMargins must be one inch on all sides."));
    assert!(entry.contains("[Chunk 2 - Page 5]\nUse 12pt font."));
    assert!(entry.contains("Chunk 1: 0.612, Chunk 2: 0.200"));
    assert!(entry.contains("Confidence: high (max score: 0.612)"));
    assert!(entry.contains("ANSWER:\nMargins must be one inch on all sides. (p. 3)"));
    assert!(entry.contains("Pages: 3, 5"));
}

#[test]
fn declined_entry_has_no_context() {
    let entry = format_entry(timestamp(), "Weather?", &RetrievalOutcome::declined());

    assert!(entry.contains("RETRIEVED CONTEXT (Top-0 chunks):\n(none)"));
    assert!(entry.contains(&format!("ANSWER:\n{}", DECLINE_MESSAGE)));
    assert!(entry.contains("Confidence: low (max score: 0.000)"));
    assert!(entry.contains("Pages: \n"));
}

#[test]
fn record_appends_blocks() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let log = PromptLog::new(temp_dir.path().join("logs").join("prompt_log.txt"));

    log.record("first question", &answered())
        .expect("should write first entry");
    log.record("second question", &RetrievalOutcome::declined())
        .expect("should write second entry");

    let content = fs::read_to_string(log.path()).expect("log should exist");
    assert_eq!(content.matches("QUESTION:").count(), 2);
    let first = content.find("first question").expect("first entry");
    let second = content.find("second question").expect("second entry");
    assert!(first < second);
}
