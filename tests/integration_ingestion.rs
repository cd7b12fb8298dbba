#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Ingest a text export, persist it, load it back and answer from disk

mod common;

use std::fs;

use common::{DIMENSION, HashingEmbedder, MODEL, handbook_export};
use handbook_rag::HandbookError;
use handbook_rag::assistant::HandbookAssistant;
use handbook_rag::document::PlainTextExtractor;
use handbook_rag::embeddings::chunking::ChunkingConfig;
use handbook_rag::formatter::DECLINE_MESSAGE;
use handbook_rag::indexer::Indexer;
use handbook_rag::interaction_log::PromptLog;
use handbook_rag::retrieval::RetrievalConfig;
use handbook_rag::storage::IndexStore;
use tempfile::TempDir;

fn chunking() -> ChunkingConfig {
    ChunkingConfig {
        target_words: 20,
        overlap_fraction: 0.25,
        min_words: 3,
    }
}

fn ingested(temp_dir: &TempDir) -> IndexStore {
    let document = temp_dir.path().join("handbook.txt");
    fs::write(&document, handbook_export()).expect("should write document");

    let store = IndexStore::new(temp_dir.path().join("index"));
    let stats = Indexer::new(&HashingEmbedder, chunking())
        .with_batch_size(1)
        .ingest(&document, &PlainTextExtractor, &store)
        .expect("should ingest document");

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.chunks, 2);
    assert_eq!(stats.pages_covered, 2);
    assert_eq!(stats.dimension, DIMENSION);
    store
}

#[test]
fn ingest_then_answer_from_disk() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let store = ingested(&temp_dir);

    let knowledge = store
        .load(MODEL, DIMENSION)
        .expect("should load persisted index");
    assert_eq!(knowledge.len(), 2);

    let log_path = temp_dir.path().join("logs").join("prompt_log.txt");
    let assistant = HandbookAssistant::new(
        Box::new(HashingEmbedder),
        knowledge,
        RetrievalConfig::default(),
    )
    .with_log(Box::new(PromptLog::new(&log_path)));

    let answered = assistant
        .ask("What margins are required?")
        .expect("should answer");
    assert_eq!(answered.pages, vec![1, 2]);
    assert_eq!(answered.sources[0].page, 1);

    let declined = assistant
        .ask("What is the weather today?")
        .expect("should decline");
    assert_eq!(declined.answer, DECLINE_MESSAGE);

    let log = fs::read_to_string(&log_path).expect("prompt log should exist");
    assert!(log.contains("What margins are required?"));
    assert!(log.contains("What is the weather today?"));
    assert!(log.contains("[Chunk 1 - Page 1]"));
}

#[test]
fn reingest_replaces_previous_index() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let store = ingested(&temp_dir);

    let document = temp_dir.path().join("smaller.txt");
    fs::write(&document, "Only one page about margins and spacing.").expect("should write");
    Indexer::new(&HashingEmbedder, chunking())
        .ingest(&document, &PlainTextExtractor, &store)
        .expect("should ingest document");

    let knowledge = store.load(MODEL, DIMENSION).expect("should load index");
    assert_eq!(knowledge.len(), 1);
}

#[test]
fn missing_index_is_configuration_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let store = IndexStore::new(temp_dir.path().join("index"));

    let result = store.load(MODEL, DIMENSION);
    assert!(matches!(result, Err(HandbookError::Config(_))));
}

#[test]
fn dimension_mismatch_is_configuration_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let store = ingested(&temp_dir);

    let result = store.load(MODEL, 384);
    assert!(matches!(result, Err(HandbookError::Config(_))));
}

#[test]
fn overlap_of_one_is_configuration_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let document = temp_dir.path().join("handbook.txt");
    fs::write(&document, handbook_export()).expect("should write document");
    let store = IndexStore::new(temp_dir.path().join("index"));

    let config = ChunkingConfig {
        overlap_fraction: 1.0,
        ..chunking()
    };
    let result = Indexer::new(&HashingEmbedder, config).ingest(&document, &PlainTextExtractor, &store);

    assert!(matches!(result, Err(HandbookError::Config(_))));
    assert!(!store.exists());
}
