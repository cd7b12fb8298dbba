use std::cell::RefCell;

use anyhow::anyhow;
use tempfile::TempDir;

use super::*;
use crate::document::PlainTextExtractor;

/// Embeds each text as (word count, 1, 0, 0) and remembers batch sizes
struct RecordingEmbedder {
    batches: RefCell<Vec<usize>>,
    drop_last: bool,
}

impl RecordingEmbedder {
    fn new() -> Self {
        Self {
            batches: RefCell::new(Vec::new()),
            drop_last: false,
        }
    }
}

impl EmbeddingProvider for RecordingEmbedder {
    fn model_id(&self) -> &str {
        "recording"
    }

    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.batches.borrow_mut().push(texts.len());
        let mut vectors = texts
            .iter()
            .map(|text| vec![text.split_whitespace().count() as f32, 1.0, 0.0, 0.0])
            .collect::<Vec<_>>();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }
}

struct FailingEmbedder;

impl EmbeddingProvider for FailingEmbedder {
    fn model_id(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        4
    }

    fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Err(anyhow!("connection refused"))
    }
}

fn small_chunking() -> ChunkingConfig {
    ChunkingConfig {
        target_words: 4,
        overlap_fraction: 0.5,
        min_words: 2,
    }
}

fn pages() -> PageTexts {
    PageTexts::from([
        (1, "a b c d e f".to_string()),
        (2, "x y".to_string()),
        (3, String::new()),
    ])
}

#[test]
fn builds_aligned_knowledge_base() {
    let provider = RecordingEmbedder::new();
    let indexer = Indexer::new(&provider, small_chunking());

    let (knowledge, stats) = indexer
        .build_knowledge_base(&pages())
        .expect("should build knowledge base");

    assert_eq!(knowledge.len(), 4);
    assert_eq!(knowledge.model(), "recording");
    assert_eq!(knowledge.dimension(), 4);
    let ids = knowledge.chunks().iter().map(|c| c.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 1, 2, 3]);
    let pages = knowledge.chunks().iter().map(|c| c.page).collect::<Vec<_>>();
    assert_eq!(pages, vec![1, 1, 1, 2]);

    assert_eq!(stats.pages, 3);
    assert_eq!(stats.pages_with_text, 2);
    assert_eq!(stats.chunks, 4);
    assert_eq!(stats.pages_covered, 2);
    assert_eq!(stats.dimension, 4);
    assert!((stats.average_words_per_chunk - 3.0).abs() < f64::EPSILON);
}

#[test]
fn embeds_in_batches() {
    let provider = RecordingEmbedder::new();
    let indexer = Indexer::new(&provider, small_chunking()).with_batch_size(3);

    indexer
        .build_knowledge_base(&pages())
        .expect("should build knowledge base");

    assert_eq!(*provider.batches.borrow(), vec![3, 1]);
}

#[test]
fn zero_batch_size_is_clamped() {
    let provider = RecordingEmbedder::new();
    let indexer = Indexer::new(&provider, small_chunking()).with_batch_size(0);

    indexer
        .build_knowledge_base(&pages())
        .expect("should build knowledge base");

    assert_eq!(*provider.batches.borrow(), vec![1, 1, 1, 1]);
}

#[test]
fn empty_document_is_rejected() {
    let provider = RecordingEmbedder::new();
    let indexer = Indexer::new(&provider, small_chunking());
    let pages = PageTexts::from([(1, String::new()), (2, String::new())]);

    let result = indexer.build_knowledge_base(&pages);
    assert!(matches!(result, Err(HandbookError::Document(_))));
    assert!(provider.batches.borrow().is_empty());
}

#[test]
fn document_without_chunks_is_rejected() {
    let provider = RecordingEmbedder::new();
    let indexer = Indexer::new(&provider, small_chunking());
    let pages = PageTexts::from([(1, "lonely".to_string())]);

    let result = indexer.build_knowledge_base(&pages);
    assert!(matches!(result, Err(HandbookError::Document(_))));
}

#[test]
fn provider_failure_is_embedding_error() {
    let indexer = Indexer::new(&FailingEmbedder, small_chunking());

    let result = indexer.build_knowledge_base(&pages());
    match result {
        Err(HandbookError::Embedding(message)) => {
            assert!(message.contains("connection refused"));
        }
        other => panic!("expected embedding error, got {:?}", other.map(|(_, s)| s)),
    }
}

#[test]
fn short_provider_response_is_rejected() {
    let provider = RecordingEmbedder {
        drop_last: true,
        ..RecordingEmbedder::new()
    };
    let indexer = Indexer::new(&provider, small_chunking());

    let result = indexer.build_knowledge_base(&pages());
    assert!(matches!(result, Err(HandbookError::Embedding(_))));
}

#[test]
fn ingest_persists_index() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let document = temp_dir.path().join("handbook.txt");
    std::fs::write(&document, "a b c d e f\u{000C}x y\u{000C}").expect("should write document");
    let store = IndexStore::new(temp_dir.path().join("index"));

    let provider = RecordingEmbedder::new();
    let stats = Indexer::new(&provider, small_chunking())
        .ingest(&document, &PlainTextExtractor, &store)
        .expect("should ingest document");

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.chunks, 4);
    assert!(store.exists());

    let knowledge = store.load("recording", 4).expect("should load index");
    assert_eq!(knowledge.len(), 4);
    assert_eq!(knowledge.chunks()[3].text, "x y");
}

#[test]
fn ingest_missing_document_is_document_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let store = IndexStore::new(temp_dir.path().join("index"));
    let provider = RecordingEmbedder::new();

    let result = Indexer::new(&provider, small_chunking()).ingest(
        &temp_dir.path().join("missing.txt"),
        &PlainTextExtractor,
        &store,
    );

    assert!(matches!(result, Err(HandbookError::Document(_))));
    assert!(!store.exists());
}
