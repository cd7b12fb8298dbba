// Indexer module
// Builds the knowledge base from a document: extract, chunk, embed, persist

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::document::{DocumentTextProvider, PageTexts};
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::chunking::{Chunk, ChunkingConfig, chunk_pages};
use crate::index::VectorIndex;
use crate::storage::{IndexStore, KnowledgeBase};
use crate::{HandbookError, Result};

const DEFAULT_BATCH_SIZE: usize = 32;

/// Turns page text into a searchable knowledge base
pub struct Indexer<'a, E: EmbeddingProvider + ?Sized> {
    provider: &'a E,
    chunking: ChunkingConfig,
    batch_size: usize,
    show_progress: bool,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionStats {
    pub pages: usize,
    pub pages_with_text: usize,
    pub chunks: usize,
    pub average_words_per_chunk: f64,
    /// Distinct pages at least one chunk came from
    pub pages_covered: usize,
    pub dimension: usize,
    pub duration: Duration,
}

impl<'a, E: EmbeddingProvider + ?Sized> Indexer<'a, E> {
    #[inline]
    pub fn new(provider: &'a E, chunking: ChunkingConfig) -> Self {
        Self {
            provider,
            chunking,
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
        }
    }

    /// Number of chunk texts handed to the provider at once
    #[inline]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Extract `document`, build its knowledge base and persist it to `store`,
    /// replacing whatever index was there.
    #[inline]
    pub fn ingest(
        &self,
        document: &Path,
        extractor: &dyn DocumentTextProvider,
        store: &IndexStore,
    ) -> Result<IngestionStats> {
        let pages = extractor
            .extract(document)
            .map_err(|e| HandbookError::Document(format!("{:#}", e)))?;

        let (knowledge, stats) = self.build_knowledge_base(&pages)?;
        store.save(&knowledge)?;

        info!(
            "Ingested {} into {} chunks from {} pages",
            document.display(),
            stats.chunks,
            stats.pages_covered
        );

        Ok(stats)
    }

    /// Chunk and embed `pages` into a knowledge base without persisting it
    #[inline]
    pub fn build_knowledge_base(&self, pages: &PageTexts) -> Result<(KnowledgeBase, IngestionStats)> {
        let started = Instant::now();

        let pages_with_text = pages.values().filter(|text| !text.is_empty()).count();
        if pages_with_text == 0 {
            return Err(HandbookError::Document(
                "document contains no extractable text".to_string(),
            ));
        }

        let chunks = chunk_pages(pages, &self.chunking)?;
        if chunks.is_empty() {
            return Err(HandbookError::Document(format!(
                "no page has at least {} words, nothing to index",
                self.chunking.min_words
            )));
        }

        let vectors = self.embed_chunks(&chunks)?;
        let index = VectorIndex::build(self.provider.dimension(), vectors)?;

        let stats = IngestionStats {
            pages: pages.len(),
            pages_with_text,
            chunks: chunks.len(),
            average_words_per_chunk: chunks.iter().map(|c| c.word_count).sum::<usize>() as f64
                / chunks.len() as f64,
            pages_covered: chunks.iter().map(|c| c.page).collect::<BTreeSet<_>>().len(),
            dimension: index.dimension(),
            duration: started.elapsed(),
        };

        let knowledge = KnowledgeBase::new(chunks, index, self.provider.model_id())?;
        Ok((knowledge, stats))
    }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let bar = self.progress_bar(chunks.len());
        let mut vectors = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.batch_size) {
            let texts = batch.iter().map(|c| c.text.clone()).collect::<Vec<_>>();
            let embedded = self.provider.embed(&texts).map_err(|e| {
                HandbookError::Embedding(format!(
                    "Failed to embed chunks starting at {}: {:#}",
                    batch[0].id, e
                ))
            })?;

            if embedded.len() != batch.len() {
                return Err(HandbookError::Embedding(format!(
                    "provider returned {} vectors for {} chunks",
                    embedded.len(),
                    batch.len()
                )));
            }

            vectors.extend(embedded);
            bar.inc(batch.len() as u64);
            debug!("Embedded {}/{} chunks", vectors.len(), chunks.len());
        }

        bar.finish_and_clear();
        Ok(vectors)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{bar:40}] {pos}/{len} Embedding chunks ({eta})",
        ) {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }
}
