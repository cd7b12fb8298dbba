
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigError;
use crate::embeddings::EmbeddingProvider;
use crate::embeddings::chunking::Chunk;
use crate::formatter::{DECLINE_MESSAGE, format_answer, unique_pages};
use crate::storage::KnowledgeBase;
use crate::{HandbookError, Result};

/// Top scores above this are reported as high confidence
pub const HIGH_CONFIDENCE_SCORE: f32 = 0.5;

/// Retrieval settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks fetched per query
    pub top_k: usize,
    /// Minimum top score needed to answer instead of declining
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.25,
        }
    }
}

impl RetrievalConfig {
    /// Top-k must be at least 1 and the threshold a number in [-1, 1]
    #[inline]
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(ConfigError::InvalidThreshold(self.similarity_threshold));
        }

        Ok(())
    }
}

/// Coarse bucketing of the top retrieval score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Reserved for declined queries
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Tier for a query that passed the relevance gate
    #[inline]
    pub fn for_answered(max_score: f32) -> Self {
        if max_score > HIGH_CONFIDENCE_SCORE {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl fmt::Display for Confidence {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// A retrieved chunk as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceView {
    pub chunk_id: usize,
    pub page: u32,
    pub section: String,
    /// Cosine similarity to the query
    pub score: f32,
    pub word_count: usize,
    pub text: String,
}

impl SourceView {
    #[inline]
    pub fn new(chunk: &Chunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            page: chunk.page,
            section: chunk.section.clone(),
            score,
            word_count: chunk.word_count,
            text: chunk.text.clone(),
        }
    }
}

/// Result of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalOutcome {
    /// Formatted answer, or the decline message
    pub answer: String,
    /// Retrieved chunks in score order; empty when declined
    pub sources: Vec<SourceView>,
    /// Distinct cited pages, ascending
    pub pages: Vec<u32>,
    pub confidence: Confidence,
    /// Highest similarity among the sources; 0 when declined
    pub max_score: f32,
}

impl RetrievalOutcome {
    /// The outcome for a query nothing in the handbook is relevant to
    #[inline]
    pub fn declined() -> Self {
        Self {
            answer: DECLINE_MESSAGE.to_string(),
            sources: Vec::new(),
            pages: Vec::new(),
            confidence: Confidence::Low,
            max_score: 0.0,
        }
    }

    #[inline]
    pub fn is_declined(&self) -> bool {
        self.confidence == Confidence::Low
    }
}

/// Answers queries from a loaded knowledge base.
///
/// The relevance gate is all-or-nothing: if the best score reaches the
/// threshold every retrieved chunk becomes a source, otherwise none does.
/// Chunks are never filtered individually.
pub struct Retriever<'a, E: EmbeddingProvider + ?Sized> {
    provider: &'a E,
    knowledge: &'a KnowledgeBase,
    config: RetrievalConfig,
}

impl<'a, E: EmbeddingProvider + ?Sized> Retriever<'a, E> {
    #[inline]
    pub fn new(provider: &'a E, knowledge: &'a KnowledgeBase, config: RetrievalConfig) -> Self {
        Self {
            provider,
            knowledge,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Retrieve with the configured top-k and threshold
    #[inline]
    pub fn retrieve(&self, query: &str) -> Result<RetrievalOutcome> {
        self.retrieve_with(query, self.config.top_k, self.config.similarity_threshold)
    }

    #[inline]
    pub fn retrieve_with(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<RetrievalOutcome> {
        if threshold.is_nan() {
            return Err(HandbookError::Config(
                "similarity threshold must be a number".to_string(),
            ));
        }

        let scored = self.search(query, top_k)?;

        let Some(max_score) = scored.iter().map(|(_, score)| *score).reduce(f32::max) else {
            debug!("No chunks retrieved, declining");
            return Ok(RetrievalOutcome::declined());
        };

        // a NaN score never passes
        let passes = max_score >= threshold;
        if !passes {
            debug!(
                "Top score {:.3} below threshold {:.3}, declining",
                max_score, threshold
            );
            return Ok(RetrievalOutcome::declined());
        }

        debug!(
            "Top score {:.3} meets threshold {:.3}, answering from {} chunks",
            max_score,
            threshold,
            scored.len()
        );

        let chunks = scored.iter().map(|(chunk, _)| *chunk).collect::<Vec<_>>();
        Ok(RetrievalOutcome {
            answer: format_answer(chunks.iter().copied()),
            pages: unique_pages(chunks.iter().copied()),
            sources: scored
                .iter()
                .map(|(chunk, score)| SourceView::new(chunk, *score))
                .collect(),
            confidence: Confidence::for_answered(max_score),
            max_score,
        })
    }

    /// Embed the query and join index hits back to their chunks
    #[inline]
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<(&'a Chunk, f32)>> {
        let query_vector = self
            .provider
            .embed(&[query.to_string()])
            .map_err(|e| HandbookError::Embedding(format!("Failed to embed query: {:#}", e)))?
            .into_iter()
            .next()
            .ok_or_else(|| {
                HandbookError::Embedding("provider returned no vector for the query".to_string())
            })?;

        let hits = self.knowledge.index().search(&query_vector, top_k)?;

        hits.into_iter()
            .map(|hit| {
                self.knowledge
                    .chunk(hit.index)
                    .map(|chunk| (chunk, hit.score))
                    .ok_or_else(|| {
                        HandbookError::Retrieval(format!("index row {} has no chunk", hit.index))
                    })
            })
            .collect()
    }
}
