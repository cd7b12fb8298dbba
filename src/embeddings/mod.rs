// Embeddings module
// Chunking of page text and the providers that turn chunk text into vectors

pub mod chunking;
pub mod ollama;

use anyhow::Result;

pub use chunking::{Chunk, ChunkingConfig, chunk_page, chunk_pages, extract_section_hint};
pub use ollama::OllamaClient;

/// Maps text to fixed-dimension dense vectors.
///
/// Implementations must return one row per input text, in input order, and
/// every row must have `dimension()` entries. The same model identifier must
/// always produce the same dimension.
pub trait EmbeddingProvider {
    /// Identifier of the model producing the vectors
    fn model_id(&self) -> &str;

    /// Length of every vector returned by `embed`
    fn dimension(&self) -> usize;

    /// Embed a batch of texts
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<T> {
    #[inline]
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    #[inline]
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    #[inline]
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }
}
