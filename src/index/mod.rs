#[cfg(test)]
mod tests;

use tracing::debug;

use crate::{HandbookError, Result};

/// Exact inner-product index over L2-normalized vectors.
///
/// Every search compares the query against every stored row, so results are
/// exact. Rows are stored contiguously in insertion order and are never
/// modified after `build`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

/// A single search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    /// Row position in the index, which is also the chunk position
    pub index: usize,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}

impl VectorIndex {
    /// Build an index from raw embedding rows, normalizing each row.
    ///
    /// Rows with zero norm are kept as zero vectors; they score 0 against
    /// every query.
    #[inline]
    pub fn build(dimension: usize, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if dimension == 0 {
            return Err(HandbookError::Config(
                "embedding dimension must be positive".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for (row, mut vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(HandbookError::Embedding(format!(
                    "vector {} has dimension {}, expected {}",
                    row,
                    vector.len(),
                    dimension
                )));
            }
            normalize_l2(&mut vector);
            data.extend_from_slice(&vector);
        }

        let index = Self { dimension, data };
        debug!(
            "Built vector index with {} rows of dimension {}",
            index.len(),
            dimension
        );
        Ok(index)
    }

    /// Rebuild an index from rows that were normalized when first built
    #[inline]
    pub fn from_normalized(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(HandbookError::Storage(format!(
                "{} values do not form rows of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored rows
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Normalized row at `index`
    #[inline]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        self.data.chunks_exact(self.dimension).nth(index)
    }

    /// All normalized values, row after row
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Return the `k` rows most similar to `query`.
    ///
    /// Results are ordered by descending score, ties going to the lower row
    /// index. Asking for more rows than the index holds returns every row.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(HandbookError::Retrieval(format!(
                "query has dimension {}, index has dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut query = query.to_vec();
        normalize_l2(&mut query);

        let mut hits = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, row)| SearchHit {
                index,
                score: inner_product(row, &query),
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
        hits.truncate(k);

        Ok(hits)
    }
}

/// Scale `vector` to unit Euclidean length; zero vectors are left untouched
#[inline]
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = inner_product(vector, vector).sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| x.mul_add(*y, acc))
}
