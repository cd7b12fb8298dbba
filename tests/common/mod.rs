// Deterministic embedding provider for integration tests

#![allow(dead_code, reason = "each test binary uses a different subset")]

use handbook_rag::embeddings::EmbeddingProvider;

pub const DIMENSION: usize = 256;
pub const MODEL: &str = "hashing-test";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

const STOPWORDS: &[&str] = &[
    "a", "all", "an", "and", "are", "be", "do", "is", "must", "of", "on", "the", "to", "use",
    "what", "which", "we",
];

/// Bag-of-words embedder: every content word adds one to an FNV-1a bucket
pub struct HashingEmbedder;

impl HashingEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSION];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .map(str::to_lowercase)
            .filter(|token| !token.is_empty() && !STOPWORDS.contains(&token.as_str()))
        {
            vector[bucket(&token)] += 1.0;
        }
        vector
    }
}

fn bucket(token: &str) -> usize {
    let hash = token
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME));
    (hash % DIMENSION as u64) as usize
}

impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        MODEL
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| Self::vector(text)).collect())
    }
}

pub const MARGINS_PAGE: &str = "Margins must be one inch on all sides.";
pub const FONTS_PAGE: &str = "Headings use 12pt bold font.";

/// The two-page handbook as a form-feed separated export
pub fn handbook_export() -> String {
    format!("{}\u{000C}{}\u{000C}", MARGINS_PAGE, FONTS_PAGE)
}
