
use std::sync::LazyLock;

use fancy_regex::Regex;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::PageTexts;
use crate::{HandbookError, Result};

/// Number of leading lines inspected when looking for a heading
const HEADING_SCAN_LINES: usize = 3;
/// Headings shorter or longer than this (in characters) are ignored
const HEADING_MIN_CHARS: usize = 6;
const HEADING_MAX_CHARS: usize = 99;
/// Length of the text prefix used when no heading is found
const SECTION_FALLBACK_CHARS: usize = 50;

static NUMBERED_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.?\s+[A-Z]").expect("valid regex"));

/// A page-scoped window of contiguous words, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential id, equal to the chunk's position in the corpus
    pub id: usize,
    /// The window's words joined by single spaces
    pub text: String,
    /// 1-based source page
    pub page: u32,
    /// Best-effort heading hint
    pub section: String,
    /// Number of whitespace-delimited words in `text`
    pub word_count: usize,
}

/// Configuration for word-window chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per window
    pub target_words: usize,
    /// Fraction of `target_words` shared by consecutive windows, must be below 1
    pub overlap_fraction: f64,
    /// Windows shorter than this are dropped, and pages shorter than this yield nothing
    pub min_words: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            target_words: 350,
            overlap_fraction: 0.30,
            min_words: 50,
        }
    }
}

impl ChunkingConfig {
    /// Words shared by two consecutive windows on the same page
    #[inline]
    pub fn overlap_words(&self) -> usize {
        (self.target_words as f64 * self.overlap_fraction).floor() as usize
    }

    /// Distance between the starts of consecutive windows
    #[inline]
    pub fn stride(&self) -> Result<usize> {
        if !(0.0..1.0).contains(&self.overlap_fraction) {
            return Err(HandbookError::Config(format!(
                "overlap fraction must be in [0, 1), got {}",
                self.overlap_fraction
            )));
        }

        match self.target_words.checked_sub(self.overlap_words()) {
            Some(stride) if stride >= 1 => Ok(stride),
            _ => Err(HandbookError::Config(format!(
                "chunking stride must be at least 1 (target_words = {}, overlap_fraction = {})",
                self.target_words, self.overlap_fraction
            ))),
        }
    }
}

/// Chunk every page in ascending page order, assigning ids from 0
#[inline]
pub fn chunk_pages(pages: &PageTexts, config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    let mut next_id = 0;

    for (page, text) in pages {
        let page_chunks = chunk_page(text, *page, config, &mut next_id)?;
        chunks.extend(page_chunks);
    }

    debug!(
        "Chunked {} pages into {} chunks (avg {} words)",
        pages.len(),
        chunks.len(),
        chunks.iter().map(|c| c.word_count).sum::<usize>() / chunks.len().max(1)
    );

    Ok(chunks)
}

/// Split one page into overlapping word windows.
///
/// Ids are taken from `next_id`, which is advanced past every chunk produced.
/// A page with fewer than `min_words` words yields no chunks. The walk stops
/// at the first window shorter than `min_words`, so no short trailing
/// fragment is ever emitted.
#[inline]
pub fn chunk_page(
    text: &str,
    page: u32,
    config: &ChunkingConfig,
    next_id: &mut usize,
) -> Result<Vec<Chunk>> {
    let stride = config.stride()?;
    let words = text.split_whitespace().collect::<Vec<_>>();

    if words.len() < config.min_words {
        debug!(
            "Page {} has {} words, below minimum of {}",
            page,
            words.len(),
            config.min_words
        );
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    for start in (0..words.len()).step_by(stride) {
        let end = (start + config.target_words).min(words.len());
        let window = &words[start..end];

        if window.len() < config.min_words {
            break;
        }

        let text = window.join(" ");
        chunks.push(Chunk {
            id: *next_id,
            section: extract_section_hint(&text),
            text,
            page,
            word_count: window.len(),
        });
        *next_id += 1;
    }

    Ok(chunks)
}

/// Guess a section heading for a chunk.
///
/// Looks at the first few lines for one that is all upper case or starts
/// like a numbered heading ("3. Methodology"). This is approximate: tables,
/// multi-column layouts and text without line breaks defeat it, in which case
/// the first characters of the text are returned with a "..." marker.
#[inline]
pub fn extract_section_hint(text: &str) -> String {
    for line in text.split('\n').take(HEADING_SCAN_LINES) {
        let line = line.trim();
        let length = line.chars().count();
        if (HEADING_MIN_CHARS..=HEADING_MAX_CHARS).contains(&length)
            && (is_upper_case(line) || matches!(NUMBERED_HEADING.is_match(line), Ok(true)))
        {
            return line.to_string();
        }
    }

    let prefix = text.chars().take(SECTION_FALLBACK_CHARS).collect::<String>();
    format!("{}...", prefix.split_whitespace().join(" "))
}

/// At least one upper-case letter and no lower-case ones
fn is_upper_case(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}
