// Answer formatting
// Builds answers by quoting retrieved chunks verbatim with page citations


use std::collections::BTreeMap;

use itertools::Itertools;

use crate::embeddings::chunking::Chunk;
use crate::retrieval::SourceView;

/// Answer given when nothing in the handbook is relevant enough
pub const DECLINE_MESSAGE: &str = "I don't have that in the handbook.";

/// Shown when the persisted index cannot be loaded
pub const LOAD_ERROR_MESSAGE: &str = "Error loading the handbook index.";

/// Characters of chunk text shown in a source preview
const PREVIEW_CHARS: usize = 200;

/// Concatenate chunk texts into an answer with page citations.
///
/// Chunks are grouped by page and the groups are emitted in ascending page
/// order; inside a group the input order is kept. Each group is its chunk
/// texts joined by newlines followed by " (p. N)", and groups are separated
/// by a blank line. An empty input produces [`DECLINE_MESSAGE`].
#[inline]
pub fn format_answer<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut pages: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for chunk in chunks {
        pages.entry(chunk.page).or_default().push(&chunk.text);
    }

    if pages.is_empty() {
        return DECLINE_MESSAGE.to_string();
    }

    pages
        .into_iter()
        .map(|(page, texts)| format!("{} (p. {})", texts.join("\n"), page))
        .join("\n\n")
}

/// Distinct pages cited by a set of chunks, ascending
#[inline]
pub fn unique_pages<'a, I>(chunks: I) -> Vec<u32>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    chunks
        .into_iter()
        .map(|chunk| chunk.page)
        .sorted_unstable()
        .dedup()
        .collect()
}

/// Render retrieved sources for display, numbered from 1 in retrieval order
#[inline]
pub fn format_sources_display(sources: &[SourceView]) -> String {
    sources
        .iter()
        .enumerate()
        .map(|(number, source)| {
            let preview = source.text.chars().take(PREVIEW_CHARS).collect::<String>();
            format!(
                "\nSource {}:\n  Page: {}\n  Section: {}\n  Similarity: {:.3}\n  Words: {}\n  Preview: {}...\n",
                number + 1,
                source.page,
                source.section,
                source.score,
                source.word_count,
                preview
            )
        })
        .join("")
}
