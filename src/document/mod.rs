// Document module
// Turns the handbook into page-numbered plain text


use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use fancy_regex::Regex;
use tracing::{debug, info};

/// Page number (1-based) to page text, iterated in ascending page order
pub type PageTexts = BTreeMap<u32, String>;

/// Page separator written by `pdftotext` and most text exporters
pub const PAGE_SEPARATOR: char = '\u{000C}';

static REPEATED_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +").expect("valid regex"));
static EXCESS_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n\s*\n+").expect("valid regex"));

/// Source of page-scoped plain text for a document
pub trait DocumentTextProvider {
    /// Extract every page of `document`.
    ///
    /// Page numbers are 1-based and contiguous. A page without extractable
    /// text (an image-only page, say) maps to an empty string.
    fn extract(&self, document: &Path) -> Result<PageTexts>;
}

/// Reads a UTF-8 text export where pages are separated by form feeds
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

impl DocumentTextProvider for PlainTextExtractor {
    #[inline]
    fn extract(&self, document: &Path) -> Result<PageTexts> {
        info!("Extracting text from {}", document.display());

        let raw = fs::read_to_string(document)
            .with_context(|| format!("Failed to read document: {}", document.display()))?;

        let pages = split_pages(&raw);
        debug!(
            "Extracted {} pages ({} with text)",
            pages.len(),
            pages.values().filter(|text| !text.is_empty()).count()
        );

        Ok(pages)
    }
}

/// Split a text export into cleaned, 1-based pages.
///
/// A trailing separator (as `pdftotext` writes after the last page) does not
/// produce an extra page.
#[inline]
pub fn split_pages(raw: &str) -> PageTexts {
    let mut parts = raw.split(PAGE_SEPARATOR).collect::<Vec<_>>();
    if parts.len() > 1 && parts.last().is_some_and(|last| last.trim().is_empty()) {
        parts.pop();
    }

    parts
        .into_iter()
        .zip(1u32..)
        .map(|(text, page)| (page, clean_text(text)))
        .collect()
}

/// Normalize extracted page text.
///
/// Runs of spaces become one space, three or more line breaks (with any
/// whitespace between them) become a single paragraph break, and the result
/// is trimmed.
#[inline]
pub fn clean_text(text: &str) -> String {
    let text = REPEATED_SPACES.replace_all(text, " ");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}
