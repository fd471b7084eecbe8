//! PDF layout normalization: turns raw page/word geometry into ordered,
//! column-aware, cleaned paragraph blocks.
//!
//! Pipeline per page:
//! 1. If word geometry is degenerate (mostly one-letter tokens), rebuild
//!    tokens from character boxes with a gap-based tokenizer
//! 2. Detect a two-column layout from the word x-center distribution
//! 3. Merge words into lines (vertical tolerance), lines into paragraphs
//!    (vertical gap), short "Heading:" lines into their following line
//! 4. Clean each paragraph: de-hyphenate, repair fragmented URLs, collapse
//!    OCR letter-spacing, drop boilerplate
//!
//! Pages without any geometry fall back to plain double-newline splitting.

use thiserror::Error;

pub mod backend;
pub mod clean;
pub mod columns;
pub mod config;
pub mod geometry;
pub mod paragraphs;

pub use backend::{GeometryBackend, LopdfBackend, PageInput};
pub use config::{NormalizerConfig, NormalizerConfigBuilder};
pub use geometry::{CharBox, PageGeometry, Word};

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("PDF appears to be empty or unreadable: {0}")]
    Empty(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A cleaned paragraph with its position in the document.
///
/// Blocks are ordered by `(page, column, sequence)`; `sequence` is a
/// document-wide monotonic counter assigned at extraction time.
#[derive(Debug, Clone, PartialEq)]
pub struct ParagraphBlock {
    pub text: String,
    pub page: u32,
    pub column: u32,
    pub sequence: u32,
}

/// Column-aware paragraph extractor over page geometry or raw page text.
pub struct TextNormalizer {
    config: NormalizerConfig,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            config: NormalizerConfig::default(),
        }
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Normalize a sequence of pages into ordered paragraph blocks.
    pub fn normalize_pages(&self, pages: &[PageInput]) -> Vec<ParagraphBlock> {
        let mut blocks: Vec<ParagraphBlock> = Vec::new();
        let mut sequence: u32 = 0;

        for (page_idx, page) in pages.iter().enumerate() {
            let page_no = page_idx as u32 + 1;
            match page {
                PageInput::Geometry(geom) => {
                    self.normalize_geometry_page(geom, page_no, &mut sequence, &mut blocks);
                }
                PageInput::Text(text) => {
                    for para in paragraphs::split_simple(text) {
                        if let Some(cleaned) = clean::clean_paragraph(&para) {
                            blocks.push(ParagraphBlock {
                                text: cleaned,
                                page: page_no,
                                column: 0,
                                sequence,
                            });
                            sequence += 1;
                        }
                    }
                }
            }
        }

        blocks.sort_by(|a, b| {
            (a.page, a.column, a.sequence).cmp(&(b.page, b.column, b.sequence))
        });
        blocks
    }

    fn normalize_geometry_page(
        &self,
        geom: &PageGeometry,
        page_no: u32,
        sequence: &mut u32,
        blocks: &mut Vec<ParagraphBlock>,
    ) {
        let mut words = geom.words.clone();

        // Rebuild from chars when extraction produced mostly isolated letters
        if !words.is_empty()
            && geometry::singleton_ratio(&words) > self.config.singleton_rebuild_ratio
            && !geom.chars.is_empty()
        {
            let rebuilt =
                geometry::rebuild_words_from_chars(&geom.chars, self.config.line_merge_tolerance);
            if !rebuilt.is_empty() {
                tracing::debug!(
                    page = page_no,
                    rebuilt = rebuilt.len(),
                    "rebuilt degenerate word geometry from chars"
                );
                words = rebuilt;
            }
        }

        if words.is_empty() {
            return;
        }

        let groups = columns::split_columns(&words, geom.width, &self.config);
        for (column, column_words) in groups.into_iter().enumerate() {
            for paragraph in paragraphs::words_to_paragraphs(&column_words, &self.config) {
                if let Some(cleaned) = clean::clean_paragraph(&paragraph) {
                    blocks.push(ParagraphBlock {
                        text: cleaned,
                        page: page_no,
                        column: column as u32,
                        sequence: *sequence,
                    });
                    *sequence += 1;
                }
            }
        }
    }
}

/// Join blocks into a single normalized document string with paragraph
/// boundaries preserved as blank lines.
pub fn blocks_to_text(blocks: &[ParagraphBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Join blocks into one string per page, preserving page boundaries for
/// per-page consumers (e.g. the availability engine).
pub fn blocks_to_pages(blocks: &[ParagraphBlock]) -> Vec<String> {
    let mut pages: Vec<String> = Vec::new();
    for block in blocks {
        let idx = block.page.saturating_sub(1) as usize;
        while pages.len() <= idx {
            pages.push(String::new());
        }
        if !pages[idx].is_empty() {
            pages[idx].push_str("\n\n");
        }
        pages[idx].push_str(&block.text);
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, x1: f64, top: f64, bottom: f64) -> Word {
        Word {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    /// Two word clusters centered near x=150 and x=450 on a 600pt page
    /// must come out as two ordered column groups.
    #[test]
    fn two_column_page_yields_two_columns() {
        let mut words = Vec::new();
        for row in 0..6 {
            let top = 100.0 + row as f64 * 14.0;
            words.push(word("left", 130.0, 170.0, top, top + 10.0));
            words.push(word("right", 430.0, 470.0, top, top + 10.0));
        }
        let geom = PageGeometry {
            width: 600.0,
            words,
            chars: vec![],
        };
        let normalizer = TextNormalizer::new();
        let blocks = normalizer.normalize_pages(&[PageInput::Geometry(geom)]);

        let columns: std::collections::BTreeSet<u32> = blocks.iter().map(|b| b.column).collect();
        assert_eq!(columns.len(), 2, "expected two column groups: {:?}", blocks);
        // Left column sorts before right
        assert_eq!(blocks[0].column, 0);
        assert!(blocks.iter().all(|b| b.page == 1));
    }

    #[test]
    fn single_cluster_stays_one_column() {
        let mut words = Vec::new();
        for row in 0..4 {
            let top = 100.0 + row as f64 * 14.0;
            words.push(word("alpha", 100.0, 140.0, top, top + 10.0));
            words.push(word("beta", 150.0, 190.0, top, top + 10.0));
        }
        let geom = PageGeometry {
            width: 600.0,
            words,
            chars: vec![],
        };
        let blocks = TextNormalizer::new().normalize_pages(&[PageInput::Geometry(geom)]);
        assert!(blocks.iter().all(|b| b.column == 0));
    }

    #[test]
    fn text_fallback_splits_on_blank_lines() {
        let text = "First paragraph here.\n\nSecond paragraph follows.";
        let blocks = TextNormalizer::new().normalize_pages(&[PageInput::Text(text.into())]);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "First paragraph here.");
        assert_eq!(blocks[1].text, "Second paragraph follows.");
    }

    /// Normalizing already-normalized text is a fixed point.
    #[test]
    fn normalization_is_idempotent() {
        let text = "All data are available at https://zenodo.org/record/12345.\n\nCode is on GitHub.";
        let normalizer = TextNormalizer::new();
        let once = normalizer.normalize_pages(&[PageInput::Text(text.into())]);
        let rejoined = blocks_to_text(&once);
        let twice = normalizer.normalize_pages(&[PageInput::Text(rejoined.clone())]);
        assert_eq!(blocks_to_text(&twice), rejoined);
    }

    #[test]
    fn boilerplate_paragraphs_are_dropped() {
        let text = "ORCID: 0000-0001-2345-6789\n\nReal content survives the filter.\n\nCopyright 2024 The Authors";
        let blocks = TextNormalizer::new().normalize_pages(&[PageInput::Text(text.into())]);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].text.contains("Real content"));
    }

    #[test]
    fn pages_are_kept_separate() {
        let pages = vec![
            PageInput::Text("Page one content.".into()),
            PageInput::Text("Page two content.".into()),
        ];
        let blocks = TextNormalizer::new().normalize_pages(&pages);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].page, 1);
        assert_eq!(blocks[1].page, 2);
        let per_page = blocks_to_pages(&blocks);
        assert_eq!(per_page.len(), 2);
        assert_eq!(per_page[1], "Page two content.");
    }
}
