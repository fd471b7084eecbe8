//! Pluggable PDF page loading. The default backend extracts plain page
//! text via lopdf; richer backends can supply full word geometry.

use std::path::Path;

use crate::geometry::PageGeometry;
use crate::NormalizerError;

/// One page of input for the normalizer: full word/char geometry when the
/// backend can provide it, otherwise raw page text.
#[derive(Debug, Clone)]
pub enum PageInput {
    Geometry(PageGeometry),
    Text(String),
}

/// Source of page content for normalization.
pub trait GeometryBackend: Send + Sync {
    fn load_pages(&self, path: &Path) -> Result<Vec<PageInput>, NormalizerError>;

    fn load_pages_from_bytes(&self, bytes: &[u8]) -> Result<Vec<PageInput>, NormalizerError>;
}

/// Pure-Rust backend over lopdf. Produces text-only pages; geometry-driven
/// column detection still applies to inputs that carry geometry from other
/// sources.
#[derive(Debug, Default, Clone)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }

    fn pages_from_document(doc: &lopdf::Document) -> Result<Vec<PageInput>, NormalizerError> {
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        if page_numbers.is_empty() {
            return Err(NormalizerError::Empty("document has no pages".into()));
        }

        let mut pages = Vec::with_capacity(page_numbers.len());
        let mut any_text = false;
        for page_no in page_numbers {
            let text = match doc.extract_text(&[page_no]) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(page = page_no, %err, "failed to extract page text");
                    String::new()
                }
            };
            if !text.trim().is_empty() {
                any_text = true;
            }
            pages.push(PageInput::Text(text));
        }

        if !any_text {
            return Err(NormalizerError::Empty(
                "no extractable text in any page".into(),
            ));
        }
        Ok(pages)
    }
}

impl GeometryBackend for LopdfBackend {
    fn load_pages(&self, path: &Path) -> Result<Vec<PageInput>, NormalizerError> {
        let doc = lopdf::Document::load(path)
            .map_err(|err| NormalizerError::Open(err.to_string()))?;
        Self::pages_from_document(&doc)
    }

    fn load_pages_from_bytes(&self, bytes: &[u8]) -> Result<Vec<PageInput>, NormalizerError> {
        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|err| NormalizerError::Open(err.to_string()))?;
        Self::pages_from_document(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_bytes_report_open_error() {
        let backend = LopdfBackend::new();
        let err = backend
            .load_pages_from_bytes(b"not a pdf at all")
            .unwrap_err();
        assert!(matches!(err, NormalizerError::Open(_)));
    }

    #[test]
    fn missing_file_reports_open_error() {
        let backend = LopdfBackend::new();
        let err = backend
            .load_pages(Path::new("/nonexistent/paper.pdf"))
            .unwrap_err();
        assert!(matches!(err, NormalizerError::Open(_)));
    }
}
