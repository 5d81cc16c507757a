use common::error::ExtractionError;
use lopdf::Document;
use tracing::{debug, warn};

use super::Extractor;

/// Extracts text from PDF uploads page by page.
///
/// A page that fails to decode is skipped with a warning instead of failing
/// the whole document; scanned or image-only pages commonly produce nothing.
pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| ExtractionError::Malformed(format!("Unable to parse PDF: {e}")))?;

        let mut pages_extracted = 0u32;
        let mut pages_skipped = 0u32;
        let mut text = String::new();

        for (page_number, _) in document.get_pages() {
            match document.extract_text(&[page_number]) {
                Ok(page_text) => {
                    if !page_text.trim().is_empty() {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(page_text.trim());
                        pages_extracted += 1;
                    }
                }
                Err(e) => {
                    pages_skipped += 1;
                    warn!(page = page_number, "Skipping unreadable PDF page: {e}");
                }
            }
        }

        debug!(pages_extracted, pages_skipped, "Finished PDF extraction");
        Ok(text)
    }
}
