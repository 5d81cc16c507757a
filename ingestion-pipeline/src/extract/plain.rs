use common::error::ExtractionError;
use tracing::warn;

use super::Extractor;

/// Handles `.txt` and `.md` uploads. Markdown is passed through as-is; its
/// markup survives into chunks, which is acceptable for retrieval.
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(_) => {
                warn!("Upload is not valid UTF-8, decoding lossily");
                Ok(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_is_untouched() {
        let text = PlainTextExtractor
            .extract("håller med, ärligt".as_bytes())
            .expect("extract failed");
        assert_eq!(text, "håller med, ärligt");
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_lossy() {
        let bytes = vec![b'o', b'k', 0xFF, b'!'];
        let text = PlainTextExtractor.extract(&bytes).expect("extract failed");
        assert_eq!(text, "ok\u{FFFD}!");
    }
}
