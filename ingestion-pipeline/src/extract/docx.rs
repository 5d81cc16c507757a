use std::io::{Cursor, Read};

use common::error::ExtractionError;
use zip::ZipArchive;

use super::Extractor;

/// Extracts text from DOCX uploads.
///
/// A DOCX file is a zip archive; the document body lives in
/// `word/document.xml`. Text runs sit inside `<w:t>` elements and paragraphs
/// are `<w:p>` elements, so a small tag scanner is enough; no full XML parse
/// is needed for plain text.
pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| ExtractionError::Malformed(format!("Invalid DOCX archive: {e}")))?;

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractionError::Malformed(format!("DOCX has no document body: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| ExtractionError::Malformed(format!("Unreadable DOCX body: {e}")))?;

        Ok(plaintext_from_document_xml(&xml))
    }
}

fn plaintext_from_document_xml(xml: &str) -> String {
    let mut result = String::new();
    let mut in_text = false;
    let mut chars = xml.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '<' {
            let mut tag = String::new();
            for tc in chars.by_ref() {
                if tc == '>' {
                    break;
                }
                tag.push(tc);
            }

            if tag.starts_with("w:t") && !tag.starts_with("w:t/") && !tag.ends_with('/') {
                in_text = true;
            } else if tag == "/w:t" {
                in_text = false;
            } else if tag.starts_with("w:p") && !tag.starts_with("w:p/") && !tag.ends_with('/') {
                // Paragraph boundary becomes a newline.
                if !result.is_empty() && !result.ends_with('\n') {
                    result.push('\n');
                }
            }
        } else if in_text {
            result.push(c);
        }
    }

    result
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;

    use super::*;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("word/document.xml", FileOptions::default())
                .expect("start_file failed");
            writer
                .write_all(document_xml.as_bytes())
                .expect("write failed");
            writer.finish().expect("finish failed");
        }
        buffer.into_inner()
    }

    #[test]
    fn test_text_runs_and_paragraphs() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t xml:space="preserve"> part.</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = DocxExtractor
            .extract(&docx_bytes(xml))
            .expect("extract failed");
        assert_eq!(text.trim(), "First paragraph.\nSecond part.");
    }

    #[test]
    fn test_entities_are_decoded() {
        let xml = "<w:p><w:t>Fish &amp; chips &lt;today&gt;</w:t></w:p>";
        let text = DocxExtractor
            .extract(&docx_bytes(xml))
            .expect("extract failed");
        assert_eq!(text.trim(), "Fish & chips <today>");
    }

    #[test]
    fn test_not_a_zip_is_malformed() {
        let result = DocxExtractor.extract(b"plain bytes, not an archive");
        assert!(matches!(result, Err(ExtractionError::Malformed(_))));
    }

    #[test]
    fn test_zip_without_document_body_is_malformed() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer
                .start_file("unrelated.txt", FileOptions::default())
                .expect("start_file failed");
            writer.write_all(b"hello").expect("write failed");
            writer.finish().expect("finish failed");
        }
        let result = DocxExtractor.extract(&buffer.into_inner());
        assert!(matches!(result, Err(ExtractionError::Malformed(_))));
    }
}
