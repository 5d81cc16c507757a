use std::time::Duration;

use common::error::ExtractionError;

mod docx;
mod pdf;
mod plain;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use plain::PlainTextExtractor;

/// File types the ingestion endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    Docx,
    Txt,
    Md,
}

impl FileType {
    pub fn from_extension(extension: &str) -> Result<Self, ExtractionError> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" => Ok(Self::Txt),
            "md" => Ok(Self::Md),
            other => Err(ExtractionError::UnsupportedType(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Md => "md",
        }
    }
}

/// One extractor per file type. The trait keeps the pipeline independent of
/// where extraction runs; swapping an implementation must not change the
/// contract.
pub trait Extractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

fn extractor_for(file_type: FileType) -> Box<dyn Extractor> {
    match file_type {
        FileType::Pdf => Box::new(PdfExtractor),
        FileType::Docx => Box::new(DocxExtractor),
        FileType::Txt | FileType::Md => Box::new(PlainTextExtractor),
    }
}

/// Converts uploaded file bytes into plain text.
///
/// Enforces the byte ceiling before any parsing and a wall-clock budget
/// around the whole extraction, independent of the caller. Parsing runs on
/// the blocking pool.
pub async fn extract_text(
    bytes: Vec<u8>,
    file_type: FileType,
    max_bytes: usize,
    timeout_secs: u64,
) -> Result<String, ExtractionError> {
    if bytes.len() > max_bytes {
        return Err(ExtractionError::SizeLimit {
            limit: max_bytes,
            actual: bytes.len(),
        });
    }

    let handle = tokio::task::spawn_blocking(move || extractor_for(file_type).extract(&bytes));

    let text = match tokio::time::timeout(Duration::from_secs(timeout_secs), handle).await {
        Err(_) => return Err(ExtractionError::Timeout(timeout_secs)),
        Ok(Err(join_err)) => {
            return Err(ExtractionError::Malformed(format!(
                "extraction task failed: {join_err}"
            )))
        }
        Ok(Ok(result)) => result?,
    };

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyContent);
    }

    Ok(text)
}
