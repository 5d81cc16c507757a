use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authorization error: {0}")]
    Auth(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Task join error: {0}")]
    Join(#[from] JoinError),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    Internal(String),
}

/// Failures raised while turning uploaded file bytes into plain text.
///
/// Extraction failures abort ingestion entirely; nothing has been persisted
/// when one of these is returned.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported file type: .{0}")]
    UnsupportedType(String),
    #[error("file is {actual} bytes which exceeds the {limit} byte limit")]
    SizeLimit { limit: usize, actual: usize },
    #[error("extraction exceeded the {0} second budget")]
    Timeout(u64),
    #[error("no textual content found in the file")]
    EmptyContent,
    #[error("malformed document: {0}")]
    Malformed(String),
}
