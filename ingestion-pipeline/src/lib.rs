pub mod chunker;
pub mod extract;
pub mod pipeline;

pub use pipeline::{IngestionOutcome, IngestionPipeline, IngestionStatus};
