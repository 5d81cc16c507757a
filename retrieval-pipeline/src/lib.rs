pub mod chat;
pub mod vector_index;

pub use chat::{ChatOrchestrator, ChatRole, ChatTurn};
pub use vector_index::{IndexStats, ScoredRecord, VectorIndex, VectorMetadata, VectorRecord};
