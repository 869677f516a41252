pub mod chunking;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod query;
pub mod retrieval;
pub mod store;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use chunking::{split, split_texts, ChunkingConfig};
pub use config::{RagConfig, ResolvedConfig};
pub use context::{Dependencies, DependencyProvider, InitState, LiveProvider, RagContext};
pub use embeddings::{CharacterNgramEmbedder, Embedder, OpenAiEmbedder};
pub use error::{ExtractionError, IngestError, InitError, QueryError, StoreError, UpstreamError};
pub use extractor::{LopdfExtractor, PageOutcome, PdfExtractor};
pub use generation::{Generator, OpenAiGenerator};
pub use ingest::{discover_pdf_files, IngestedPdf, IngestionPipeline, IngestionReport, SkippedPdf};
pub use models::{
    Chunk, HealthReport, InitPhase, QueryResult, RawDocument, RelevantChunk, ScoredChunk,
    MAX_DOCUMENT_BYTES,
};
pub use query::QueryPipeline;
pub use retrieval::RetrievalIndex;
pub use store::{VectorStore, COLLECTION_NAME};
pub use stores::{InMemoryIndex, QdrantStore};
pub use traits::VectorIndex;
