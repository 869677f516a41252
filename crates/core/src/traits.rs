use crate::{ScoredChunk, StoreError};
use async_trait::async_trait;

/// Backend that persists vectors and answers nearest-neighbour queries
/// within one collection.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Stores one record per text and returns the ids the backend assigned.
    async fn add(&self, texts: &[String], embeddings: &[Vec<f32>]) -> Result<Vec<String>, StoreError>;

    async fn similarity_search(
        &self,
        query_vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError>;
}
