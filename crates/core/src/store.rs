use crate::embeddings::{Embedder, EMBEDDING_BATCH_SIZE};
use crate::traits::VectorIndex;
use crate::{ScoredChunk, StoreError};
use std::sync::Arc;
use tracing::debug;

/// Logical collection every deployment reads from and writes to.
pub const COLLECTION_NAME: &str = "pdf_query";

/// A vector index bound to a collection and to the embedder that fills it.
#[derive(Clone)]
pub struct VectorStore {
    collection: String,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
}

impl VectorStore {
    pub fn new(
        collection: impl Into<String>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            collection: collection.into(),
            index,
            embedder,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Embeds each text and persists it. Returns the store-assigned ids.
    ///
    /// Texts are embedded and stored in batches of `EMBEDDING_BATCH_SIZE`.
    /// Batches are not written atomically: when one fails, the batches
    /// before it stay persisted and the error is returned.
    pub async fn add_texts(&self, texts: &[String]) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            let embeddings = self.embedder.embed_batch(batch).await?;
            ids.extend(self.index.add(batch, &embeddings).await?);
            debug!(collection = %self.collection, stored = ids.len(), total = texts.len(), "stored chunk batch");
        }

        Ok(ids)
    }

    pub async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let query_vector = self.embedder.embed(query).await?;
        self.index.similarity_search(&query_vector, k).await
    }
}
