use crate::generation::Generator;
use crate::store::VectorStore;
use crate::{QueryError, ScoredChunk};
use std::sync::Arc;

/// Number of chunks placed into the prompt.
pub const CONTEXT_CHUNKS: usize = 4;

/// Answers questions by retrieving context from a store and prompting a generator.
#[derive(Clone)]
pub struct RetrievalIndex {
    store: VectorStore,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl RetrievalIndex {
    pub fn new(store: VectorStore, generator: Arc<dyn Generator>) -> Self {
        Self {
            store,
            generator,
            k: CONTEXT_CHUNKS,
        }
    }

    pub async fn query(&self, question: &str) -> Result<String, QueryError> {
        let context = self.store.similarity_search_with_score(question, self.k).await?;
        let prompt = build_prompt(question, &context);
        Ok(self.generator.generate(&prompt).await?)
    }
}

fn build_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let passages = context
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question at the end using only the context below. \
         If the context does not contain the answer, say that you don't know.\n\n\
         {passages}\n\nQuestion: {question}\nAnswer:"
    )
}
