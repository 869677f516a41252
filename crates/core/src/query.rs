use crate::context::RagContext;
use crate::{QueryError, QueryResult, RelevantChunk, ScoredChunk};
use tracing::info;

pub const DEFAULT_TOP_K: usize = 4;
pub const SNIPPET_CHARS: usize = 300;
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
pub struct QueryPipeline {
    top_k: usize,
    snippet_chars: usize,
}

impl Default for QueryPipeline {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            snippet_chars: SNIPPET_CHARS,
        }
    }
}

impl QueryPipeline {
    /// Generates an answer and lists the nearest stored chunks.
    ///
    /// Generation and the listed chunks come from two separate searches, so
    /// the chunks shown may differ from the ones the answer was built on.
    pub async fn answer(
        &self,
        context: &RagContext,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let dependencies = context
            .ensure_ready()
            .await
            .map_err(QueryError::NotInitialized)?;

        info!(question = %preview(question, 100), "processing query");

        let answer = dependencies.retrieval.query(question).await?;
        let hits = dependencies
            .store
            .similarity_search_with_score(question, self.top_k)
            .await?;

        let relevant = hits
            .into_iter()
            .map(|hit| self.to_relevant(hit))
            .collect::<Vec<_>>();

        info!(relevant = relevant.len(), "query answered");
        Ok(QueryResult {
            answer: answer.trim().to_string(),
            relevant,
        })
    }

    fn to_relevant(&self, hit: ScoredChunk) -> RelevantChunk {
        RelevantChunk {
            content: truncate_snippet(&hit.text, self.snippet_chars),
            score: hit.score,
        }
    }
}

/// Cuts `text` to `max_chars` chars, marking the cut with an ellipsis.
pub fn truncate_snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{ELLIPSIS}", &text[..byte_index]),
        None => text.to_string(),
    }
}

fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RagContext;
    use crate::models::InitPhase;
    use crate::test_support::{FakeProvider, FixedExtractor};
    use crate::{IngestionPipeline, RawDocument};
    use std::sync::Arc;

    #[test]
    fn snippets_at_the_limit_are_untouched() {
        let text = "a".repeat(300);
        assert_eq!(truncate_snippet(&text, 300), text);
    }

    #[test]
    fn long_snippets_gain_an_ellipsis() {
        let text = "b".repeat(301);
        let snippet = truncate_snippet(&text, 300);
        assert_eq!(snippet.len(), 303);
        assert!(snippet.ends_with("b..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "ü".repeat(10);
        assert_eq!(truncate_snippet(&text, 4), "üüüü...");
    }

    #[tokio::test]
    async fn blank_questions_never_touch_dependencies() {
        let (context, provider) = FakeProvider::context();
        let pipeline = QueryPipeline::default();

        for question in ["", "   ", "\n\t"] {
            let result = pipeline.answer(&context, question).await;
            assert!(matches!(result, Err(QueryError::EmptyQuestion)));
        }

        assert_eq!(provider.connects(), 0);
        assert_eq!(context.phase(), InitPhase::Uninitialized);
    }

    #[tokio::test]
    async fn failed_initialization_is_reported() {
        let provider = Arc::new(FakeProvider::failing(1));
        let context = RagContext::new(crate::test_support::complete_config(), provider);

        let result = QueryPipeline::default().answer(&context, "anything?").await;
        assert!(matches!(result, Err(QueryError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn answer_includes_trimmed_generation_and_ranked_snippets() {
        let (context, provider) = FakeProvider::context();
        let long_passage = format!("The sky is blue on clear days. {}", "x".repeat(400));
        for text in [
            "The grass is green.",
            long_passage.as_str(),
            "Hydraulic pumps need maintenance.",
        ] {
            IngestionPipeline::new(FixedExtractor::text(text))
                .ingest(&context, &RawDocument::new(Vec::new()))
                .await
                .unwrap();
        }

        let result = QueryPipeline::default()
            .answer(&context, "  What colour is the sky?  ")
            .await
            .unwrap();

        assert_eq!(result.answer, "The sky is blue.");
        assert_eq!(result.relevant.len(), 3);
        assert!(result
            .relevant
            .windows(2)
            .all(|pair| pair[0].score >= pair[1].score));
        assert!(result
            .relevant
            .iter()
            .all(|chunk| chunk.content.chars().count() <= SNIPPET_CHARS + ELLIPSIS.len()));
        assert!(result
            .relevant
            .iter()
            .any(|chunk| chunk.content.ends_with(ELLIPSIS)));

        let prompts = provider.generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Question: What colour is the sky?"));
    }

    #[tokio::test]
    async fn at_most_top_k_snippets_are_returned() {
        let (context, _provider) = FakeProvider::context();
        let pipeline = IngestionPipeline::new(FixedExtractor::text("repeated fact"));
        for _ in 0..6 {
            pipeline
                .ingest(&context, &RawDocument::new(Vec::new()))
                .await
                .unwrap();
        }

        let result = QueryPipeline::default()
            .answer(&context, "fact")
            .await
            .unwrap();
        assert_eq!(result.relevant.len(), DEFAULT_TOP_K);
    }
}
