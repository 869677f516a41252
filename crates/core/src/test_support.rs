use crate::config::{RagConfig, ResolvedConfig};
use crate::context::{DependencyProvider, RagContext};
use crate::embeddings::{CharacterNgramEmbedder, Embedder};
use crate::error::{ExtractionError, InitError, StoreError, UpstreamError};
use crate::extractor::{PageOutcome, PdfExtractor};
use crate::generation::Generator;
use crate::stores::InMemoryIndex;
use crate::traits::VectorIndex;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) fn complete_config() -> RagConfig {
    RagConfig {
        qdrant_url: Some("http://localhost:6333".to_string()),
        qdrant_api_key: Some("qdrant-key".to_string()),
        openai_api_key: Some("sk-test".to_string()),
        ..RagConfig::default()
    }
}

#[derive(Default)]
pub(crate) struct FakeGenerator {
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, UpstreamError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("  The sky is blue.\n".to_string())
    }
}

#[derive(Default)]
pub(crate) struct FakeProvider {
    pub(crate) index: Arc<InMemoryIndex>,
    pub(crate) generator: Arc<FakeGenerator>,
    connects: AtomicUsize,
    connected_dimensions: AtomicUsize,
    failures_left: AtomicUsize,
    embedder_failures_left: AtomicUsize,
    generator_failures_left: AtomicUsize,
}

impl FakeProvider {
    /// Fails the first `failures` connection attempts.
    pub(crate) fn failing(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    /// Fails the first `failures` embedder constructions.
    pub(crate) fn failing_embedder(failures: usize) -> Self {
        Self {
            embedder_failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    /// Fails the first `failures` generator constructions.
    pub(crate) fn failing_generator(failures: usize) -> Self {
        Self {
            generator_failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    pub(crate) fn context() -> (RagContext, Arc<FakeProvider>) {
        let provider = Arc::new(FakeProvider::default());
        (RagContext::new(complete_config(), provider.clone()), provider)
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Vector size passed to the last `connect` call.
    pub(crate) fn connected_dimensions(&self) -> usize {
        self.connected_dimensions.load(Ordering::SeqCst)
    }
}

fn take_failure(left: &AtomicUsize) -> bool {
    left.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl DependencyProvider for FakeProvider {
    async fn connect(
        &self,
        _config: &ResolvedConfig,
        dimensions: usize,
    ) -> Result<Arc<dyn VectorIndex>, InitError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.connected_dimensions.store(dimensions, Ordering::SeqCst);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }

        if take_failure(&self.failures_left) {
            return Err(InitError::Connection(StoreError::Request(
                "backend unavailable".to_string(),
            )));
        }
        Ok(self.index.clone())
    }

    fn embedder(&self, _config: &ResolvedConfig) -> Result<Arc<dyn Embedder>, InitError> {
        if take_failure(&self.embedder_failures_left) {
            return Err(InitError::Client("embedding client unavailable".to_string()));
        }
        Ok(Arc::new(CharacterNgramEmbedder::default()))
    }

    fn generator(&self, _config: &ResolvedConfig) -> Result<Arc<dyn Generator>, InitError> {
        if take_failure(&self.generator_failures_left) {
            return Err(InitError::Client("generation client unavailable".to_string()));
        }
        Ok(self.generator.clone())
    }
}

/// Extractor returning fixed page texts regardless of the input bytes.
pub(crate) struct FixedExtractor {
    pub(crate) pages: Vec<Option<String>>,
}

impl FixedExtractor {
    pub(crate) fn text(text: &str) -> Self {
        Self {
            pages: vec![Some(text.to_string())],
        }
    }
}

impl PdfExtractor for FixedExtractor {
    fn extract_pages(&self, _bytes: &[u8]) -> Result<Vec<PageOutcome>, ExtractionError> {
        Ok(self
            .pages
            .iter()
            .zip(1u32..)
            .map(|(page, number)| match page {
                Some(text) if !text.is_empty() => PageOutcome::Text {
                    number,
                    text: text.clone(),
                },
                _ => PageOutcome::Empty { number },
            })
            .collect())
    }
}
