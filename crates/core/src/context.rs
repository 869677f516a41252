//! Process-wide handles to the embedding provider, the generative model and
//! the vector database.
//!
//! [`RagContext`] owns an explicit [`InitState`]. The first call to
//! [`RagContext::ensure_ready`] (and every call after a failure) runs the
//! whole initialization sequence behind an async mutex, so concurrent
//! callers wait for one attempt instead of racing. Once `Ready`, the state
//! never changes again and readiness checks only take a read lock.

use crate::config::{RagConfig, ResolvedConfig};
use crate::embeddings::{Embedder, OpenAiEmbedder};
use crate::error::InitError;
use crate::generation::{Generator, OpenAiGenerator};
use crate::retrieval::RetrievalIndex;
use crate::store::{VectorStore, COLLECTION_NAME};
use crate::stores::QdrantStore;
use crate::traits::VectorIndex;
use crate::{HealthReport, InitPhase};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Everything a pipeline needs once initialization succeeded.
pub struct Dependencies {
    pub store: VectorStore,
    pub retrieval: RetrievalIndex,
}

/// Builds the external handles. Swapped for fakes in tests.
#[async_trait]
pub trait DependencyProvider: Send + Sync {
    /// Opens the vector database and prepares the collection for vectors
    /// of `dimensions` components.
    async fn connect(
        &self,
        config: &ResolvedConfig,
        dimensions: usize,
    ) -> Result<Arc<dyn VectorIndex>, InitError>;

    fn embedder(&self, config: &ResolvedConfig) -> Result<Arc<dyn Embedder>, InitError>;

    fn generator(&self, config: &ResolvedConfig) -> Result<Arc<dyn Generator>, InitError>;
}

/// Qdrant for vectors, OpenAI for embeddings and answers.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiveProvider;

#[async_trait]
impl DependencyProvider for LiveProvider {
    async fn connect(
        &self,
        config: &ResolvedConfig,
        dimensions: usize,
    ) -> Result<Arc<dyn VectorIndex>, InitError> {
        let store = QdrantStore::new(
            &config.qdrant_url,
            &config.qdrant_api_key,
            COLLECTION_NAME,
            dimensions,
            config.request_timeout,
        )
        .map_err(InitError::Connection)?;
        store.ensure_collection().await.map_err(InitError::Connection)?;
        info!(url = %config.qdrant_url, collection = store.collection(), "vector database connected");
        Ok(Arc::new(store))
    }

    fn embedder(&self, config: &ResolvedConfig) -> Result<Arc<dyn Embedder>, InitError> {
        let embedder = OpenAiEmbedder::new(
            &config.openai_api_key,
            &config.openai_base_url,
            config.embedding_model.clone(),
            config.embedding_dimensions,
            config.request_timeout,
        )
        .map_err(|error| InitError::Client(error.to_string()))?;
        Ok(Arc::new(embedder))
    }

    fn generator(&self, config: &ResolvedConfig) -> Result<Arc<dyn Generator>, InitError> {
        let generator = OpenAiGenerator::new(
            &config.openai_api_key,
            &config.openai_base_url,
            config.completion_model.clone(),
            config.request_timeout,
        )
        .map_err(|error| InitError::Client(error.to_string()))?;
        Ok(Arc::new(generator))
    }
}

pub enum InitState {
    Uninitialized,
    Ready(Arc<Dependencies>),
    Failed { reason: String },
}

impl InitState {
    pub fn phase(&self) -> InitPhase {
        match self {
            InitState::Uninitialized => InitPhase::Uninitialized,
            InitState::Ready(_) => InitPhase::Ready,
            InitState::Failed { .. } => InitPhase::Failed,
        }
    }

    /// `Uninitialized | Failed -> Ready | Failed` after one attempt.
    fn after_attempt(
        result: Result<Dependencies, InitError>,
    ) -> (InitState, Result<Arc<Dependencies>, InitError>) {
        match result {
            Ok(dependencies) => {
                let dependencies = Arc::new(dependencies);
                (InitState::Ready(dependencies.clone()), Ok(dependencies))
            }
            Err(error) => (
                InitState::Failed {
                    reason: error.to_string(),
                },
                Err(error),
            ),
        }
    }
}

pub struct RagContext {
    config: RagConfig,
    provider: Arc<dyn DependencyProvider>,
    state: RwLock<InitState>,
    init_lock: Mutex<()>,
    attempts: AtomicU32,
}

impl RagContext {
    pub fn new(config: RagConfig, provider: Arc<dyn DependencyProvider>) -> Self {
        Self {
            config,
            provider,
            state: RwLock::new(InitState::Uninitialized),
            init_lock: Mutex::new(()),
            attempts: AtomicU32::new(0),
        }
    }

    pub fn live(config: RagConfig) -> Self {
        Self::new(config, Arc::new(LiveProvider))
    }

    /// Returns the cached handles, initializing them first if needed.
    pub async fn ensure_ready(&self) -> Result<Arc<Dependencies>, InitError> {
        if let Some(dependencies) = self.ready() {
            return Ok(dependencies);
        }

        let _guard = self.init_lock.lock().await;
        if let Some(dependencies) = self.ready() {
            return Ok(dependencies);
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let (next, outcome) = InitState::after_attempt(self.initialize().await);
        *self.write_state() = next;

        match &outcome {
            Ok(_) => info!(attempt, "dependencies initialized"),
            Err(error) => warn!(attempt, error = %error, "failed to initialize dependencies"),
        }
        outcome
    }

    pub fn phase(&self) -> InitPhase {
        self.read_state().phase()
    }

    /// Reason recorded by the last failed attempt, if the context is `Failed`.
    pub fn last_failure(&self) -> Option<String> {
        match &*self.read_state() {
            InitState::Failed { reason } => Some(reason.clone()),
            _ => None,
        }
    }

    /// Number of initialization sequences started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn health(&self) -> HealthReport {
        let phase = self.phase();
        let ready = phase == InitPhase::Ready;
        HealthReport {
            phase,
            vector_store: ready,
            llm: ready,
            embedding: ready,
        }
    }

    async fn initialize(&self) -> Result<Dependencies, InitError> {
        let config = self.config.validate()?;

        // Clients are built before connecting: the collection is sized by
        // the embedder.
        let embedder = self.provider.embedder(&config)?;
        let generator = self.provider.generator(&config)?;
        info!(
            embedding_model = %config.embedding_model,
            completion_model = %config.completion_model,
            dimensions = embedder.dimensions(),
            "model clients initialized"
        );

        let index = self.provider.connect(&config, embedder.dimensions()).await?;

        let store = VectorStore::new(COLLECTION_NAME, index, embedder);
        let retrieval = RetrievalIndex::new(store.clone(), generator);

        Ok(Dependencies { store, retrieval })
    }

    fn ready(&self) -> Option<Arc<Dependencies>> {
        match &*self.read_state() {
            InitState::Ready(dependencies) => Some(dependencies.clone()),
            _ => None,
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, InitState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, InitState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::NGRAM_DIMENSIONS;
    use crate::test_support::{complete_config, FakeProvider};

    fn assert_nothing_exposed(context: &RagContext) {
        let health = context.health();
        assert_eq!(health.phase, InitPhase::Failed);
        assert!(!health.vector_store && !health.llm && !health.embedding);
        assert!(context.ready().is_none());
        assert!(context.last_failure().is_some());
    }

    #[tokio::test]
    async fn health_is_all_false_before_first_call() {
        let (context, _provider) = FakeProvider::context();
        let health = context.health();

        assert_eq!(health.phase, InitPhase::Uninitialized);
        assert!(!health.vector_store && !health.llm && !health.embedding);
    }

    #[tokio::test]
    async fn ready_context_reports_all_dependencies() {
        let (context, provider) = FakeProvider::context();
        context.ensure_ready().await.expect("init should succeed");

        let health = context.health();
        assert_eq!(health.phase, InitPhase::Ready);
        assert!(health.is_healthy());
        assert_eq!(provider.connects(), 1);
    }

    #[tokio::test]
    async fn repeated_calls_reuse_the_same_handles() {
        let (context, provider) = FakeProvider::context();
        let first = context.ensure_ready().await.unwrap();
        let second = context.ensure_ready().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(context.attempts(), 1);
        assert_eq!(provider.connects(), 1);
    }

    #[tokio::test]
    async fn missing_config_fails_without_contacting_backends() {
        let provider = Arc::new(FakeProvider::default());
        let context = RagContext::new(RagConfig::default(), provider.clone());

        let result = context.ensure_ready().await;
        assert!(matches!(result, Err(InitError::ConfigMissing { .. })));
        assert_eq!(context.phase(), InitPhase::Failed);
        assert_eq!(provider.connects(), 0);

        assert!(context.ensure_ready().await.is_err());
        assert_eq!(context.attempts(), 2);
    }

    #[tokio::test]
    async fn failed_initialization_is_retried_on_next_call() {
        let provider = Arc::new(FakeProvider::failing(2));
        let context = RagContext::new(complete_config(), provider.clone());

        assert!(matches!(
            context.ensure_ready().await,
            Err(InitError::Connection(_))
        ));
        assert!(context.last_failure().is_some());
        assert!(!context.health().is_healthy());

        assert!(context.ensure_ready().await.is_err());
        assert!(context.ensure_ready().await.is_ok());

        assert_eq!(context.phase(), InitPhase::Ready);
        assert_eq!(context.last_failure(), None);
        assert_eq!(provider.connects(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_calls_initialize_once() {
        let (context, provider) = FakeProvider::context();
        let context = Arc::new(context);

        let handles = (0..16)
            .map(|_| {
                let context = context.clone();
                tokio::spawn(async move { context.ensure_ready().await })
            })
            .collect::<Vec<_>>();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().expect("every caller should see success"));
        }

        assert_eq!(provider.connects(), 1);
        assert_eq!(context.attempts(), 1);
        assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[tokio::test]
    async fn collection_is_sized_by_the_embedder() {
        let (context, provider) = FakeProvider::context();
        context.ensure_ready().await.unwrap();

        assert_ne!(complete_config().embedding_dimensions, NGRAM_DIMENSIONS);
        assert_eq!(provider.connected_dimensions(), NGRAM_DIMENSIONS);
    }

    #[tokio::test]
    async fn embedder_failure_exposes_no_handles() {
        let provider = Arc::new(FakeProvider::failing_embedder(1));
        let context = RagContext::new(complete_config(), provider.clone());

        assert!(matches!(
            context.ensure_ready().await,
            Err(InitError::Client(_))
        ));
        assert_nothing_exposed(&context);
        assert_eq!(provider.connects(), 0);

        let dependencies = context.ensure_ready().await.unwrap();
        assert!(context.health().is_healthy());
        assert_eq!(dependencies.store.collection(), COLLECTION_NAME);
        assert_eq!(context.attempts(), 2);
    }

    #[tokio::test]
    async fn generator_failure_after_embedder_exposes_no_handles() {
        let provider = Arc::new(FakeProvider::failing_generator(1));
        let context = RagContext::new(complete_config(), provider.clone());

        assert!(matches!(
            context.ensure_ready().await,
            Err(InitError::Client(_))
        ));
        assert_nothing_exposed(&context);
        assert_eq!(provider.connects(), 0);

        assert!(context.ensure_ready().await.is_ok());
        assert!(context.health().is_healthy());
        assert_eq!(provider.connects(), 1);
    }

    #[tokio::test]
    async fn connect_failure_after_clients_exposes_no_handles() {
        let provider = Arc::new(FakeProvider::failing(1));
        let context = RagContext::new(complete_config(), provider.clone());

        assert!(context.ensure_ready().await.is_err());
        assert_nothing_exposed(&context);
        assert!(provider.generator.prompts().is_empty());

        assert!(context.ensure_ready().await.is_ok());
        assert_eq!(context.phase(), InitPhase::Ready);
    }
}
