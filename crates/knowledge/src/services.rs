//! Shared collaborator handles, created on first use.
//!
//! A process builds one [`Services`] at start-up and hands it to whatever
//! serves requests. Nothing here is global.

use crate::chunk::SemanticChunker;
use crate::config::{load_config, RagConfig};
use crate::embeddings::{create_embedder, EmbeddingProvider};
use crate::ingest::Ingestor;
use crate::rag::{QaPipeline, Synthesizer};
use crate::retrieval::Retriever;
use crate::store::{create_store, VectorStore};
use pagewise_core::{AppConfig, AppError, AppResult};
use pagewise_llm::{create_client, LlmClient};
use pagewise_prompt::PromptCatalog;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// A value initialized at most once, on first access.
///
/// Concurrent first callers wait for a single initializer and share its
/// result. A failed initializer leaves the handle empty, so a later call
/// tries again.
pub struct LazyHandle<T> {
    name: &'static str,
    cell: OnceCell<T>,
}

impl<T: Clone> LazyHandle<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    /// Pre-filled handle.
    pub fn ready(name: &'static str, value: T) -> Self {
        Self {
            name,
            cell: OnceCell::new_with(Some(value)),
        }
    }

    pub async fn get_or_init<F, Fut>(&self, init: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let value = self
            .cell
            .get_or_try_init(|| async move {
                tracing::debug!(handle = self.name, "Initializing");
                init().await
            })
            .await?;
        Ok(value.clone())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

/// Everything needed to ingest documents and answer questions.
pub struct Services {
    app: AppConfig,
    rag: RagConfig,
    embedder: LazyHandle<Arc<dyn EmbeddingProvider>>,
    store: LazyHandle<Arc<dyn VectorStore>>,
    llm: LazyHandle<Arc<dyn LlmClient>>,
    prompts: LazyHandle<Arc<PromptCatalog>>,
}

impl Services {
    pub fn new(app: AppConfig, rag: RagConfig) -> Self {
        Self {
            app,
            rag,
            embedder: LazyHandle::new("embedder"),
            store: LazyHandle::new("store"),
            llm: LazyHandle::new("llm"),
            prompts: LazyHandle::new("prompts"),
        }
    }

    /// Services for `app.workspace`, with tuning read from its `rag.yaml`.
    pub fn from_workspace(app: AppConfig) -> AppResult<Self> {
        let rag = load_config(&app.workspace)?;
        Ok(Self::new(app, rag))
    }

    /// Replace collaborators with ready-made instances.
    pub fn with_collaborators(
        mut self,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        self.embedder = LazyHandle::ready("embedder", embedder);
        self.store = LazyHandle::ready("store", store);
        self.llm = LazyHandle::ready("llm", llm);
        self
    }

    pub fn app_config(&self) -> &AppConfig {
        &self.app
    }

    pub fn rag_config(&self) -> &RagConfig {
        &self.rag
    }

    pub async fn embedder(&self) -> AppResult<Arc<dyn EmbeddingProvider>> {
        self.embedder
            .get_or_init(|| async { create_embedder(&self.app.embedding) })
            .await
    }

    pub async fn store(&self) -> AppResult<Arc<dyn VectorStore>> {
        self.store
            .get_or_init(|| async {
                self.app.ensure_data_dir()?;
                create_store(&self.app).await
            })
            .await
    }

    pub async fn llm(&self) -> AppResult<Arc<dyn LlmClient>> {
        self.llm
            .get_or_init(|| async {
                let settings = &self.app.llm;
                create_client(
                    &settings.provider,
                    settings.endpoint.as_deref(),
                    Some(Duration::from_secs(settings.timeout_secs)),
                )
                .map_err(AppError::Config)
            })
            .await
    }

    pub async fn prompts(&self) -> AppResult<Arc<PromptCatalog>> {
        self.prompts
            .get_or_init(|| async {
                PromptCatalog::with_workspace_overrides(&self.app.workspace).map(Arc::new)
            })
            .await
    }

    /// A question-answering pipeline over the shared collaborators.
    pub async fn pipeline(&self) -> AppResult<QaPipeline> {
        let retriever = Retriever::new(
            self.embedder().await?,
            self.store().await?,
            self.rag.retrieval.clone(),
        );

        let mut synthesis = self.rag.synthesis.clone();
        if synthesis.model.trim().is_empty() {
            synthesis.model = self.app.llm.model.clone();
        }
        let synthesizer = Synthesizer::new(self.llm().await?, self.prompts().await?, synthesis);

        Ok(QaPipeline::new(retriever, synthesizer, self.rag.clone()))
    }

    pub async fn ingestor(&self) -> AppResult<Ingestor> {
        Ok(Ingestor::new(
            SemanticChunker::new(self.rag.chunking.clone()),
            self.embedder().await?,
            self.store().await?,
            self.app.embedding.batch_size,
        ))
    }
}
