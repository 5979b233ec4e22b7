//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::agents::{RagChain, RagPipeline, RetrievalParams};
use crate::config::RagConfig;
use crate::error::Result;
use crate::ingestion::IngestPipeline;
use crate::memory::ConversationMemory;
use crate::providers::{build_llm, select_embedder, EmbeddingProvider, LlmProvider};
use crate::retrieval::{load_reranker, Bm25Index, HybridSearcher, Reranker, VectorStore, WebSearch};
use crate::storage::{read_json, write_json_atomic};
use crate::tools::{DocumentTools, ToolRegistry, VectorDbTools, WebSearchTools};
use crate::types::UploadedFile;

/// Model backends the state is assembled from
#[derive(Clone)]
pub struct Providers {
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub reranker: Arc<dyn Reranker>,
}

impl Providers {
    /// Select backends from configuration (Gemini, Ollama or local fallbacks)
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            llm: build_llm(config)?,
            embedder: select_embedder(config).await?,
            reranker: load_reranker(&config.retrieval),
        })
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    providers: Providers,
    searcher: Arc<HybridSearcher>,
    ingest: IngestPipeline,
    pipeline: RagPipeline,
    chain: Option<RagChain>,
    memory: ConversationMemory,
    /// Registry of ingested uploads, in upload order
    uploaded_files: RwLock<Vec<UploadedFile>>,
    /// Serializes uploads so re-upload detection sees a consistent registry
    ingest_lock: tokio::sync::Mutex<()>,
    tools: ToolRegistry,
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state with providers selected from `config`
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");
        let providers = Providers::from_config(&config).await?;
        Self::with_providers(config, providers)
    }

    /// Create application state over the given providers, loading persisted
    /// indexes, history and the upload registry from the data directory
    pub fn with_providers(config: RagConfig, providers: Providers) -> Result<Self> {
        let storage = &config.storage;
        std::fs::create_dir_all(&storage.data_dir)?;

        let vector_store = Arc::new(VectorStore::open(&storage.vector_path())?);
        let bm25_path = storage.bm25_path();
        let bm25 = Bm25Index::load(&bm25_path)?;
        let memory = ConversationMemory::load(&storage.history_path())?;
        let uploaded_files: Vec<UploadedFile> =
            read_json(&storage.uploads_path())?.unwrap_or_default();

        let searcher = Arc::new(HybridSearcher::new(
            vector_store,
            bm25,
            Some(bm25_path),
            providers.embedder.clone(),
        ));

        let web = Arc::new(WebSearch::new(&config.web_search, providers.llm.clone())?);
        let ingest = IngestPipeline::new(&config);

        let pipeline = RagPipeline::new(
            providers.llm.clone(),
            searcher.clone(),
            Some(web.clone()),
            providers.reranker.clone(),
        )
        .with_retrieval(RetrievalParams {
            top_k: config.retrieval.top_k,
            vector_weight: config.retrieval.vector_weight,
            web_top_k: config.web_search.top_k,
        })
        .with_rerank_top_k(config.retrieval.rerank_top_k);

        let chain = config.pipeline.use_chain.then(|| {
            tracing::info!("Single-call chain enabled, agent graph used as fallback");
            RagChain::new(
                providers.llm.clone(),
                searcher.clone(),
                config.pipeline.chain_history_pairs,
            )
            .with_search(config.retrieval.top_k, config.retrieval.vector_weight)
        });

        let tools = ToolRegistry::new()
            .register("vector_db", Arc::new(VectorDbTools::new(searcher.clone())))
            .register("web_search", Arc::new(WebSearchTools::new(web)))
            .register("document_processing", Arc::new(DocumentTools::new(ingest.clone())));

        tracing::info!(
            "State ready: {} vector chunks, {} BM25 chunks, {} uploaded files, {} sessions",
            searcher.vector_store().count(),
            searcher.bm25_len(),
            uploaded_files.len(),
            memory.sessions().len()
        );
        tracing::info!(
            "Providers: llm={} ({}), embedder={}, reranker={}",
            providers.llm.name(),
            providers.llm.model(),
            providers.embedder.name(),
            providers.reranker.name()
        );
        if let Some(dimensions) = providers.embedder.dimensions() {
            tracing::info!("Embedding dimensions: {}", dimensions);
        }

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                providers,
                searcher,
                ingest,
                pipeline,
                chain,
                memory,
                uploaded_files: RwLock::new(uploaded_files),
                ingest_lock: tokio::sync::Mutex::new(()),
                tools,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn providers(&self) -> &Providers {
        &self.inner.providers
    }

    pub fn searcher(&self) -> &Arc<HybridSearcher> {
        &self.inner.searcher
    }

    pub fn ingest(&self) -> &IngestPipeline {
        &self.inner.ingest
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    /// Single-call chain, when enabled
    pub fn chain(&self) -> Option<&RagChain> {
        self.inner.chain.as_ref()
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.inner.memory
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    /// Hold while checking and mutating the upload registry
    pub async fn lock_ingest(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.inner.ingest_lock.lock().await
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    /// List uploaded files in upload order
    pub fn uploaded_files(&self) -> Vec<UploadedFile> {
        self.inner.uploaded_files.read().clone()
    }

    /// Find an uploaded file by name
    pub fn find_upload(&self, filename: &str) -> Option<UploadedFile> {
        self.inner
            .uploaded_files
            .read()
            .iter()
            .find(|f| f.filename == filename)
            .cloned()
    }

    /// Insert or replace the registry entry for `file.filename` and persist
    pub fn record_upload(&self, file: UploadedFile) -> Result<()> {
        let mut files = self.inner.uploaded_files.write();
        files.retain(|f| f.filename != file.filename);
        files.push(file);
        write_json_atomic(&self.inner.config.storage.uploads_path(), &*files)
    }

    /// Drop the registry entry for `filename` and persist; returns whether it existed
    pub fn remove_upload(&self, filename: &str) -> Result<bool> {
        let mut files = self.inner.uploaded_files.write();
        let before = files.len();
        files.retain(|f| f.filename != filename);
        if files.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.inner.config.storage.uploads_path(), &*files)?;
        Ok(true)
    }

    /// Persist conversation history
    pub fn save_history(&self) -> Result<()> {
        self.inner
            .memory
            .save(&self.inner.config.storage.history_path())
    }
}
