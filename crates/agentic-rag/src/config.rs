//! Configuration for the agentic RAG service
//!
//! Values come from compiled defaults, then an optional TOML file, then
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// On-disk persistence locations
    pub storage: StorageConfig,
    /// Text chunking configuration
    pub chunking: ChunkingConfig,
    /// OCR configuration for scanned PDFs
    pub ocr: OcrConfig,
    /// Embedding model configuration
    pub embeddings: EmbeddingConfig,
    /// Gemini/Ollama configuration
    pub llm: LlmConfig,
    /// Hybrid retrieval and re-ranking configuration
    pub retrieval: RetrievalConfig,
    /// Serper web search configuration
    pub web_search: WebSearchConfig,
    /// Answering pipeline selection
    pub pipeline: PipelineConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// Static frontend served at `/` when the directory exists
    pub frontend_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_size: 50 * 1024 * 1024,
            frontend_dir: PathBuf::from("frontend"),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for indexes, history and the upload registry
    pub data_dir: PathBuf,
    /// Vector store directory (defaults to `<data_dir>/vector_store`)
    pub vector_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            vector_dir: None,
        }
    }
}

impl StorageConfig {
    /// Directory holding the persisted vector collection
    pub fn vector_path(&self) -> PathBuf {
        self.vector_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("vector_store"))
    }

    /// BM25 chunk store file
    pub fn bm25_path(&self) -> PathBuf {
        self.data_dir.join("bm25_index.json")
    }

    /// Conversation history file
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("conversation_history.json")
    }

    /// Uploaded files registry
    pub fn uploads_path(&self) -> PathBuf {
        self.data_dir.join("uploaded_files.json")
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
        }
    }
}

/// OCR configuration (pdftoppm + tesseract)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR over uploaded PDFs when the tools are installed
    pub enabled: bool,
    /// Render resolution for page images
    pub dpi: u32,
    /// Tesseract language
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dpi: 150,
            language: "eng".to_string(),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Gemini embedding model
    pub gemini_model: String,
    /// Ollama embedding model
    pub ollama_model: String,
    /// Dimensions of the offline hash embedder
    pub dimensions: usize,
    /// Texts per Gemini batch request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            gemini_model: "models/gemini-embedding-001".to_string(),
            ollama_model: "nomic-embed-text".to_string(),
            dimensions: 768,
            batch_size: 100,
        }
    }
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gemini API key; Gemini is skipped when absent
    pub gemini_api_key: Option<String>,
    /// Gemini generation model
    pub gemini_model: String,
    /// Gemini REST base URL
    pub gemini_base_url: String,
    /// Ollama base URL
    pub ollama_base_url: String,
    /// Ollama generation model
    pub ollama_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed Ollama requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1:latest".to_string(),
            timeout_secs: 120,
            max_retries: 1,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates returned by hybrid search
    pub top_k: usize,
    /// Weight of the vector leg in hybrid fusion (keyword leg gets the rest)
    pub vector_weight: f32,
    /// Chunks kept after re-ranking
    pub rerank_top_k: usize,
    /// Directory with `model.onnx` and `tokenizer.json` of a cross-encoder
    pub reranker_model_dir: Option<PathBuf>,
    /// Messages of history passed to the pipeline
    pub history_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 15,
            vector_weight: 0.7,
            rerank_top_k: 10,
            reranker_model_dir: None,
            history_limit: 20,
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Serper.dev API key; the LLM fallback is used when absent
    pub api_key: Option<String>,
    /// Serper search endpoint
    pub endpoint: String,
    /// Results per search
    pub top_k: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://google.serper.dev/search".to_string(),
            top_k: 5,
            timeout_secs: 10,
        }
    }
}

/// Answering pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Answer with the single-call chain first, falling back to the agent graph
    pub use_chain: bool,
    /// Conversation turns (user + assistant pairs) replayed by the chain
    pub chain_history_pairs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            use_chain: false,
            chain_history_pairs: 6,
        }
    }
}

impl RagConfig {
    /// Load defaults, then the TOML file (if any), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(host) = get("RAG_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid RAG_PORT value: {}", port),
            }
        }
        if let Some(dir) = get("RAG_FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("RAG_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("CHROMA_PERSIST_DIRECTORY") {
            self.storage.vector_dir = Some(PathBuf::from(dir));
        }

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            self.llm.gemini_api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.llm.gemini_model = model;
        }
        if let Some(url) = get("OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("OLLAMA_MODEL") {
            self.llm.ollama_model = model;
        }

        if let Some(model) = get("EMBEDDING_MODEL") {
            self.embeddings.gemini_model = model;
        }
        if let Some(model) = get("OLLAMA_EMBED_MODEL") {
            self.embeddings.ollama_model = model;
        }

        if let Some(dir) = get("RERANKER_MODEL_DIR") {
            self.retrieval.reranker_model_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = get("SERPER_API_KEY") {
            self.web_search.api_key = Some(key);
        }
        if let Some(flag) = get("USE_LANGCHAIN_CHAIN") {
            self.pipeline.use_chain = flag.eq_ignore_ascii_case("true");
        }

        if self.llm.gemini_api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.llm.gemini_api_key = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.chunking.chunk_size, 512);
        assert_eq!(config.chunking.chunk_overlap, 64);
        assert_eq!(config.retrieval.top_k, 15);
        assert_eq!(config.retrieval.rerank_top_k, 10);
        assert_eq!(config.llm.ollama_model, "llama3.1:latest");
        assert!(!config.pipeline.use_chain);
        assert_eq!(
            config.storage.bm25_path(),
            PathBuf::from("data").join("bm25_index.json")
        );
        assert_eq!(
            config.storage.vector_path(),
            PathBuf::from("data").join("vector_store")
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("SERPER_API_KEY", "s-key"),
            ("OLLAMA_BASE_URL", "http://ollama:11434/"),
            ("OLLAMA_MODEL", "mistral"),
            ("CHROMA_PERSIST_DIRECTORY", "/tmp/chroma"),
            ("EMBEDDING_MODEL", "models/text-embedding-004"),
            ("USE_LANGCHAIN_CHAIN", "TRUE"),
            ("RAG_PORT", "9001"),
        ]));

        assert_eq!(config.llm.gemini_api_key.as_deref(), Some("g-key"));
        assert_eq!(config.web_search.api_key.as_deref(), Some("s-key"));
        assert_eq!(config.llm.ollama_base_url, "http://ollama:11434");
        assert_eq!(config.llm.ollama_model, "mistral");
        assert_eq!(config.storage.vector_path(), PathBuf::from("/tmp/chroma"));
        assert_eq!(config.embeddings.gemini_model, "models/text-embedding-004");
        assert!(config.pipeline.use_chain);
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_gemini_key_precedence_and_blank_values() {
        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[
            ("GEMINI_API_KEY", "primary"),
            ("GOOGLE_API_KEY", "secondary"),
            ("RAG_PORT", "not-a-port"),
        ]));
        assert_eq!(config.llm.gemini_api_key.as_deref(), Some("primary"));
        assert_eq!(config.server.port, 8000);

        let mut config = RagConfig::default();
        config.apply_overrides(lookup(&[("GEMINI_API_KEY", "   ")]));
        assert!(config.llm.gemini_api_key.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rag.toml");
        std::fs::write(
            &path,
            "[chunking]\nchunk_size = 256\n\n[retrieval]\nvector_weight = 0.5\n",
        )
        .unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.chunking.chunk_size, 256);
        assert_eq!(config.chunking.chunk_overlap, 64);
        assert!((config.retrieval.vector_weight - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = RagConfig::from_file(Path::new("/nonexistent/rag.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
