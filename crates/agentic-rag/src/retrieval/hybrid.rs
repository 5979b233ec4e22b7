//! Hybrid search: weighted fusion of vector and BM25 results

use parking_lot::RwLock;
use std::collections::hash_map::{Entry, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, DeletionCounts};

use super::bm25::Bm25Index;
use super::vector_store::{VectorHit, VectorStore};

/// Characters of content used to identify the same chunk across both legs
const FUSION_KEY_CHARS: usize = 100;
/// Score lost per BM25 rank position
const KEYWORD_RANK_DECAY: f32 = 0.05;

/// Chunk with its fused score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

fn fusion_key(content: &str) -> String {
    content.chars().take(FUSION_KEY_CHARS).collect()
}

/// Fuse vector hits and BM25 ranks. Vector score is `1 / (1 + distance)`,
/// keyword score for rank `i` is `1 - 0.05 * i`; the fused score is
/// `w * vector + (1 - w) * keyword`.
pub fn fuse(
    vector_hits: Vec<VectorHit>,
    keyword_hits: Vec<Chunk>,
    vector_weight: f32,
    top_k: usize,
) -> Vec<ScoredChunk> {
    let mut order: Vec<String> = Vec::new();
    let mut entries: HashMap<String, (Chunk, f32, f32)> = HashMap::new();

    for hit in vector_hits {
        let key = fusion_key(&hit.chunk.content);
        if let Entry::Vacant(slot) = entries.entry(key) {
            order.push(slot.key().clone());
            slot.insert((hit.chunk, 1.0 / (1.0 + hit.distance), 0.0));
        }
    }

    for (rank, chunk) in keyword_hits.into_iter().enumerate() {
        let key = fusion_key(&chunk.content);
        let keyword_score = 1.0 - KEYWORD_RANK_DECAY * rank as f32;
        match entries.get_mut(&key) {
            Some(entry) => entry.2 = entry.2.max(keyword_score),
            None => {
                order.push(key.clone());
                entries.insert(key, (chunk, 0.0, keyword_score));
            }
        }
    }

    let mut fused: Vec<ScoredChunk> = order
        .into_iter()
        .filter_map(|key| entries.remove(&key))
        .map(|(chunk, vector, keyword)| ScoredChunk {
            chunk,
            score: vector_weight * vector + (1.0 - vector_weight) * keyword,
        })
        .collect();

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused.truncate(top_k);
    fused
}

/// Both indexes, cloneable into blocking tasks
#[derive(Clone)]
struct Indexes {
    vector_store: Arc<VectorStore>,
    bm25: Arc<RwLock<Bm25Index>>,
    bm25_path: Option<PathBuf>,
}

impl Indexes {
    fn insert(&self, chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<()> {
        self.vector_store.add(chunks, embeddings)?;
        let mut bm25 = self.bm25.write();
        bm25.add_chunks(chunks);
        self.save_bm25(&bm25)
    }

    fn remove(&self, source: &str) -> Result<DeletionCounts> {
        let vector_store = self.vector_store.delete_by_source(source)?;
        let mut bm25 = self.bm25.write();
        let bm25_deleted = bm25.delete_by_source(source);
        self.save_bm25(&bm25)?;
        Ok(DeletionCounts {
            vector_store,
            bm25: bm25_deleted,
        })
    }

    fn save_bm25(&self, bm25: &Bm25Index) -> Result<()> {
        match &self.bm25_path {
            Some(path) => bm25.save(path),
            None => Ok(()),
        }
    }
}

/// Run index persistence off the async workers
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::internal(format!("Index task failed: {}", e)))?
}

/// Vector store + BM25 index behind one search interface
pub struct HybridSearcher {
    indexes: Indexes,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl HybridSearcher {
    pub fn new(
        vector_store: Arc<VectorStore>,
        bm25: Bm25Index,
        bm25_path: Option<PathBuf>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            indexes: Indexes {
                vector_store,
                bm25: Arc::new(RwLock::new(bm25)),
                bm25_path,
            },
            embedder,
        }
    }

    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.indexes.vector_store
    }

    pub fn bm25_len(&self) -> usize {
        self.indexes.bm25.read().len()
    }

    /// Nearest chunks by embedding distance
    pub async fn vector_search(&self, query: &str, top_k: usize) -> Result<Vec<VectorHit>> {
        let embedding = self.embedder.embed(query).await?;
        Ok(self.indexes.vector_store.search(&embedding, top_k))
    }

    /// Top chunks by BM25
    pub fn keyword_search(&self, query: &str, top_k: usize) -> Vec<Chunk> {
        self.indexes.bm25.read().search(query, top_k)
    }

    /// Weighted fusion of both legs. A failing vector leg is logged and
    /// treated as empty.
    pub async fn hybrid_search(
        &self,
        query: &str,
        top_k: usize,
        vector_weight: f32,
    ) -> Vec<ScoredChunk> {
        let candidates = top_k.saturating_mul(2);
        let vector_hits = match self.vector_search(query, candidates).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!("Vector search failed, using keyword results only: {}", e);
                Vec::new()
            }
        };
        let keyword_hits = self.keyword_search(query, candidates);
        tracing::debug!(
            "Hybrid search: {} vector hits, {} keyword hits",
            vector_hits.len(),
            keyword_hits.len()
        );
        fuse(vector_hits, keyword_hits, vector_weight, top_k)
    }

    async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }
        Ok(embeddings)
    }

    /// Embed and index chunks in both legs, then persist BM25
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let embeddings = self.embed(chunks).await?;
        let indexes = self.indexes.clone();
        let chunks = chunks.to_vec();
        blocking(move || indexes.insert(&chunks, embeddings)).await
    }

    /// Swap the indexed chunks of `source` for `chunks`. Embedding happens
    /// first, so a failure leaves the previous version in place.
    pub async fn replace_source(&self, source: &str, chunks: Vec<Chunk>) -> Result<DeletionCounts> {
        let embeddings = self.embed(&chunks).await?;
        let indexes = self.indexes.clone();
        let source = source.to_string();
        blocking(move || {
            let counts = indexes.remove(&source)?;
            indexes.insert(&chunks, embeddings)?;
            Ok(counts)
        })
        .await
    }

    /// Remove a source from both legs
    pub async fn delete_by_source(&self, source: &str) -> Result<DeletionCounts> {
        let indexes = self.indexes.clone();
        let source = source.to_string();
        blocking(move || indexes.remove(&source)).await
    }
}
