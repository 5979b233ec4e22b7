//! Persistent cosine-similarity vector store

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::storage::{read_json, write_json_atomic};
use crate::types::Chunk;

const COLLECTION_FILE: &str = "collection.json";

/// Stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct VectorRecord {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Search hit with cosine distance (`1 - cosine similarity`, lower is closer)
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Cosine similarity; 0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Brute-force cosine vector store persisted as a JSON collection
pub struct VectorStore {
    path: Option<PathBuf>,
    records: RwLock<Vec<VectorRecord>>,
}

impl VectorStore {
    /// Open (or create) the collection stored under `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(COLLECTION_FILE);
        let records: Vec<VectorRecord> = read_json(&path)?.unwrap_or_default();
        tracing::info!("Vector store loaded from {} ({} chunks)", path.display(), records.len());
        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// Non-persistent store
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    fn persist(&self, records: &[VectorRecord]) -> Result<()> {
        match &self.path {
            Some(path) => write_json_atomic(path, records),
            None => Ok(()),
        }
    }

    /// Add chunks with their embeddings
    pub fn add(&self, chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::vector_db(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Ok(());
        }

        let mut records = self.records.write();
        records.extend(
            chunks
                .iter()
                .cloned()
                .zip(embeddings)
                .map(|(chunk, embedding)| VectorRecord { chunk, embedding }),
        );
        self.persist(&records)?;
        tracing::info!("Vector store: added {} chunks, total {}", chunks.len(), records.len());
        Ok(())
    }

    /// Nearest chunks by cosine distance, closest first
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<VectorHit> {
        let records = self.records.read();
        let mut hits: Vec<VectorHit> = records
            .iter()
            .filter(|r| r.embedding.len() == query_embedding.len())
            .map(|r| VectorHit {
                chunk: r.chunk.clone(),
                distance: 1.0 - cosine_similarity(query_embedding, &r.embedding),
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(top_k.min(records.len()));
        hits
    }

    /// Remove every chunk of `source`, returning how many were removed
    pub fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.chunk.metadata.source != source);
        let deleted = before - records.len();
        if deleted > 0 {
            self.persist(&records)?;
        }
        tracing::info!(
            "Vector store: deleted {} chunks from '{}', {} remaining",
            deleted,
            source,
            records.len()
        );
        Ok(deleted)
    }

    pub fn count(&self) -> usize {
        self.records.read().len()
    }

    /// Distinct chunk sources
    pub fn sources(&self) -> Vec<String> {
        self.records
            .read()
            .iter()
            .map(|r| r.chunk.metadata.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, PageRef};

    fn chunk(source: &str, content: &str) -> Chunk {
        Chunk::new(content, ChunkMetadata::page(source, PageRef::Number(1)))
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_distance() {
        let store = VectorStore::in_memory();
        store
            .add(
                &[chunk("a", "x"), chunk("b", "y"), chunk("c", "z")],
                vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]],
            )
            .unwrap();

        let hits = store.search(&[1.0, 0.1], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.source(), "a");
        assert_eq!(hits[1].chunk.source(), "c");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_empty_and_mismatch() {
        let store = VectorStore::in_memory();
        assert!(store.search(&[1.0], 5).is_empty());
        assert!(store.add(&[chunk("a", "x")], vec![]).is_err());
        store.add(&[], vec![]).unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_delete_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = VectorStore::open(dir.path()).unwrap();
            store
                .add(
                    &[chunk("a.pdf", "1"), chunk("a.pdf", "2"), chunk("b.txt", "3")],
                    vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0]],
                )
                .unwrap();
            assert_eq!(store.delete_by_source("a.pdf").unwrap(), 2);
            assert_eq!(store.delete_by_source("missing").unwrap(), 0);
        }

        let reopened = VectorStore::open(dir.path()).unwrap();
        assert_eq!(reopened.count(), 1);
        assert_eq!(reopened.sources(), vec!["b.txt".to_string()]);
    }
}
