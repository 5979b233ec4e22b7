//! Okapi BM25 keyword index over the chunk store
//!
//! The index is rebuilt from the full chunk list on every mutation.
//! Tokenization is lowercase + whitespace split.

use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::storage::{read_json, write_json_atomic};
use crate::types::Chunk;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Term statistics for a fixed corpus
#[derive(Debug, Default)]
struct Okapi {
    doc_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avgdl: f64,
    idf: HashMap<String, f64>,
}

impl Okapi {
    fn new(corpus: &[Vec<String>]) -> Self {
        let mut doc_freqs = Vec::with_capacity(corpus.len());
        let mut doc_lens = Vec::with_capacity(corpus.len());
        let mut containing: HashMap<String, usize> = HashMap::new();
        let mut total_tokens = 0usize;

        for doc in corpus {
            total_tokens += doc.len();
            doc_lens.push(doc.len());
            let mut freqs: HashMap<String, usize> = HashMap::new();
            for token in doc {
                *freqs.entry(token.clone()).or_default() += 1;
            }
            for token in freqs.keys() {
                *containing.entry(token.clone()).or_default() += 1;
            }
            doc_freqs.push(freqs);
        }

        let n = corpus.len() as f64;
        let avgdl = if corpus.is_empty() {
            0.0
        } else {
            total_tokens as f64 / n
        };

        let mut idf = HashMap::with_capacity(containing.len());
        let mut idf_sum = 0.0;
        let mut negative = Vec::new();
        for (token, freq) in containing {
            let freq = freq as f64;
            let value = (n - freq + 0.5).ln() - (freq + 0.5).ln();
            idf_sum += value;
            if value < 0.0 {
                negative.push(token.clone());
            }
            idf.insert(token, value);
        }
        if !idf.is_empty() {
            let floor = EPSILON * idf_sum / idf.len() as f64;
            for token in negative {
                idf.insert(token, floor);
            }
        }

        Self {
            doc_freqs,
            doc_lens,
            avgdl,
            idf,
        }
    }

    fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.doc_freqs.len()];
        if self.avgdl <= 0.0 {
            return scores;
        }
        for token in query {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };
            for (i, freqs) in self.doc_freqs.iter().enumerate() {
                let tf = freqs.get(token).copied().unwrap_or(0) as f64;
                if tf == 0.0 {
                    continue;
                }
                let norm = K1 * (1.0 - B + B * self.doc_lens[i] as f64 / self.avgdl);
                scores[i] += idf * (tf * (K1 + 1.0)) / (tf + norm);
            }
        }
        scores
    }
}

/// BM25 index with the chunk store it was built from
#[derive(Debug, Default)]
pub struct Bm25Index {
    chunks: Vec<Chunk>,
    okapi: Option<Okapi>,
}

impl Bm25Index {
    pub fn new() -> Self {
        Self::default()
    }

    fn rebuild(&mut self) {
        self.okapi = if self.chunks.is_empty() {
            None
        } else {
            let corpus: Vec<Vec<String>> = self.chunks.iter().map(|c| tokenize(&c.content)).collect();
            Some(Okapi::new(&corpus))
        };
    }

    /// Append chunks and rebuild
    pub fn add_chunks(&mut self, chunks: &[Chunk]) {
        self.chunks.extend_from_slice(chunks);
        self.rebuild();
    }

    /// Top `top_k` chunks by BM25 score, highest first. Zero-score chunks
    /// are still returned when the corpus is smaller than `top_k`.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<Chunk> {
        let Some(okapi) = &self.okapi else {
            return Vec::new();
        };
        let scores = okapi.scores(&tokenize(query));
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
        order
            .into_iter()
            .take(top_k)
            .map(|i| self.chunks[i].clone())
            .collect()
    }

    /// Remove every chunk of `source`, returning how many were removed
    pub fn delete_by_source(&mut self, source: &str) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|c| c.metadata.source != source);
        let deleted = before - self.chunks.len();
        self.rebuild();
        tracing::info!(
            "BM25: deleted {} chunks from '{}', {} remaining",
            deleted,
            source,
            self.chunks.len()
        );
        deleted
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Persist the chunk store as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &self.chunks)
    }

    /// Load the chunk store from JSON (missing file means empty) and rebuild
    pub fn load(path: &Path) -> Result<Self> {
        let chunks: Vec<Chunk> = read_json(path)?.unwrap_or_default();
        let mut index = Self {
            chunks,
            okapi: None,
        };
        index.rebuild();
        tracing::info!("BM25 index loaded from {} ({} chunks)", path.display(), index.len());
        Ok(index)
    }
}
