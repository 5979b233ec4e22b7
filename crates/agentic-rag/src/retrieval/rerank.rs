//! Second-stage re-ranking of retrieved chunks
//!
//! A cross-encoder ONNX model (e.g. an exported `BAAI/bge-reranker-base`) is
//! used when configured; otherwise a lexical term-coverage scorer.

use std::collections::HashSet;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::types::Chunk;

/// Scores (query, passage) pairs; higher is more relevant
pub trait Reranker: Send + Sync {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "his", "how", "its", "may", "who", "did", "get", "let", "she",
    "too", "use", "what", "when", "where", "which", "why", "with", "this", "that", "from",
    "they", "them", "then", "than", "there", "their", "have", "been", "were", "will", "would",
    "could", "should", "about", "into", "does", "tell", "some", "more", "most",
];

fn terms(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Model-free scorer: fraction of query terms present in the passage plus a
/// term-frequency bonus normalised by passage length
#[derive(Debug, Clone, Default)]
pub struct LexicalReranker;

impl Reranker for LexicalReranker {
    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let query_terms: HashSet<String> = terms(query).into_iter().collect();
        if query_terms.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }

        Ok(passages
            .iter()
            .map(|passage| {
                let words = terms(passage);
                if words.is_empty() {
                    return 0.0;
                }
                let present: HashSet<&String> =
                    words.iter().filter(|w| query_terms.contains(*w)).collect();
                let hits = words.iter().filter(|w| query_terms.contains(*w)).count();
                let coverage = present.len() as f32 / query_terms.len() as f32;
                let density = hits as f32 / words.len() as f32;
                coverage + 0.5 * density
            })
            .collect())
    }

    fn name(&self) -> &str {
        "lexical"
    }
}

#[cfg(feature = "onnx")]
pub use cross_encoder::CrossEncoderReranker;

#[cfg(feature = "onnx")]
mod cross_encoder {
    use ort::session::{builder::GraphOptimizationLevel, Session};
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use std::path::Path;
    use tokenizers::{Tokenizer, TruncationParams};

    use super::Reranker;
    use crate::error::{Error, Result};

    const MAX_LENGTH: usize = 512;

    /// ONNX cross-encoder producing one relevance logit per pair
    pub struct CrossEncoderReranker {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        uses_token_types: bool,
    }

    impl CrossEncoderReranker {
        /// Load `model.onnx` and `tokenizer.json` from `dir`
        pub fn load(dir: &Path) -> Result<Self> {
            let model_path = dir.join("model.onnx");
            let tokenizer_path = dir.join("tokenizer.json");
            if !model_path.exists() || !tokenizer_path.exists() {
                return Err(Error::Config(format!(
                    "Reranker model not found in {} (expected model.onnx and tokenizer.json)",
                    dir.display()
                )));
            }

            let session = Session::builder()
                .map_err(|e| Error::Config(format!("Failed to create session builder: {}", e)))?
                .with_optimization_level(GraphOptimizationLevel::Level3)
                .map_err(|e| Error::Config(format!("Failed to set optimization level: {}", e)))?
                .with_intra_threads(4)
                .map_err(|e| Error::Config(format!("Failed to set threads: {}", e)))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Config(format!("Failed to load reranker model: {}", e)))?;

            let uses_token_types = session.inputs().iter().any(|i| i.name() == "token_type_ids");

            let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Config(format!("Failed to load tokenizer: {}", e)))?;
            tokenizer
                .with_truncation(Some(TruncationParams {
                    max_length: MAX_LENGTH,
                    ..Default::default()
                }))
                .map_err(|e| Error::Config(format!("Failed to configure truncation: {}", e)))?;

            tracing::info!("Cross-encoder reranker loaded from {}", dir.display());

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                uses_token_types,
            })
        }
    }

    impl Reranker for CrossEncoderReranker {
        fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
            if passages.is_empty() {
                return Ok(Vec::new());
            }
            let batch_size = passages.len();
            let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, *p)).collect();

            let encodings = self
                .tokenizer
                .encode_batch(pairs, true)
                .map_err(|e| Error::internal(format!("Tokenization failed: {}", e)))?;

            let max_len = encodings
                .iter()
                .map(|e| e.get_ids().len())
                .max()
                .unwrap_or(0)
                .min(MAX_LENGTH);

            let mut input_ids = vec![0i64; batch_size * max_len];
            let mut attention_mask = vec![0i64; batch_size * max_len];
            let mut token_type_ids = vec![0i64; batch_size * max_len];

            for (i, encoding) in encodings.iter().enumerate() {
                let ids = encoding.get_ids();
                let mask = encoding.get_attention_mask();
                let types = encoding.get_type_ids();
                for j in 0..ids.len().min(max_len) {
                    input_ids[i * max_len + j] = ids[j] as i64;
                    attention_mask[i * max_len + j] = mask[j] as i64;
                    token_type_ids[i * max_len + j] = types[j] as i64;
                }
            }

            let shape = vec![batch_size, max_len];
            let tensor = |data: Vec<i64>, what: &str| {
                Tensor::from_array((shape.clone(), data.into_boxed_slice()))
                    .map(|t| t.into_dyn())
                    .map_err(|e| Error::internal(format!("{} tensor creation failed: {}", what, e)))
            };

            let mut inputs = vec![
                ("input_ids", tensor(input_ids, "Input")?),
                ("attention_mask", tensor(attention_mask, "Attention mask")?),
            ];
            if self.uses_token_types {
                inputs.push(("token_type_ids", tensor(token_type_ids, "Token type")?));
            }

            let mut session = self.session.lock();
            let outputs = session
                .run(inputs)
                .map_err(|e| Error::internal(format!("Reranker inference failed: {}", e)))?;

            let output = outputs
                .iter()
                .next()
                .map(|(_, v)| v)
                .ok_or_else(|| Error::internal("No output tensor"))?;
            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::internal(format!("Failed to extract logits: {}", e)))?;

            let stride = shape.get(1).map(|&d| d.max(1) as usize).unwrap_or(1);
            Ok((0..batch_size)
                .map(|i| data.get(i * stride).copied().unwrap_or(f32::MIN))
                .collect())
        }

        fn name(&self) -> &str {
            "cross-encoder"
        }
    }
}

/// Cross-encoder when configured and loadable, otherwise lexical
pub fn load_reranker(config: &RetrievalConfig) -> Arc<dyn Reranker> {
    #[cfg(feature = "onnx")]
    {
        if let Some(dir) = &config.reranker_model_dir {
            match CrossEncoderReranker::load(dir) {
                Ok(reranker) => return Arc::new(reranker),
                Err(e) => tracing::warn!("Falling back to lexical reranker: {}", e),
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        if config.reranker_model_dir.is_some() {
            tracing::warn!("Built without the onnx feature, using lexical reranker");
        }
    }

    Arc::new(LexicalReranker)
}

/// Sort `chunks` by reranker score, keep `top_k`, and record each score in
/// the chunk metadata. On scoring failure the input order is kept.
pub fn rerank(reranker: &dyn Reranker, query: &str, chunks: Vec<Chunk>, top_k: usize) -> Vec<Chunk> {
    if chunks.is_empty() {
        return chunks;
    }

    let passages: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let scores = match reranker.score(query, &passages) {
        Ok(scores) if scores.len() == chunks.len() => scores,
        Ok(scores) => {
            tracing::warn!(
                "{} reranker returned {} scores for {} chunks",
                reranker.name(),
                scores.len(),
                chunks.len()
            );
            return chunks.into_iter().take(top_k).collect();
        }
        Err(e) => {
            tracing::warn!("{} reranker failed: {}", reranker.name(), e);
            return chunks.into_iter().take(top_k).collect();
        }
    };

    let mut scored: Vec<(Chunk, f32)> = chunks.into_iter().zip(scores).collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
        .into_iter()
        .take(top_k)
        .map(|(mut chunk, score)| {
            chunk.metadata.rerank_score = Some(score);
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{ChunkMetadata, PageRef};

    struct BrokenReranker;

    impl Reranker for BrokenReranker {
        fn score(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>> {
            Err(Error::internal("model crashed"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn chunk(source: &str, content: &str) -> Chunk {
        Chunk::new(content, ChunkMetadata::page(source, PageRef::Number(1)))
    }

    #[test]
    fn test_lexical_scores() {
        let scores = LexicalReranker
            .score(
                "How does photosynthesis convert sunlight?",
                &[
                    "Photosynthesis converts sunlight into chemical energy.",
                    "Photosynthesis happens in leaves.",
                    "The stock market closed higher.",
                ],
            )
            .unwrap();
        assert!(scores[0] > scores[1]);
        assert!(scores[1] > scores[2]);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_rerank_sorts_truncates_and_records() {
        let chunks = vec![
            chunk("c", "unrelated text about cars"),
            chunk("a", "tides are caused by the moon"),
            chunk("b", "the moon orbits the earth"),
        ];
        let ranked = rerank(&LexicalReranker, "what causes tides moon", chunks, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].source(), "a");
        assert!(ranked.iter().all(|c| c.metadata.rerank_score.is_some()));
        assert!(ranked[0].metadata.rerank_score >= ranked[1].metadata.rerank_score);
    }

    #[test]
    fn test_rerank_failure_keeps_order() {
        let chunks = vec![chunk("x", "one"), chunk("y", "two"), chunk("z", "three")];
        let ranked = rerank(&BrokenReranker, "q", chunks, 2);
        let sources: Vec<&str> = ranked.iter().map(|c| c.source()).collect();
        assert_eq!(sources, vec!["x", "y"]);
        assert!(ranked[0].metadata.rerank_score.is_none());
    }

    #[test]
    fn test_rerank_empty() {
        assert!(rerank(&LexicalReranker, "q", Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_load_reranker_without_model() {
        let reranker = load_reranker(&RetrievalConfig::default());
        assert_eq!(reranker.name(), "lexical");
    }
}
