//! Document ingestion: parsing, OCR and chunking

pub mod chunker;
pub mod ocr;
pub mod parser;

pub use chunker::RecursiveChunker;
pub use ocr::{OcrEngine, OcrOutput};
pub use parser::FileParser;

use sha2::{Digest, Sha256};

use crate::config::RagConfig;
use crate::error::Result;
use crate::types::{Chunk, ChunkMetadata, PageDocument, PageRef};

/// Hex SHA-256 of uploaded bytes, used to detect unchanged re-uploads
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Parse, OCR and chunk an upload
#[derive(Debug, Clone)]
pub struct IngestPipeline {
    chunker: RecursiveChunker,
    ocr: OcrEngine,
}

impl IngestPipeline {
    pub fn new(config: &RagConfig) -> Self {
        Self {
            chunker: RecursiveChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            ocr: OcrEngine::new(config.ocr.clone()),
        }
    }

    pub fn chunker(&self) -> &RecursiveChunker {
        &self.chunker
    }

    pub fn ocr(&self) -> &OcrEngine {
        &self.ocr
    }

    /// Page documents for an upload, with OCR text appended as an extra page
    pub fn documents(&self, filename: &str, data: &[u8]) -> Result<Vec<PageDocument>> {
        let mut docs = FileParser::parse(filename, data)?;
        let ocr = self.ocr.extract(filename, data);
        if !ocr.text.trim().is_empty() {
            docs.push(PageDocument::new(
                ocr.text,
                ChunkMetadata::page(filename, PageRef::ocr()),
            ));
        }
        Ok(docs)
    }

    /// Run the whole pipeline. CPU-bound; call from a blocking task.
    pub fn process(&self, filename: &str, data: &[u8]) -> Result<Vec<Chunk>> {
        let docs = self.documents(filename, data)?;
        let chunks = self.chunker.chunk_documents(&docs);
        tracing::info!(
            "Processed {}: {} page documents, {} chunks",
            filename,
            docs.len(),
            chunks.len()
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(b"hello");
        assert_eq!(a, content_hash(b"hello"));
        assert_ne!(a, content_hash(b"hello!"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_process_markdown() {
        let pipeline = IngestPipeline::new(&RagConfig::default());
        let chunks = pipeline
            .process("guide.md", b"# Guide\n\nInstall the service.\n\nRun it.")
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source(), "guide.md");
    }
}
