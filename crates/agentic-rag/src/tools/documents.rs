//! Document processing tools: parsing, OCR, chunking and the full ingest pass

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ingestion::{FileParser, IngestPipeline};
use crate::types::PageDocument;

use super::{parse_params, ToolResponse, ToolServer};

#[derive(Debug, Deserialize)]
struct FileParams {
    filename: String,
    content_base64: String,
}

impl FileParams {
    fn decode(&self) -> std::result::Result<Vec<u8>, ToolResponse> {
        base64::engine::general_purpose::STANDARD
            .decode(self.content_base64.trim())
            .map_err(|e| ToolResponse::error(format!("Invalid base64 content: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct ChunkParams {
    documents: Vec<PageDocument>,
}

pub struct DocumentTools {
    pipeline: IngestPipeline,
}

impl DocumentTools {
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self { pipeline }
    }

    async fn parse_document(&self, params: Value) -> ToolResponse {
        let p: FileParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp,
        };
        let data = match p.decode() {
            Ok(data) => data,
            Err(resp) => return resp,
        };
        let filename = p.filename;
        match tokio::task::spawn_blocking(move || FileParser::parse(&filename, &data)).await {
            Ok(Ok(documents)) => ToolResponse::ok(json!({ "documents": documents })),
            Ok(Err(e)) => ToolResponse::error(e.to_string()),
            Err(e) => ToolResponse::error(format!("Parser task failed: {}", e)),
        }
    }

    async fn extract_images_ocr(&self, params: Value) -> ToolResponse {
        let p: FileParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp,
        };
        let data = match p.decode() {
            Ok(data) => data,
            Err(resp) => return resp,
        };
        let ocr = self.pipeline.ocr().clone();
        let filename = p.filename;
        match tokio::task::spawn_blocking(move || ocr.extract(&filename, &data)).await {
            Ok(output) => ToolResponse::ok(json!({
                "text": output.text,
                "images_processed": output.images_processed,
            })),
            Err(e) => ToolResponse::error(format!("OCR task failed: {}", e)),
        }
    }

    /// Parse, OCR and chunk in one pass. Indexing stays with the upload flow.
    async fn process_and_store(&self, params: Value) -> ToolResponse {
        let p: FileParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp,
        };
        let data = match p.decode() {
            Ok(data) => data,
            Err(resp) => return resp,
        };
        let pipeline = self.pipeline.clone();
        let filename = p.filename.clone();
        match tokio::task::spawn_blocking(move || pipeline.process(&filename, &data)).await {
            Ok(Ok(chunks)) if chunks.is_empty() => ToolResponse::ok(json!({
                "chunks_added": 0,
                "filename": p.filename,
            })),
            Ok(Ok(chunks)) => ToolResponse::ok(json!({
                "chunk_count": chunks.len(),
                "chunks": chunks,
                "filename": p.filename,
            })),
            Ok(Err(e)) => ToolResponse::error(e.to_string()),
            Err(e) => ToolResponse::error(format!("Processing task failed: {}", e)),
        }
    }

    fn chunk_documents(&self, params: Value) -> ToolResponse {
        let p: ChunkParams = match parse_params(params) {
            Ok(p) => p,
            Err(resp) => return resp,
        };
        let chunks = self.pipeline.chunker().chunk_documents(&p.documents);
        ToolResponse::ok(json!({ "chunks": chunks }))
    }
}

#[async_trait]
impl ToolServer for DocumentTools {
    fn name(&self) -> &str {
        "DocumentTools"
    }

    async fn call(&self, method: &str, params: Value) -> ToolResponse {
        match method {
            "parse_document" => self.parse_document(params).await,
            "extract_images_ocr" => self.extract_images_ocr(params).await,
            "chunk_documents" => self.chunk_documents(params),
            "process_and_store" => self.process_and_store(params).await,
            "health" => ToolResponse::ok(json!({
                "status": "ok",
                "server": self.name(),
                "ocr_available": self.pipeline.ocr().is_available(),
            })),
            other => ToolResponse::unknown_method(other),
        }
    }
}
