//! Upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};

use crate::error::{Error, Result};
use crate::ingestion::content_hash;
use crate::server::state::AppState;
use crate::types::{FileType, UploadResponse, UploadResult, UploadedFile};

/// Multipart fields carrying files
const FILE_FIELDS: &[&str] = &["files", "file"];

/// Strip any client-supplied directory components
fn clean_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("document")
        .to_string()
}

/// POST /upload - Ingest PDF/TXT/MD files
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::invalid_request(format!("Failed to read multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if !FILE_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let filename = clean_filename(field.file_name().unwrap_or("document"));
        match field.bytes().await {
            Ok(data) => files.push((filename, Ok(data.to_vec()))),
            Err(e) => files.push((filename, Err(format!("Failed to read file: {}", e)))),
        }
    }

    if files.is_empty() {
        return Err(Error::invalid_request("No files provided"));
    }

    let _guard = state.lock_ingest().await;
    let mut results = Vec::with_capacity(files.len());
    for (filename, data) in files {
        let result = match data {
            Ok(data) => ingest_file(&state, filename, data).await,
            Err(reason) => UploadResult::error(filename, reason),
        };
        results.push(result);
    }

    Ok(Json(UploadResponse { results }))
}

async fn ingest_file(state: &AppState, filename: String, data: Vec<u8>) -> UploadResult {
    if FileType::from_filename(&filename).is_none() {
        return UploadResult::skipped(filename, "Unsupported format");
    }

    let hash = content_hash(&data);
    let previous = state.find_upload(&filename);
    if previous.as_ref().is_some_and(|p| p.content_hash == hash) {
        tracing::info!("Skipping unchanged file: {}", filename);
        return UploadResult::skipped(filename, "Unchanged");
    }

    tracing::info!("Processing file: {} ({} bytes)", filename, data.len());
    match index_file(state, &filename, data, hash, previous.is_some()).await {
        Ok(chunks) => UploadResult::ok(filename, chunks),
        Err(e) => {
            tracing::error!("Failed to process {}: {}", filename, e);
            UploadResult::error(filename, e.to_string())
        }
    }
}

/// Parse, chunk and index `data`. A previous version of the file stays
/// indexed until the new chunks are embedded and ready to take its place.
async fn index_file(
    state: &AppState,
    filename: &str,
    data: Vec<u8>,
    hash: String,
    replaces: bool,
) -> Result<usize> {
    let pipeline = state.ingest().clone();
    let name = filename.to_string();
    let chunks = tokio::task::spawn_blocking(move || pipeline.process(&name, &data))
        .await
        .map_err(|e| Error::internal(format!("Ingestion task failed: {}", e)))??;

    if chunks.is_empty() {
        if replaces {
            return Err(Error::file_parse(
                filename,
                "No text extracted, previous version kept",
            ));
        }
        tracing::warn!("No text extracted from {}", filename);
        return Ok(0);
    }

    let count = chunks.len();
    if replaces {
        let counts = state.searcher().replace_source(filename, chunks).await?;
        tracing::info!(
            "Replaced old version of '{}': {} vector, {} BM25 chunks removed",
            filename,
            counts.vector_store,
            counts.bm25
        );
    } else {
        state.searcher().add_chunks(&chunks).await?;
    }

    state.record_upload(UploadedFile {
        filename: filename.to_string(),
        upload_time: chrono::Local::now().to_rfc3339(),
        chunks: count,
        content_hash: hash,
    })?;

    tracing::info!("Ingested '{}': {} chunks", filename, count);
    Ok(count)
}
