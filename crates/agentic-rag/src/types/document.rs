//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported upload formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect file type from a filename's extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
        }
    }
}

/// Page reference of a chunk: a 1-based page number or a label such as
/// `"ocr"` or `"web"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageRef {
    Number(u32),
    Label(String),
}

impl PageRef {
    /// Label used for text recovered through OCR
    pub fn ocr() -> Self {
        Self::Label("ocr".to_string())
    }

    /// Label used for web search results
    pub fn web() -> Self {
        Self::Label("web".to_string())
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Label(label) => f.write_str(label),
        }
    }
}

/// Source metadata carried by every chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Uploaded filename, or URL for web results
    pub source: String,
    /// Page within the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageRef>,
    /// Origin marker, e.g. `web_search`
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Title of a web result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Score assigned by the re-ranker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank_score: Option<f32>,
}

impl ChunkMetadata {
    /// Metadata for a page of an uploaded file
    pub fn page(source: impl Into<String>, page: PageRef) -> Self {
        Self {
            source: source.into(),
            page: Some(page),
            ..Default::default()
        }
    }

    /// Page rendered for prompts and citations (`?` when unknown)
    pub fn page_label(&self) -> String {
        self.page
            .as_ref()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Whether this chunk came from web search
    pub fn is_web(&self) -> bool {
        self.kind.as_deref() == Some("web_search")
    }
}

/// A page-level document produced by a parser, before chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDocument {
    /// Page text
    pub content: String,
    /// Source metadata inherited by all chunks of this page
    pub metadata: ChunkMetadata,
}

impl PageDocument {
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A chunk of text indexed for retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Chunk text
    pub content: String,
    /// Source metadata
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a new chunk with a fresh ID
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            metadata,
        }
    }

    /// Source filename or URL
    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// Registry entry for an ingested upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Original filename (also the chunk source)
    pub filename: String,
    /// RFC 3339 upload time
    pub upload_time: String,
    /// Number of chunks indexed
    pub chunks: usize,
    /// SHA-256 of the uploaded bytes
    #[serde(default)]
    pub content_hash: String,
}
