//! Upload parser producing page-level documents

use crate::error::{Error, Result};
use crate::types::{ChunkMetadata, FileType, PageDocument, PageRef};

/// Normalize extracted text: drop NULs, unify line endings, replace common
/// typographic glyphs with ASCII
fn cleanup_text(text: &str) -> String {
    text.replace('\0', "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Upload parser
pub struct FileParser;

impl FileParser {
    /// Parse an upload into page documents based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<Vec<PageDocument>> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            let ext = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            Error::UnsupportedFileType(ext.to_string())
        })?;

        tracing::debug!("Parsing {} as {}", filename, file_type.display_name());

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Txt | FileType::Markdown => Ok(Self::parse_text(filename, data)),
        }
    }

    /// Plain text and markdown become a single page
    fn parse_text(filename: &str, data: &[u8]) -> Vec<PageDocument> {
        let content = cleanup_text(&String::from_utf8_lossy(data));
        if content.trim().is_empty() {
            return Vec::new();
        }
        vec![PageDocument::new(
            content,
            ChunkMetadata::page(filename, PageRef::Number(1)),
        )]
    }

    /// Extract PDF text page by page, falling back to whole-document extraction
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<Vec<PageDocument>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages = Vec::new();
        for page_number in doc.get_pages().keys().copied() {
            match doc.extract_text(&[page_number]) {
                Ok(text) => {
                    let text = cleanup_text(&text);
                    if !text.trim().is_empty() {
                        pages.push(PageDocument::new(
                            text,
                            ChunkMetadata::page(filename, PageRef::Number(page_number)),
                        ));
                    }
                }
                Err(e) => {
                    tracing::debug!("lopdf could not extract page {} of {}: {}", page_number, filename, e);
                }
            }
        }

        if !pages.is_empty() {
            return Ok(pages);
        }

        tracing::debug!("No per-page text in {}, trying pdf-extract", filename);
        match pdf_extract::extract_text_from_mem(data) {
            Ok(text) => {
                let text = cleanup_text(&text);
                if text.trim().is_empty() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![PageDocument::new(
                        text,
                        ChunkMetadata::page(filename, PageRef::Number(1)),
                    )])
                }
            }
            Err(e) => {
                tracing::warn!("pdf-extract failed for {}: {}", filename, e);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_file() {
        let docs = FileParser::parse("notes.txt", b"Hello world\r\nSecond line").unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "Hello world\nSecond line");
        assert_eq!(docs[0].metadata.source, "notes.txt");
        assert_eq!(docs[0].metadata.page, Some(PageRef::Number(1)));
    }

    #[test]
    fn test_parse_markdown_lossy() {
        let docs = FileParser::parse("README.md", b"# Title\n\xffbody").unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].content.starts_with("# Title"));
        assert!(docs[0].content.contains("body"));
    }

    #[test]
    fn test_empty_text_yields_no_pages() {
        assert!(FileParser::parse("empty.txt", b"  \n ").unwrap().is_empty());
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileParser::parse("data.xlsx", b"whatever").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ext) if ext == "xlsx"));
    }

    #[test]
    fn test_invalid_pdf() {
        let err = FileParser::parse("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_cleanup_text() {
        assert_eq!(cleanup_text("a\0b \u{201C}q\u{201D} \u{FB01}le"), "ab \"q\" file");
    }
}
