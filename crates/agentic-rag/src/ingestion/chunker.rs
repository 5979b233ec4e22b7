//! Recursive character text splitting with overlap
//!
//! Text is split on the first separator it contains, pieces are merged back up
//! to `chunk_size` characters, and any piece that is still too long is split
//! again with the remaining separators. Sizes are counted in chars.

use std::collections::VecDeque;

use crate::types::{Chunk, PageDocument};

/// Default separator hierarchy: paragraphs, lines, sentences, words, chars
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    overlap: usize,
    separators: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl RecursiveChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size.saturating_sub(1)),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Chunk page documents; every chunk copies its page's metadata
    pub fn chunk_documents(&self, docs: &[PageDocument]) -> Vec<Chunk> {
        docs.iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(|piece| Chunk::new(piece, doc.metadata.clone()))
            })
            .collect()
    }

    /// Split text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_recursive(text, &separators)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (position, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len().saturating_sub(1), ""));
        let remaining = separators.get(position + 1..).unwrap_or(&[]);

        let mut chunks = Vec::new();
        let mut good_splits: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }
            if !good_splits.is_empty() {
                chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            chunks.extend(self.merge_splits(&good_splits));
        }
        chunks
    }

    /// Greedily join small splits into chunks, keeping up to `overlap`
    /// characters of trailing splits as the start of the next chunk
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for split in splits {
            let len = char_len(split);
            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current);
                while total > self.overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(split);
            total += len;
        }

        push_joined(&mut docs, &current);
        docs
    }
}

impl Default for RecursiveChunker {
    fn default() -> Self {
        Self::new(512, 64)
    }
}

fn push_joined(docs: &mut Vec<String>, parts: &VecDeque<&str>) {
    let joined: String = parts.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Split `text` on `separator`, attaching each separator to the piece that
/// follows it. An empty separator splits into chars.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.match_indices(separator) {
        if index > start {
            pieces.push(&text[start..index]);
        }
        start = index;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}
