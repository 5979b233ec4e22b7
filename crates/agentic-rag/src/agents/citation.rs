//! Citation selection

use std::collections::HashSet;

use crate::types::{Chunk, Citation};

use super::state::PipelineState;

/// Citations from chunks sharing the top chunk's source, unique by
/// `(source, page)` in rank order
pub fn select_citations(chunks: &[Chunk]) -> Vec<Citation> {
    let Some(top) = chunks.first() else {
        return Vec::new();
    };
    let top_source = top.source();

    let mut seen = HashSet::new();
    chunks
        .iter()
        .filter(|c| c.source() == top_source)
        .map(|c| Citation {
            source: c.source().to_string(),
            page: c.metadata.page_label(),
        })
        .filter(|citation| seen.insert(citation.clone()))
        .collect()
}

/// Attach citations and finalize the response
pub fn cite(state: &mut PipelineState) {
    state.citations = select_citations(&state.reranked_chunks);
    state.final_response = state.generated_answer.clone();
    tracing::info!("Citation: {} citations", state.citations.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkMetadata, PageRef};

    fn chunk(source: &str, page: PageRef) -> Chunk {
        Chunk::new("text", ChunkMetadata::page(source, page))
    }

    #[test]
    fn test_only_top_source_deduplicated() {
        let chunks = vec![
            chunk("manual.pdf", PageRef::Number(4)),
            chunk("other.pdf", PageRef::Number(1)),
            chunk("manual.pdf", PageRef::Number(2)),
            chunk("manual.pdf", PageRef::Number(4)),
        ];
        let citations = select_citations(&chunks);
        assert_eq!(
            citations,
            vec![
                Citation { source: "manual.pdf".into(), page: "4".into() },
                Citation { source: "manual.pdf".into(), page: "2".into() },
            ]
        );
    }

    #[test]
    fn test_cite_sets_final_response() {
        let mut state = PipelineState::new("q", "s", Vec::new());
        state.generated_answer = "Answer".into();
        cite(&mut state);
        assert!(state.citations.is_empty());
        assert_eq!(state.final_response, "Answer");
    }
}
