//! Query validation and time-sensitivity routing

use super::state::PipelineState;

/// Substrings that mark a query as needing fresh web results
pub const WEB_KEYWORDS: &[&str] = &[
    "today",
    "latest",
    "current",
    "news",
    "recent",
    "now",
    "2024",
    "2025",
    "2026",
    "this week",
    "this month",
    "this year",
    "trending",
    "breaking",
    "update",
    "new",
];

pub fn is_time_sensitive(query: &str) -> bool {
    let lower = query.to_lowercase();
    WEB_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Trim the query and flag time-sensitive questions for web search.
///
/// Returns `false` when the query is empty; the state then already carries
/// the final response.
pub fn orchestrate(state: &mut PipelineState) -> bool {
    let query = state.query.trim().to_string();
    if query.is_empty() {
        state.error = Some("Empty query".to_string());
        state.final_response = "Please provide a non-empty question.".to_string();
        return false;
    }

    state.needs_web_search = is_time_sensitive(&query);
    state.query = query;
    state.error = None;
    tracing::info!(
        "Orchestrator: needs_web_search={} for '{}'",
        state.needs_web_search,
        state.query
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_stops() {
        let mut state = PipelineState::new("   ", "s", Vec::new());
        assert!(!orchestrate(&mut state));
        assert_eq!(state.error.as_deref(), Some("Empty query"));
        assert_eq!(state.final_response, "Please provide a non-empty question.");
    }

    #[test]
    fn test_keyword_detection() {
        let mut state = PipelineState::new("  What is the LATEST Rust release? ", "s", Vec::new());
        assert!(orchestrate(&mut state));
        assert_eq!(state.query, "What is the LATEST Rust release?");
        assert!(state.needs_web_search);

        let mut state = PipelineState::new("Explain ownership", "s", Vec::new());
        assert!(orchestrate(&mut state));
        assert!(!state.needs_web_search);
    }

    #[test]
    fn test_substring_match_is_loose() {
        // "renewal" contains "new"
        assert!(is_time_sensitive("contract renewal terms"));
        assert!(!is_time_sensitive("contract terms"));
    }
}
