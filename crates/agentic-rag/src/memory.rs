//! Per-session conversation memory

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::storage::{read_json, write_json_atomic};
use crate::types::{Message, Role, SessionSummary};

const SUMMARY_CHARS: usize = 50;

/// Ordered messages keyed by session id
#[derive(Debug, Default)]
pub struct ConversationMemory {
    sessions: RwLock<HashMap<String, Vec<Message>>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time
    pub fn add(&self, session_id: &str, role: Role, content: impl Into<String>) {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(Message::now(role, content));
    }

    /// Last `limit` messages of a session, oldest first. A limit of 0 returns
    /// the whole session.
    pub fn get(&self, session_id: &str, limit: usize) -> Vec<Message> {
        let sessions = self.sessions.read();
        match sessions.get(session_id) {
            Some(messages) if limit == 0 => messages.clone(),
            Some(messages) => {
                let start = messages.len().saturating_sub(limit);
                messages[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    /// Last `pairs` user/assistant exchanges; 0 returns everything
    pub fn window(&self, session_id: &str, pairs: usize) -> Vec<Message> {
        self.get(session_id, pairs.saturating_mul(2))
    }

    /// Drop a session's messages but keep the session
    pub fn clear(&self, session_id: &str) {
        if let Some(messages) = self.sessions.write().get_mut(session_id) {
            messages.clear();
        }
    }

    /// Delete a session, returning whether it existed
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Non-empty sessions, most recently updated first
    pub fn sessions(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read();
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .filter(|(_, messages)| !messages.is_empty())
            .map(|(id, messages)| {
                let first_message = messages
                    .iter()
                    .find(|m| m.role == Role::User)
                    .map(|m| {
                        let head: String = m.content.chars().take(SUMMARY_CHARS).collect();
                        format!("{}...", head)
                    })
                    .unwrap_or_else(|| "New conversation".to_string());
                let last_updated = messages
                    .iter()
                    .map(|m| m.timestamp.as_str())
                    .max()
                    .unwrap_or_default()
                    .to_string();
                SessionSummary {
                    id: id.clone(),
                    first_message,
                    message_count: messages.len(),
                    last_updated,
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        summaries
    }

    /// Persist all sessions as a JSON object
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, &*self.sessions.read())
    }

    /// Load sessions from JSON; a missing file gives an empty memory
    pub fn load(path: &Path) -> Result<Self> {
        let sessions: HashMap<String, Vec<Message>> = read_json(path)?.unwrap_or_default();
        tracing::info!("Loaded {} conversation sessions", sessions.len());
        Ok(Self {
            sessions: RwLock::new(sessions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(role: Role, content: &str, timestamp: &str) -> Message {
        Message {
            role,
            content: content.to_string(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_add_get_and_limit() {
        let memory = ConversationMemory::new();
        for i in 0..5 {
            memory.add("s1", Role::User, format!("q{}", i));
            memory.add("s1", Role::Assistant, format!("a{}", i));
        }

        let last = memory.get("s1", 3);
        let contents: Vec<&str> = last.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a3", "q4", "a4"]);
        assert!(memory.get("unknown", 20).is_empty());
        assert_eq!(memory.get("s1", 0).len(), 10);
        assert!(memory.get("unknown", 0).is_empty());

        assert_eq!(memory.window("s1", 2).len(), 4);
        assert_eq!(memory.window("s1", 0).len(), 10);
    }

    #[test]
    fn test_clear_and_remove() {
        let memory = ConversationMemory::new();
        memory.add("s1", Role::User, "hello");
        memory.clear("s1");
        assert!(memory.get("s1", 20).is_empty());
        assert!(memory.contains("s1"));
        assert!(memory.sessions().is_empty());

        assert!(memory.remove("s1"));
        assert!(!memory.remove("s1"));
    }

    #[test]
    fn test_session_summaries() {
        let memory = ConversationMemory::new();
        {
            let mut sessions = memory.sessions.write();
            sessions.insert(
                "old".into(),
                vec![
                    message(Role::User, &"x".repeat(80), "2025-01-01T10:00:00+00:00"),
                    message(Role::Assistant, "answer", "2025-01-01T10:00:05+00:00"),
                ],
            );
            sessions.insert(
                "new".into(),
                vec![message(Role::Assistant, "greeting", "2025-02-01T09:00:00+00:00")],
            );
            sessions.insert("empty".into(), Vec::new());
        }

        let summaries = memory.sessions();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "new");
        assert_eq!(summaries[0].first_message, "New conversation");
        assert_eq!(summaries[1].first_message, format!("{}...", "x".repeat(50)));
        assert_eq!(summaries[1].message_count, 2);
        assert_eq!(summaries[1].last_updated, "2025-01-01T10:00:05+00:00");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation_history.json");

        let memory = ConversationMemory::new();
        memory.add("abc", Role::User, "What is BM25?");
        memory.add("abc", Role::Assistant, "A ranking function.");
        memory.save(&path).unwrap();

        let loaded = ConversationMemory::load(&path).unwrap();
        assert_eq!(loaded.get("abc", 20), memory.get("abc", 20));

        let missing = ConversationMemory::load(&dir.path().join("none.json")).unwrap();
        assert!(missing.sessions().is_empty());
    }
}
