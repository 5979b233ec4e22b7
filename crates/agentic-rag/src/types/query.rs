//! Request types and conversation messages

use serde::{Deserialize, Serialize};

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The user's question
    pub query: String,
    /// Existing session to continue; a new one is created when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `POST /conversations/{session_id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessageRequest {
    /// The user's question
    pub query: String,
}

/// Query string of `GET /history`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub session_id: String,
}

/// Speaker of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One stored conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl Message {
    /// Create a message stamped with the current local time
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Local::now().to_rfc3339(),
        }
    }
}
