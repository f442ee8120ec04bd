use crate::providers::Message;
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// Snapshot of a conversation as written to disk
///
/// Serializes to `{"model": ..., "messages": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedChat {
    /// Model the conversation was held with
    pub model: String,
    /// Transcript, system prompt first
    pub messages: Vec<Message>,
}

impl SavedChat {
    /// Capture the model and transcript of a live session
    pub fn from_session(session: &Session) -> Self {
        Self {
            model: session.model().to_string(),
            messages: session.transcript().to_vec(),
        }
    }
}
