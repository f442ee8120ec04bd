//! Test utilities for MaxChat
//!
//! This module provides a scripted chat backend and scripted line input so
//! dispatcher and streaming behavior can be exercised without a terminal or
//! an Ollama server.

use crate::commands::dispatcher::LineSource;
use crate::error::{MaxchatError, Result};
use crate::providers::{ChatChunk, ChatStream, GenerationOptions, Message, ModelInfo, Provider};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tempfile::TempDir;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// A chat request as seen by [`ScriptedProvider`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: GenerationOptions,
}

/// Provider double with canned model lists and replies
///
/// Each `stream_chat` call consumes the next scripted reply. With no reply
/// left, the call fails before any fragment is produced.
pub struct ScriptedProvider {
    models: std::result::Result<Vec<ModelInfo>, String>,
    replies: Mutex<VecDeque<Vec<Result<ChatChunk>>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    /// Create a provider that lists `models`
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self {
            models: Ok(models),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose model listing fails with `message`
    pub fn unreachable(message: &str) -> Self {
        Self {
            models: Err(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    /// Queue a reply for the next chat request
    pub fn with_reply(self, chunks: Vec<Result<ChatChunk>>) -> Self {
        self.replies.lock().unwrap().push_back(chunks);
        self
    }

    /// Chat requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        self.models
            .clone()
            .map_err(|message| MaxchatError::Provider(message).into())
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<ChatStream> {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            options: *options,
        });

        let chunks = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MaxchatError::Provider("connection refused".to_string()))?;
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Line input double that replays a fixed list of lines
///
/// Returns `None` (end of input) once the script is exhausted. Every prompt
/// shown is recorded.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    pub prompts: Vec<String>,
    pub history: Vec<String>,
}

impl ScriptedInput {
    /// Create input that yields `lines` in order
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl LineSource for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        Ok(self.lines.pop_front())
    }

    fn add_history(&mut self, line: &str) {
        self.history.push(line.to_string());
    }
}

/// Decode output captured in a `Vec<u8>`
pub fn plain_output(out: Vec<u8>) -> String {
    String::from_utf8(out).expect("output was not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_scripted_provider_replays_and_records() {
        let provider = ScriptedProvider::new(vec![ModelInfo::new("a", "b", "c")])
            .with_reply(vec![Ok(ChatChunk::fragment("hi"))]);

        assert_eq!(provider.list_models().await.unwrap().len(), 1);

        let stream = provider
            .stream_chat("a", &[Message::user("x")], &GenerationOptions::default())
            .await
            .unwrap();
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(provider.requests()[0].model, "a");

        assert!(provider
            .stream_chat("a", &[], &GenerationOptions::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_listing() {
        let provider = ScriptedProvider::unreachable("connection refused");
        let err = provider.list_models().await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_scripted_input_ends_with_none() {
        let mut input = ScriptedInput::new(&["one"]);
        assert_eq!(input.read_line("> ").unwrap(), Some("one".to_string()));
        assert_eq!(input.read_line("> ").unwrap(), None);
        assert_eq!(input.prompts.len(), 2);
    }
}
