//! Ollama provider implementation for MaxChat
//!
//! This module implements the Provider trait for Ollama, connecting to a local
//! or remote Ollama server to list models and stream chat completions.
//! Streaming replies arrive as newline-delimited JSON and are decoded into
//! [`ChatChunk`]s as bytes come in.

use crate::config::OllamaConfig;
use crate::error::{MaxchatError, Result};
use crate::providers::{
    ChatChunk, ChatStream, GenerationOptions, Message, ModelInfo, Provider, StreamStats,
};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;
use std::time::Duration;

/// Ollama API provider
///
/// # Examples
///
/// ```no_run
/// use maxchat::config::OllamaConfig;
/// use maxchat::providers::{GenerationOptions, Message, OllamaProvider, Provider};
/// use futures::StreamExt;
///
/// # async fn example() -> maxchat::error::Result<()> {
/// let provider = OllamaProvider::new(OllamaConfig::default())?;
/// let messages = vec![Message::system("Be brief"), Message::user("Hello!")];
/// let mut stream = provider
///     .stream_chat("llama3.2:latest", &messages, &GenerationOptions::default())
///     .await?;
/// while let Some(chunk) = stream.next().await {
///     print!("{}", chunk?.content);
/// }
/// # Ok(())
/// # }
/// ```
pub struct OllamaProvider {
    client: Client,
    host: String,
    request_timeout: Duration,
}

/// Response from Ollama's /api/tags endpoint
#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModelTag>,
}

/// Model entry from /api/tags
#[derive(Debug, Deserialize)]
struct OllamaModelTag {
    name: String,
    #[serde(default)]
    details: OllamaModelDetails,
}

/// Model details nested in a tag entry
#[derive(Debug, Deserialize, Default)]
struct OllamaModelDetails {
    #[serde(default)]
    family: String,
    #[serde(default)]
    parameter_size: String,
}

/// Request body for /api/chat
#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: OllamaOptions,
}

/// Sampling options in Ollama's naming
#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_ctx: u32,
}

impl From<&GenerationOptions> for OllamaOptions {
    fn from(options: &GenerationOptions) -> Self {
        Self {
            temperature: options.temperature,
            num_ctx: options.context_window,
        }
    }
}

/// One line of a streamed /api/chat response
#[derive(Debug, Deserialize)]
struct OllamaStreamLine {
    #[serde(default)]
    message: Option<OllamaStreamMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    eval_duration: u64,
    #[serde(default)]
    load_duration: u64,
    #[serde(default)]
    prompt_eval_duration: u64,
}

#[derive(Debug, Deserialize)]
struct OllamaStreamMessage {
    #[serde(default)]
    content: String,
}

impl OllamaStreamLine {
    fn into_chunk(self) -> ChatChunk {
        let content = self.message.map(|m| m.content).unwrap_or_default();
        if self.done {
            ChatChunk::done(
                content,
                StreamStats {
                    eval_count: self.eval_count,
                    eval_duration: self.eval_duration,
                    load_duration: self.load_duration,
                    prompt_eval_duration: self.prompt_eval_duration,
                },
            )
        } else {
            ChatChunk::fragment(content)
        }
    }
}

impl OllamaProvider {
    /// Create a new Ollama provider instance
    ///
    /// # Arguments
    ///
    /// * `config` - Ollama configuration containing host and timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use maxchat::config::OllamaConfig;
    /// use maxchat::providers::OllamaProvider;
    ///
    /// let provider = OllamaProvider::new(OllamaConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: OllamaConfig) -> Result<Self> {
        let request_timeout = Duration::from_secs(config.timeout_seconds);
        // Streamed replies have no overall deadline; only connecting and
        // model listing are bounded.
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .user_agent(concat!("maxchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MaxchatError::Http)
            .context("Failed to create HTTP client")?;

        let host = config.host.trim_end_matches('/').to_string();
        tracing::debug!("Initialized Ollama provider: host={}", host);

        Ok(Self {
            client,
            host,
            request_timeout,
        })
    }

    /// Get the configured Ollama host
    pub fn host(&self) -> &str {
        &self.host
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.host);
        tracing::debug!("Fetching models from Ollama: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch Ollama models: {}", e);
                MaxchatError::Provider(format!("Failed to connect to Ollama server: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(MaxchatError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse Ollama tags response: {}", e);
                MaxchatError::Http(e)
            })
            .context("Failed to parse Ollama model list")?;

        let models: Vec<ModelInfo> = tags
            .models
            .into_iter()
            .map(|tag| ModelInfo::new(tag.name, tag.details.family, tag.details.parameter_size))
            .collect();

        tracing::debug!("Ollama reported {} models", models.len());
        Ok(models)
    }

    async fn stream_chat(
        &self,
        model: &str,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<ChatStream> {
        let url = format!("{}/api/chat", self.host);
        let request = OllamaChatRequest {
            model,
            messages,
            stream: true,
            options: options.into(),
        };

        tracing::debug!(
            model,
            messages = messages.len(),
            temperature = options.temperature,
            num_ctx = options.context_window,
            "Sending Ollama chat request"
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Ollama request failed: {}", e);
                MaxchatError::Provider(format!("Ollama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Ollama returned error {}: {}", status, error_text);
            return Err(MaxchatError::Provider(format!(
                "Ollama returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        Ok(decode_chat_stream(response.bytes_stream()))
    }
}

/// Decoder state carried between polls of the byte stream
struct NdjsonDecoder<S> {
    bytes: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<ChatChunk>>,
    finished: bool,
}

impl<S> NdjsonDecoder<S> {
    /// Decode every complete line currently buffered
    fn drain_lines(&mut self) {
        while !self.finished {
            let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line[..pos]);
        }
    }

    fn decode_line(&mut self, line: &[u8]) {
        if line.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        let parsed: OllamaStreamLine = match serde_json::from_slice(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::error!("Failed to parse Ollama stream line: {}", e);
                self.finish(Err(MaxchatError::Provider(format!(
                    "Failed to parse Ollama stream: {}",
                    e
                ))
                .into()));
                return;
            }
        };

        if let Some(message) = parsed.error {
            tracing::error!("Ollama stream reported error: {}", message);
            self.finish(Err(MaxchatError::Provider(format!(
                "Ollama returned error: {}",
                message
            ))
            .into()));
            return;
        }

        let chunk = parsed.into_chunk();
        if chunk.done {
            tracing::debug!(stats = ?chunk.stats, "Ollama stream complete");
            self.finish(Ok(chunk));
        } else {
            self.pending.push_back(Ok(chunk));
        }
    }

    /// Queue a final item; nothing after it is decoded
    fn finish(&mut self, item: Result<ChatChunk>) {
        self.pending.push_back(item);
        self.finished = true;
        self.buffer.clear();
    }
}

/// Turn a raw NDJSON byte stream from /api/chat into a [`ChatStream`]
///
/// Lines may be split across byte chunks at any offset. The returned stream
/// ends after the `done` line. An `{"error": ...}` line, an undecodable line,
/// or a transport error becomes an error item and ends the stream. If the
/// bytes run out before a `done` line, the stream ends with
/// `MaxchatError::StreamIncomplete`.
pub fn decode_chat_stream<S, E>(byte_stream: S) -> ChatStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let decoder = NdjsonDecoder {
        bytes: Box::pin(byte_stream),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(decoder, |mut decoder| async move {
        loop {
            if let Some(item) = decoder.pending.pop_front() {
                return Some((item, decoder));
            }
            if decoder.finished {
                return None;
            }

            match decoder.bytes.next().await {
                Some(Ok(chunk)) => {
                    decoder.buffer.extend_from_slice(&chunk);
                    decoder.drain_lines();
                }
                Some(Err(e)) => {
                    tracing::warn!("Ollama stream interrupted: {}", e);
                    decoder.finish(Err(MaxchatError::StreamInterrupted(e.to_string()).into()));
                }
                None => {
                    // Last line may lack a trailing newline
                    let rest = std::mem::take(&mut decoder.buffer);
                    decoder.decode_line(&rest);
                    if !decoder.finished {
                        tracing::warn!("Ollama stream ended without a done line");
                        decoder.finish(Err(MaxchatError::StreamIncomplete.into()));
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn byte_stream(
        parts: Vec<&'static [u8]>,
    ) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static {
        futures::stream::iter(
            parts
                .into_iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(stream: ChatStream) -> Vec<Result<ChatChunk>> {
        stream.collect().await
    }

    fn error_kind(item: &Result<ChatChunk>) -> &MaxchatError {
        item.as_ref()
            .unwrap_err()
            .downcast_ref::<MaxchatError>()
            .expect("not a MaxchatError")
    }

    const FRAGMENT_BONJOUR: &[u8] =
        b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"Bonjour\"},\"done\":false}\n";
    const FRAGMENT_BANG: &[u8] =
        b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"!\"},\"done\":false}\n";
    const DONE: &[u8] = b"{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"eval_count\":2,\"eval_duration\":2000000000,\"load_duration\":500000000,\"prompt_eval_duration\":100000000}\n";

    #[test]
    fn test_ollama_provider_creation() {
        let provider = OllamaProvider::new(OllamaConfig::default());
        assert!(provider.is_ok());
    }

    #[test]
    fn test_ollama_provider_host_trims_trailing_slash() {
        let config = OllamaConfig {
            host: "http://localhost:11434/".to_string(),
            ..OllamaConfig::default()
        };
        let provider = OllamaProvider::new(config).unwrap();
        assert_eq!(provider.host(), "http://localhost:11434");
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![Message::system("Be brief"), Message::user("Hello")];
        let request = OllamaChatRequest {
            model: "llama3.2:latest",
            messages: &messages,
            stream: true,
            options: (&GenerationOptions {
                temperature: 0.5,
                context_window: 4096,
            })
                .into(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.2:latest");
        assert_eq!(value["stream"], true);
        assert_eq!(value["options"]["temperature"], 0.5);
        assert_eq!(value["options"]["num_ctx"], 4096);
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "Hello");
    }

    #[test]
    fn test_tags_response_missing_details() {
        let tags: OllamaTagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"tiny:latest"}]}"#).unwrap();
        assert_eq!(tags.models[0].name, "tiny:latest");
        assert!(tags.models[0].details.family.is_empty());
    }

    #[tokio::test]
    async fn test_decode_complete_stream() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            FRAGMENT_BONJOUR,
            FRAGMENT_BANG,
            DONE,
        ])))
        .await;

        assert_eq!(items.len(), 3);
        let chunks: Vec<ChatChunk> = items.into_iter().map(|i| i.unwrap()).collect();
        assert_eq!(chunks[0], ChatChunk::fragment("Bonjour"));
        assert_eq!(chunks[1], ChatChunk::fragment("!"));
        assert!(chunks[2].done);
        let stats = chunks[2].stats.unwrap();
        assert_eq!(stats.eval_count, 2);
        assert_eq!(stats.tokens_per_second(), 1.0);
        assert_eq!(stats.load_seconds(), 0.5);
    }

    #[tokio::test]
    async fn test_decode_lines_split_across_chunks() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            b"{\"message\":{\"content\":\"Bon",
            b"jour\"},\"done\":false}\n{\"message\":{\"content\":\"!\"},",
            b"\"done\":false}\n",
            DONE,
        ])))
        .await;

        let text: String = items
            .iter()
            .map(|i| i.as_ref().unwrap().content.clone())
            .collect();
        assert_eq!(text, "Bonjour!");
        assert_eq!(items.len(), 3);
    }

    #[tokio::test]
    async fn test_decode_multibyte_utf8_split_across_chunks() {
        // "è" is 0xC3 0xA8
        let items = collect(decode_chat_stream(byte_stream(vec![
            b"{\"message\":{\"content\":\"caff\xC3",
            b"\xA8\"},\"done\":false}\n",
            DONE,
        ])))
        .await;

        assert_eq!(items[0].as_ref().unwrap().content, "caffè");
    }

    #[tokio::test]
    async fn test_decode_done_without_trailing_newline() {
        let done = &DONE[..DONE.len() - 1];
        let items = collect(decode_chat_stream(byte_stream(vec![FRAGMENT_BONJOUR, done]))).await;
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn test_decode_ignores_blank_lines() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            b"\n\r\n",
            FRAGMENT_BONJOUR,
            b"\n",
            DONE,
        ])))
        .await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_decode_stops_after_done() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            FRAGMENT_BONJOUR,
            DONE,
            FRAGMENT_BANG,
        ])))
        .await;
        assert_eq!(items.len(), 2);
        assert!(items[1].as_ref().unwrap().done);
    }

    #[tokio::test]
    async fn test_decode_error_line() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            FRAGMENT_BONJOUR,
            b"{\"error\":\"model runner has unexpectedly stopped\"}\n",
            FRAGMENT_BANG,
        ])))
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        let err = error_kind(&items[1]);
        assert!(matches!(err, MaxchatError::Provider(msg) if msg.contains("unexpectedly stopped")));
    }

    #[tokio::test]
    async fn test_decode_invalid_json_line() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            FRAGMENT_BONJOUR,
            b"not json\n",
            DONE,
        ])))
        .await;

        assert_eq!(items.len(), 2);
        assert!(matches!(error_kind(&items[1]), MaxchatError::Provider(_)));
    }

    #[tokio::test]
    async fn test_decode_truncated_stream() {
        let items = collect(decode_chat_stream(byte_stream(vec![
            FRAGMENT_BONJOUR,
            FRAGMENT_BANG,
        ])))
        .await;

        assert_eq!(items.len(), 3);
        assert!(matches!(error_kind(&items[2]), MaxchatError::StreamIncomplete));
    }

    #[tokio::test]
    async fn test_decode_transport_error() {
        let parts: Vec<std::result::Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(FRAGMENT_BONJOUR)),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
            Ok(Bytes::from_static(DONE)),
        ];
        let items = collect(decode_chat_stream(futures::stream::iter(parts))).await;

        assert_eq!(items.len(), 2);
        assert!(matches!(
            error_kind(&items[1]),
            MaxchatError::StreamInterrupted(msg) if msg.contains("connection reset")
        ));
    }
}
