//! Streaming of a single chat turn
//!
//! [`run_turn`] sends the transcript plus a new user message to the backend,
//! echoes reply fragments as they arrive, and commits the turn to the session
//! only once the whole reply has been received.

use crate::error::Result;
use crate::providers::{Provider, StreamStats};
use crate::session::Session;
use colored::Colorize;
use futures::StreamExt;
use std::io::Write;

/// Outcome of a streamed turn that completed without error
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Full assistant reply
    pub reply: String,
    /// Statistics from the final fragment, if the backend sent them
    pub stats: Option<StreamStats>,
    /// Whether the turn was appended to the transcript
    pub committed: bool,
}

/// Run one user turn against the backend
///
/// Fragments are written to `out` and flushed as they arrive. When the final
/// fragment carries statistics, a `Token/s: ...` line follows the reply.
///
/// # Arguments
///
/// * `session` - Session providing the context; receives the turn on success
/// * `provider` - Chat backend
/// * `user_text` - The new user message
/// * `out` - Conversation output
///
/// # Errors
///
/// Returns error if the request fails or the stream yields an error. The
/// session is not modified in that case, even if fragments were already
/// printed.
pub async fn run_turn<W: Write>(
    session: &mut Session,
    provider: &dyn Provider,
    user_text: &str,
    out: &mut W,
) -> Result<TurnReport> {
    let messages = session.request_messages(user_text);
    let mut stream = provider
        .stream_chat(session.model(), &messages, &session.params())
        .await?;

    write!(out, "{}", "AI: ".cyan())?;
    out.flush()?;

    let mut reply = String::new();
    let mut stats = None;

    while let Some(item) = stream.next().await {
        let chunk = match item {
            Ok(chunk) => chunk,
            Err(e) => {
                writeln!(out)?;
                tracing::warn!(
                    partial_bytes = reply.len(),
                    "Discarding partial reply: {}",
                    e
                );
                return Err(e);
            }
        };

        if !chunk.content.is_empty() {
            write!(out, "{}", chunk.content.yellow())?;
            out.flush()?;
            reply.push_str(&chunk.content);
        }

        if chunk.done {
            stats = chunk.stats;
            break;
        }
    }

    writeln!(out)?;
    if let Some(stats) = &stats {
        writeln!(out, "{}", stats.to_string().magenta())?;
    }

    let committed = session.append_turn(user_text, &reply);
    if committed {
        tracing::debug!(
            transcript_len = session.transcript().len(),
            "Turn committed"
        );
    } else {
        writeln!(
            out,
            "{}",
            "The model returned an empty reply; nothing was added to the history.".yellow()
        )?;
    }

    Ok(TurnReport {
        reply,
        stats,
        committed,
    })
}
