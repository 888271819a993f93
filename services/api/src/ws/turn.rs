//! Relays one prompt to the model and streams the reply back as frames.

use super::{protocol::ServerMessage, session::send_msg};
use crate::config::Provider;
use anyhow::Result;
use axum::extract::ws::Message;
use futures_util::{Sink, StreamExt};
use relay_core::llm_client::{ChatSession, GenerationError, LLMStreamEvent};
use tracing::{debug, error, info};

const PREVIEW_CHARS: usize = 100;

/// Handles a single turn: prompt in, fragments out, sentinel last.
///
/// Generation failures are reported to the client as a text frame and do not
/// end the session. The returned error is always a transport failure.
pub(crate) async fn relay_turn<S>(
    sink: &mut S,
    chat: &mut dyn ChatSession,
    prompt: &str,
    provider: &Provider,
) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    debug!(prompt_len = prompt.len(), "Sending prompt to chat session");

    let mut stream = match chat.send_message_stream(prompt).await {
        Ok(stream) => stream,
        Err(e) => return report_failure(sink, provider, e).await,
    };

    let mut preview = String::new();
    let mut preview_chars = 0;
    let mut chunks_sent = 0usize;

    while let Some(event) = stream.next().await {
        match event {
            Ok(LLMStreamEvent::TextChunk(chunk)) => {
                if chunk.is_empty() {
                    continue;
                }
                let room = PREVIEW_CHARS.saturating_sub(preview_chars);
                if room > 0 {
                    let head: String = chunk.chars().take(room).collect();
                    preview_chars += head.chars().count();
                    preview.push_str(&head);
                }
                send_msg(sink, ServerMessage::Chunk(chunk)).await?;
                chunks_sent += 1;
            }
            Err(e) => return report_failure(sink, provider, e).await,
        }
    }

    info!(
        chunks = chunks_sent,
        preview = %preview,
        "Generated and sent assistant response."
    );
    send_msg(sink, ServerMessage::End).await
}

async fn report_failure<S>(sink: &mut S, provider: &Provider, e: GenerationError) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    error!(%provider, error = %e, "Error generating content");
    send_msg(
        sink,
        ServerMessage::GenerationFailed {
            provider: provider.clone(),
            error: e.to_string(),
        },
    )
    .await?;
    send_msg(sink, ServerMessage::End).await
}
