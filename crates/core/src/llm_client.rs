use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
        CreateChatCompletionStreamResponse, FinishReason,
    },
};
use async_trait::async_trait;
use futures::{Stream, StreamExt, stream};
use std::pin::Pin;
use tracing::{debug, warn};

/// Errors produced while generating a response for a single prompt.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The upstream API rejected the request or the stream broke.
    #[error(transparent)]
    Api(#[from] OpenAIError),
    /// The model stopped because its output was filtered.
    #[error("response blocked: {0}")]
    Blocked(String),
}

/// Represents the events that can be yielded from a streaming text response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LLMStreamEvent {
    TextChunk(String),
}

/// A stream of text chunks from the LLM, borrowing the session that produced it.
pub type LLMStream<'a> =
    Pin<Box<dyn Stream<Item = Result<LLMStreamEvent, GenerationError>> + Send + 'a>>;

/// A shared, read-only handle to a generation backend.
///
/// One client is built at process start. Every connection asks it for its own
/// [`ChatSession`], so conversations never share history.
pub trait LLMClient: Send + Sync {
    /// Opens a new conversation with empty history.
    fn create_session(&self) -> Box<dyn ChatSession>;
}

/// One conversation with the model.
///
/// The session owns its history. A prompt and the reply it produced are
/// appended only once the returned stream has been drained without error.
#[async_trait]
pub trait ChatSession: Send {
    /// Sends `prompt` with the accumulated history and streams the reply.
    async fn send_message_stream<'a>(
        &'a mut self,
        prompt: &str,
    ) -> Result<LLMStream<'a>, GenerationError>;
}

/// An implementation of `LLMClient` for any OpenAI-compatible API.
pub struct OpenAICompatibleClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the OpenAI client, including API key and base URL.
    /// * `model` - The model identifier to use for chat completions (e.g., "gemini-2.0-flash-001").
    pub fn new(config: OpenAIConfig, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LLMClient for OpenAICompatibleClient {
    fn create_session(&self) -> Box<dyn ChatSession> {
        Box::new(OpenAICompatibleChat {
            client: self.client.clone(),
            model: self.model.clone(),
            history: Vec::new(),
        })
    }
}

/// A chat session against an OpenAI-compatible chat completions endpoint.
pub struct OpenAICompatibleChat {
    client: Client<OpenAIConfig>,
    model: String,
    history: Vec<ChatCompletionRequestMessage>,
}

#[async_trait]
impl ChatSession for OpenAICompatibleChat {
    async fn send_message_stream<'a>(
        &'a mut self,
        prompt: &str,
    ) -> Result<LLMStream<'a>, GenerationError> {
        let user_message: ChatCompletionRequestMessage =
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt.to_string())
                .build()?
                .into();

        let mut messages = self.history.clone();
        messages.push(user_message.clone());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .stream(true)
            .build()?;

        debug!(model = %self.model, history_len = self.history.len(), "Opening completion stream");
        let responses = self.client.chat().create_stream(request).await?;
        let chunks = responses.flat_map(|result| {
            stream::iter(match result {
                Ok(response) => chunks_from_response(response),
                Err(e) => vec![Err(GenerationError::from(e))],
            })
        });

        Ok(record_turn(&mut self.history, user_message, chunks))
    }
}

/// Pulls the text delta out of one streamed completion chunk.
///
/// A filtered chunk still yields its own text before the `Blocked` error.
fn chunks_from_response(
    response: CreateChatCompletionStreamResponse,
) -> Vec<Result<String, GenerationError>> {
    let Some(choice) = response.choices.into_iter().next() else {
        return Vec::new();
    };
    let mut items: Vec<_> = choice
        .delta
        .content
        .filter(|content| !content.is_empty())
        .map(Ok)
        .into_iter()
        .collect();
    if matches!(choice.finish_reason, Some(FinishReason::ContentFilter)) {
        items.push(Err(GenerationError::Blocked(
            "the provider's content filter stopped the response".to_string(),
        )));
    }
    items
}

struct TurnState<'a, S> {
    history: &'a mut Vec<ChatCompletionRequestMessage>,
    user_message: ChatCompletionRequestMessage,
    chunks: S,
    reply: String,
    failed: bool,
}

/// Wraps a chunk stream so that the turn lands in `history` once it completes.
///
/// The stream ends after the first error, and nothing is recorded for that turn.
pub(crate) fn record_turn<'a, S>(
    history: &'a mut Vec<ChatCompletionRequestMessage>,
    user_message: ChatCompletionRequestMessage,
    chunks: S,
) -> LLMStream<'a>
where
    S: Stream<Item = Result<String, GenerationError>> + Send + Unpin + 'a,
{
    let state = TurnState {
        history,
        user_message,
        chunks,
        reply: String::new(),
        failed: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        if state.failed {
            return None;
        }
        match state.chunks.next().await {
            Some(Ok(text)) => {
                state.reply.push_str(&text);
                Some((Ok(LLMStreamEvent::TextChunk(text)), state))
            }
            Some(Err(e)) => {
                state.failed = true;
                Some((Err(e), state))
            }
            None => {
                let reply = std::mem::take(&mut state.reply);
                match ChatCompletionRequestAssistantMessageArgs::default()
                    .content(reply)
                    .build()
                {
                    Ok(assistant) => {
                        state.history.push(state.user_message.clone());
                        state.history.push(assistant.into());
                    }
                    Err(e) => warn!(error = %e, "Could not record turn in chat history"),
                }
                None
            }
        }
    }))
}
