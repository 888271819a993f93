//! A scripted generation backend for exercising the relay without a network.

use async_trait::async_trait;
use futures_util::stream;
use relay_core::llm_client::{
    ChatSession, GenerationError, LLMClient, LLMStream, LLMStreamEvent,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One item the scripted model produces.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    Chunk(&'static str),
    Fail(&'static str),
}

/// A turn's script. `Err` makes the call fail before any stream is opened.
pub(crate) type Script = Result<Vec<Step>, &'static str>;

/// Hands out scripted turns in order, across every session it creates.
#[derive(Clone, Default)]
pub(crate) struct ScriptedClient {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    calls: Arc<Mutex<Vec<(usize, usize, String)>>>,
    sessions: Arc<Mutex<usize>>,
}

impl ScriptedClient {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Default::default()
        }
    }

    /// Every prompt received as `(session index, history length, prompt)`.
    pub(crate) fn calls(&self) -> Vec<(usize, usize, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn sessions_opened(&self) -> usize {
        *self.sessions.lock().unwrap()
    }
}

impl LLMClient for ScriptedClient {
    fn create_session(&self) -> Box<dyn ChatSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let index = *sessions;
        *sessions += 1;
        Box::new(ScriptedChat {
            index,
            client: self.clone(),
            history: Vec::new(),
        })
    }
}

struct ScriptedChat {
    index: usize,
    client: ScriptedClient,
    history: Vec<String>,
}

#[async_trait]
impl ChatSession for ScriptedChat {
    async fn send_message_stream<'a>(
        &'a mut self,
        prompt: &str,
    ) -> Result<LLMStream<'a>, GenerationError> {
        self.client
            .calls
            .lock()
            .unwrap()
            .push((self.index, self.history.len(), prompt.to_string()));
        self.history.push(prompt.to_string());

        let script = self
            .client
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()));
        let steps = script.map_err(|reason| GenerationError::Blocked(reason.to_string()))?;

        Ok(Box::pin(stream::iter(steps.into_iter().map(|step| match step {
            Step::Chunk(text) => Ok(LLMStreamEvent::TextChunk(text.to_string())),
            Step::Fail(reason) => Err(GenerationError::Blocked(reason.to_string())),
        }))))
    }
}
