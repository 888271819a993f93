//! Generation backends for the chat relay.
//!
//! The relay only needs one capability from a model: open a conversation and
//! stream the reply to each prompt. [`llm_client::LLMClient`] and
//! [`llm_client::ChatSession`] describe that capability, and
//! [`llm_client::OpenAICompatibleClient`] provides it for any
//! OpenAI-compatible endpoint (including Gemini's).

pub mod llm_client;
