//! Defines the plain-text frame protocol between the client and the relay.
//!
//! Clients send one raw prompt per text frame. The server answers with zero or
//! more raw text fragments and always closes the turn with [`END_SENTINEL`].

use crate::config::Provider;
use std::fmt;

/// Marks the end of every turn, including failed ones.
pub const END_SENTINEL: &str = "[END]";

/// Sent once on connect when the generation client failed to initialize.
pub const MODEL_UNAVAILABLE: &str = "Error: AI model not ready to generate content.";

/// Prefix of the frame reporting a failed turn.
pub const GENERATION_ERROR_PREFIX: &str = "Error from AI: ";

/// Frames sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// A fragment of the model's reply, forwarded as produced.
    Chunk(String),
    /// The generation client is not available for this process.
    ModelUnavailable,
    /// Generation failed for the current turn.
    GenerationFailed { provider: Provider, error: String },
    /// End of the current turn.
    End,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Chunk(text) => f.write_str(text),
            ServerMessage::ModelUnavailable => f.write_str(MODEL_UNAVAILABLE),
            ServerMessage::GenerationFailed { provider, error } => write!(
                f,
                "{GENERATION_ERROR_PREFIX}Error generating content from {provider}: {error}"
            ),
            ServerMessage::End => f.write_str(END_SENTINEL),
        }
    }
}

impl ServerMessage {
    pub fn into_text(self) -> String {
        match self {
            ServerMessage::Chunk(text) => text,
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_frames() {
        assert_eq!(ServerMessage::End.into_text(), "[END]");
        assert!(ServerMessage::ModelUnavailable.into_text().starts_with("Error: "));
    }

    #[test]
    fn test_chunk_is_forwarded_verbatim() {
        let chunk = ServerMessage::Chunk("  Hi [END] there\n".to_string());
        assert_eq!(chunk.into_text(), "  Hi [END] there\n");
    }

    #[test]
    fn test_generation_failure_text() {
        let msg = ServerMessage::GenerationFailed {
            provider: Provider::Gemini,
            error: "quota exceeded".to_string(),
        };
        assert_eq!(
            msg.into_text(),
            "Error from AI: Error generating content from Gemini: quota exceeded"
        );
    }
}
