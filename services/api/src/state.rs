//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the resources every
//! connection shares: the configuration and the generation client.

use crate::config::{Config, ConfigError};
use async_openai::config::OpenAIConfig;
use relay_core::llm_client::{LLMClient, OpenAICompatibleClient};
use std::sync::Arc;
use tracing::{error, info};

/// Why the generation client could not be built at startup.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("no API key configured for {provider}: {source}")]
    MissingApiKey {
        provider: crate::config::Provider,
        source: ConfigError,
    },
}

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when the client failed to initialize; connections then report
    /// the model as unavailable instead of generating.
    pub llm_client: Option<Arc<dyn LLMClient>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the state, initializing the generation client from `config`.
    ///
    /// Initialization failures are logged and recorded as an unavailable
    /// model. They never stop the server from starting.
    pub fn new(config: Config) -> Self {
        let llm_client = match init_llm_client(&config) {
            Ok(client) => {
                info!(
                    provider = %config.provider,
                    model = %config.chat_model,
                    "Generation client initialized successfully."
                );
                Some(client)
            }
            Err(e) => {
                error!(error = %e, "Error initializing generation client");
                None
            }
        };

        Self {
            llm_client,
            config: Arc::new(config),
        }
    }

    pub fn model_ready(&self) -> bool {
        self.llm_client.is_some()
    }
}

/// Constructs the OpenAI-compatible client for the configured provider.
pub fn init_llm_client(config: &Config) -> Result<Arc<dyn LLMClient>, InitError> {
    let api_key = config.api_key().map_err(|source| InitError::MissingApiKey {
        provider: config.provider.clone(),
        source,
    })?;
    let openai_config = OpenAIConfig::new()
        .with_api_key(api_key)
        .with_api_base(config.api_base());

    Ok(Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use tracing::Level;

    fn config_with_key(key: Option<&str>) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            provider: Provider::Gemini,
            openai_api_key: None,
            gemini_api_key: key.map(str::to_string),
            chat_model: "gemini-2.0-flash-001".to_string(),
            api_base: None,
            log_level: Level::INFO,
        }
    }

    #[test]
    fn test_missing_key_leaves_model_unavailable() {
        let state = AppState::new(config_with_key(None));
        assert!(!state.model_ready());
        assert!(state.llm_client.is_none());
    }

    #[test]
    fn test_key_present_builds_client() {
        let state = AppState::new(config_with_key(Some("test-key")));
        assert!(state.model_ready());
    }

    #[test]
    fn test_init_error_names_provider() {
        let err = init_llm_client(&config_with_key(None))
            .err()
            .expect("client must not build without a key");
        let message = err.to_string();
        assert!(message.contains("Gemini"));
        assert!(message.contains("GEMINI_API"));
    }
}
