use std::fmt;
use std::net::{IpAddr, SocketAddr};
use tracing::Level;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8090;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported generation backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// The OpenAI-compatible endpoint used when `API_BASE_URL` is not set.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1",
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAI => "gpt-4o",
            Provider::Gemini => "gemini-2.0-flash-001",
        }
    }

    /// Lowercase identifier, as accepted in `LLM_PROVIDER`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "OpenAI"),
            Provider::Gemini => write!(f, "Gemini"),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub api_base: Option<String>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// A missing API key is not an error here: the relay still starts and
    /// reports the model as unavailable to every client.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let host_str = std::env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let host = host_str
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidValue("HOST".to_string(), e.to_string()))?;

        let port = match std::env::var("PORT") {
            Ok(port_str) => port_str
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            Err(_) => DEFAULT_PORT,
        };
        let bind_address = SocketAddr::new(host, port);

        let provider_str = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "gemini".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "openai" => Provider::OpenAI,
            _ => Provider::Gemini,
        };

        let openai_api_key = non_empty_var("OPENAI_API_KEY");
        let gemini_api_key = non_empty_var("GEMINI_API").or_else(|| non_empty_var("GEMINI_API_KEY"));

        let chat_model =
            non_empty_var("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let api_base = non_empty_var("API_BASE_URL");

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            api_base,
            log_level,
        })
    }

    /// The API key for the configured provider, if one was supplied.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        let (key, var) = match self.provider {
            Provider::OpenAI => (&self.openai_api_key, "OPENAI_API_KEY"),
            Provider::Gemini => (&self.gemini_api_key, "GEMINI_API"),
        };
        key.as_deref()
            .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
    }

    pub fn api_base(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.provider.default_api_base())
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
