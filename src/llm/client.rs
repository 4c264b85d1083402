//! Completion client abstraction and provider selection
//!
//! - **OpenAI**: chat completions API and compatible endpoints (Groq, OpenRouter, vLLM)
//! - **Ollama**: local models served by an Ollama daemon

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{GenerationError, Result};
use crate::utils::toml_config::{CompletionConfig, CompletionProviderKind, ConfigError, DocqaConfig};

/// Stateless text completion: one system instruction, one user prompt, one reply.
///
/// All providers implement this trait, so the query pipeline never depends on
/// a concrete backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the model's reply text.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "sk-...".to_string(),
    ///     api_base: "https://api.openai.com/v1".to_string(),
    ///     model: "gpt-3.5-turbo".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Resolve the configured provider, reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when the OpenAI key variable is unset.
    pub fn from_config(config: &CompletionConfig) -> std::result::Result<Self, ConfigError> {
        match config.provider {
            CompletionProviderKind::OpenAI => Ok(Provider::OpenAI {
                api_key: DocqaConfig::require_env(&config.api_key_env)?,
                api_base: config.api_base.clone(),
                model: config.model.clone(),
            }),
            CompletionProviderKind::Ollama => Ok(Provider::Ollama {
                base_url: config.ollama_url.clone(),
                model: config.model.clone(),
            }),
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's Cargo feature is disabled.
    pub fn create_client(&self) -> Result<Arc<dyn CompletionClient>> {
        match self {
            #[cfg(feature = "openai")]
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Arc::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Arc::new(
                super::ollama::OllamaClient::new(base_url, model.clone()),
            )),

            #[allow(unreachable_patterns)]
            other => Err(ConfigError::FeatureDisabled(
                other.name().to_string(),
                other.name().to_lowercase(),
            )
            .into()),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}
