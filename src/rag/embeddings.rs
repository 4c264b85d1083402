//! Dense text embeddings.
//!
//! The embedder is constructed once by the binary and shared through
//! `Arc<dyn Embedder>`; pipelines never load a model themselves, so tests can
//! substitute any implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{preview, AppError, EmbeddingError, Result};
use crate::utils::toml_config::{ConfigError, EmbeddingConfig, EmbeddingProviderKind};

/// Maps a text to a fixed-length vector.
///
/// Implementations must be deterministic for a given model version and must
/// return exactly [`dimensions`](Embedder::dimensions) values for every input.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError>;
}

/// Reject vectors whose length differs from the configured dimensionality.
pub fn check_dimensions(
    text: &str,
    vector: Vec<f32>,
    expected: usize,
) -> std::result::Result<Vec<f32>, EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::Dimensions {
            input: preview(text),
            expected,
            actual: vector.len(),
        });
    }
    Ok(vector)
}

/// Build the embedder selected in the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider {
        #[cfg(feature = "local-embeddings")]
        EmbeddingProviderKind::Fastembed => {
            Ok(Arc::new(FastEmbedder::new(&config.model)?) as Arc<dyn Embedder>)
        }

        #[cfg(feature = "openai")]
        EmbeddingProviderKind::OpenAI => {
            let api_key = crate::utils::toml_config::DocqaConfig::require_env(&config.api_key_env)?;
            Ok(Arc::new(OpenAIEmbedder::new(
                api_key,
                config.api_base.clone(),
                config.model.clone(),
                config.dimensions,
            )) as Arc<dyn Embedder>)
        }

        #[allow(unreachable_patterns)]
        other => {
            let feature = match other {
                EmbeddingProviderKind::Fastembed => "local-embeddings",
                EmbeddingProviderKind::OpenAI => "openai",
            };
            Err(AppError::Configuration(ConfigError::FeatureDisabled(
                format!("{:?}", other).to_lowercase(),
                feature.to_string(),
            )))
        }
    }
}

// ============================================================================
// fastembed (local ONNX)
// ============================================================================

#[cfg(feature = "local-embeddings")]
pub use local::FastEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use super::*;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// Resolve a configured model name to a fastembed model and its dimensionality.
    pub(super) fn resolve_model(name: &str) -> Option<(EmbeddingModel, usize)> {
        let short = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        match short.as_str() {
            "all-minilm-l6-v2" => Some((EmbeddingModel::AllMiniLML6V2, 384)),
            "all-minilm-l12-v2" => Some((EmbeddingModel::AllMiniLML12V2, 384)),
            "bge-small-en-v1.5" => Some((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Some((EmbeddingModel::BGEBaseENV15, 768)),
            "bge-large-en-v1.5" => Some((EmbeddingModel::BGELargeENV15, 1024)),
            _ => None,
        }
    }

    /// Local embedding model loaded once at startup.
    ///
    /// fastembed needs exclusive access while running inference, so calls are
    /// serialized behind a mutex and executed on the blocking pool.
    pub struct FastEmbedder {
        model: Arc<Mutex<TextEmbedding>>,
        name: String,
        dimensions: usize,
    }

    impl FastEmbedder {
        pub fn new(model_name: &str) -> Result<Self> {
            let (model, dimensions) = resolve_model(model_name).ok_or_else(|| {
                AppError::Configuration(ConfigError::ValidationError(format!(
                    "unsupported fastembed model '{}'",
                    model_name
                )))
            })?;

            let model = TextEmbedding::try_new(
                InitOptions::new(model).with_show_download_progress(true),
            )
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

            tracing::info!(model = model_name, dimensions, "Loaded embedding model");

            Ok(Self {
                model: Arc::new(Mutex::new(model)),
                name: model_name.to_string(),
                dimensions,
            })
        }
    }

    #[async_trait]
    impl Embedder for FastEmbedder {
        fn model_name(&self) -> &str {
            &self.name
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            if text.trim().is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }

            let model = Arc::clone(&self.model);
            let owned = text.to_string();
            let mut vectors = tokio::task::spawn_blocking(move || {
                model.lock().embed(vec![owned], None)
            })
            .await
            .map_err(|e| EmbeddingError::model(text, e))?
            .map_err(|e| EmbeddingError::model(text, e))?;

            let vector = vectors
                .pop()
                .ok_or_else(|| EmbeddingError::model(text, "model returned no vector"))?;
            check_dimensions(text, vector, self.dimensions)
        }
    }

}

// ============================================================================
// OpenAI-compatible embeddings endpoint
// ============================================================================

#[cfg(feature = "openai")]
pub use remote::OpenAIEmbedder;

#[cfg(feature = "openai")]
mod remote {
    use super::*;
    use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};

    pub struct OpenAIEmbedder {
        client: Client<OpenAIConfig>,
        model: String,
        dimensions: usize,
    }

    impl OpenAIEmbedder {
        pub fn new(api_key: String, api_base: String, model: String, dimensions: usize) -> Self {
            let config = OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base);

            Self {
                client: Client::with_config(config),
                model,
                dimensions,
            }
        }
    }

    #[async_trait]
    impl Embedder for OpenAIEmbedder {
        fn model_name(&self) -> &str {
            &self.model
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }

        async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
            if text.trim().is_empty() {
                return Err(EmbeddingError::EmptyInput);
            }

            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(text.to_string())
                .build()
                .map_err(|e| EmbeddingError::model(text, e))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| EmbeddingError::model(text, e))?;

            let vector = response
                .data
                .into_iter()
                .next()
                .map(|e| e.embedding)
                .ok_or_else(|| EmbeddingError::model(text, "response contained no embedding"))?;
            check_dimensions(text, vector, self.dimensions)
        }
    }
}
