//! TOML-based configuration for docqa
//!
//! All settings live in a single `docqa.toml`. Every field has a default, so a
//! missing file or a partial file is valid. Secrets are never stored in the
//! file: provider sections name the environment variable that holds them and
//! the value is resolved when the provider is constructed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::Distance;

/// Root configuration structure loaded from docqa.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocqaConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub docs: DocsConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit newline-delimited JSON instead of human-readable lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ============= Document Source Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Root of the documentation tree
    #[serde(default = "default_docs_root")]
    pub root: PathBuf,

    /// File extensions (without dot) considered documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Value of the `source` payload field for every record
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_docs_root() -> PathBuf {
    PathBuf::from("./docs")
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "mdx".to_string()]
}

fn default_source() -> String {
    "book".to_string()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            root: default_docs_root(),
            extensions: default_extensions(),
            source: default_source(),
        }
    }
}

// ============= Chunking Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// BPE encoding name
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
}

fn default_max_tokens() -> usize {
    400
}

fn default_tokenizer() -> String {
    "cl100k_base".to_string()
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            tokenizer: default_tokenizer(),
        }
    }
}

// ============= Embedding Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local ONNX model (requires the `local-embeddings` feature)
    #[default]
    Fastembed,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector dimensionality produced by `model`
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Environment variable containing the API key (openai provider)
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base")]
    pub api_base: String,
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_dimensions() -> usize {
    384
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
        }
    }
}

// ============= Vector Index Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexProviderKind {
    #[default]
    Qdrant,
    /// Process-local index; contents are lost on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub provider: IndexProviderKind,

    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Environment variable for the Qdrant API key; unset means no auth
    #[serde(default = "default_qdrant_key_env")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default)]
    pub distance: Distance,

    /// Records per upsert request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_qdrant_url() -> String {
    "http://localhost:6334".to_string()
}

fn default_qdrant_key_env() -> Option<String> {
    Some("QDRANT_API_KEY".to_string())
}

fn default_collection() -> String {
    "book_docs".to_string()
}

fn default_batch_size() -> usize {
    100
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            provider: IndexProviderKind::default(),
            url: default_qdrant_url(),
            api_key_env: default_qdrant_key_env(),
            collection: default_collection(),
            distance: Distance::default(),
            batch_size: default_batch_size(),
        }
    }
}

// ============= Completion Configuration =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProviderKind {
    /// OpenAI API and compatible endpoints (Groq, OpenRouter, ...)
    #[default]
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub provider: CompletionProviderKind,

    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Environment variable containing the API key (openai provider)
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_base")]
    pub api_base: String,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
}

fn default_completion_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProviderKind::default(),
            model: default_completion_model(),
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
            ollama_url: default_ollama_url(),
        }
    }
}

// ============= Retrieval Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of chunks placed in the prompt
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Name of the documented project, used in the prompt
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Timeout applied to each embedding, search and completion call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_top_k() -> usize {
    3
}

fn default_subject() -> String {
    "SpecKit Plus".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            subject: default_subject(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Provider '{0}' is not compiled in (enable the '{1}' feature)")]
    FeatureDisabled(String, String),
}

impl DocqaConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: DocqaConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration if the file exists; `Ok(None)` when it is absent
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::FileNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::load_optional(path)?.unwrap_or_default())
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunking.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.max_tokens must be greater than 0".into(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be greater than 0".into(),
            ));
        }
        if self.index.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "index.batch_size must be greater than 0".into(),
            ));
        }
        if self.index.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "index.collection must not be empty".into(),
            ));
        }
        if self.retrieval.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be greater than 0".into(),
            ));
        }
        if self.docs.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "docs.extensions must list at least one extension".into(),
            ));
        }
        Ok(())
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Resolve a required secret from the environment
    pub fn require_env(env_name: &str) -> Result<String, ConfigError> {
        Self::resolve_env(env_name).ok_or_else(|| ConfigError::MissingEnvVar(env_name.to_string()))
    }
}
