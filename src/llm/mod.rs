//! Completion Provider Clients
//!
//! The query pipeline hands a system instruction and a prompt to a
//! [`CompletionClient`] and returns its reply. Concrete clients are selected at
//! startup through [`Provider`].
//!
//! # Supported Providers
//!
//! Enable providers via Cargo features:
//! - `openai` - OpenAI API and compatible endpoints
//! - `ollama` - Local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use docqa::llm::Provider;
//!
//! let client = Provider::from_config(&config.completion)?.create_client()?;
//! let reply = client.complete("You are a helpful assistant.", "What is 2+2?").await?;
//! ```

/// Core completion client trait and provider selection.
pub mod client;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

pub use client::{CompletionClient, Provider};
