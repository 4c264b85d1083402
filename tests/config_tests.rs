//! Integration tests for the TOML configuration layer
//!
//! These tests verify that a configuration file drives the whole stack:
//! - The shipped docqa.toml loads and validates
//! - Pipelines built from config ingest and answer end to end

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::mocks::{HashEmbedder, RecordingLLM};
use docqa::utils::toml_config::{ConfigError, IndexProviderKind};
use docqa::{build_ingestion_pipeline, DocqaConfig, RagService};
use tempfile::TempDir;

#[test]
fn test_shipped_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("docqa.toml");
    let config = DocqaConfig::load(&path).unwrap();
    let defaults = DocqaConfig::default();

    assert_eq!(config.chunking.max_tokens, defaults.chunking.max_tokens);
    assert_eq!(config.index.collection, defaults.index.collection);
    assert_eq!(config.index.batch_size, defaults.index.batch_size);
    assert_eq!(config.embedding.dimensions, defaults.embedding.dimensions);
    assert_eq!(config.retrieval.top_k, defaults.retrieval.top_k);
    assert_eq!(config.completion.ollama_url, defaults.completion.ollama_url);
}

#[test]
fn test_partial_config_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docqa.toml");
    fs::write(
        &path,
        r#"
[index]
provider = "memory"
collection = "handbook"

[retrieval]
top_k = 5
"#,
    )
    .unwrap();

    let config = DocqaConfig::load(&path).unwrap();

    assert_eq!(config.index.provider, IndexProviderKind::Memory);
    assert_eq!(config.index.collection, "handbook");
    assert_eq!(config.retrieval.top_k, 5);
    assert_eq!(config.chunking.max_tokens, 400);
    assert_eq!(config.docs.source, "book");
}

#[test]
fn test_invalid_values_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("docqa.toml");
    fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();

    let err = DocqaConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[tokio::test]
async fn test_pipelines_built_from_config() {
    let docs = TempDir::new().unwrap();
    fs::write(
        docs.path().join("start.md"),
        "## Quickstart\nInstall the CLI and run docqa ingest.\n",
    )
    .unwrap();

    let mut config = DocqaConfig::default();
    config.index.provider = IndexProviderKind::Memory;
    config.index.collection = "handbook".to_string();
    config.docs.root = docs.path().to_path_buf();

    let embedder = Arc::new(HashEmbedder::new(32));
    let index = docqa::db::create_index(&config.index).unwrap();

    let pipeline = build_ingestion_pipeline(&config, embedder.clone(), index.clone()).unwrap();
    assert_eq!(pipeline.collection(), "handbook");

    let report = pipeline.run(&config.docs.root).await.unwrap();
    assert_eq!(report.records_written, 1);

    let llm = RecordingLLM::new("Run docqa ingest.");
    let rag = RagService::new(embedder, index, Arc::new(llm.clone()), config.index.collection.clone())
        .with_top_k(config.retrieval.top_k);

    let answer = rag.answer("How do I start?", None).await;
    assert_eq!(answer, "Run docqa ingest.");
    assert!(llm
        .last_prompt()
        .unwrap()
        .contains("Install the CLI and run docqa ingest."));
}

#[cfg(feature = "ollama")]
#[test]
fn test_build_rag_service_with_ollama() {
    use docqa::utils::toml_config::CompletionProviderKind;

    let mut config = DocqaConfig::default();
    config.index.provider = IndexProviderKind::Memory;
    config.completion.provider = CompletionProviderKind::Ollama;
    config.completion.model = "llama3.2".to_string();

    let index = docqa::db::create_index(&config.index).unwrap();
    let rag = docqa::build_rag_service(&config, Arc::new(HashEmbedder::new(8)), index).unwrap();

    assert_eq!(rag.model_name(), "llama3.2");
    assert_eq!(rag.collection(), "book_docs");
}
