use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use docqa::cli::output::Output;
use docqa::cli::{Cli, Commands};
use docqa::utils::telemetry;
use docqa::utils::toml_config::{CompletionProviderKind, EmbeddingProviderKind, IndexProviderKind};
use docqa::{build_ingestion_pipeline, build_rag_service, AppState, DocqaConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let loaded = match DocqaConfig::load_optional(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            output.error(&format!("Failed to load {}: {}", cli.config.display(), e));
            return Err(e).context("invalid configuration");
        }
    };
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    telemetry::init(&config.logging, cli.verbose);
    if !found {
        tracing::info!(path = %cli.config.display(), "No configuration file, using defaults");
    }

    match cli.command {
        Commands::Ingest { docs, collection } => ingest(config, docs, collection, &output).await,
        Commands::Ask { question, context } => ask(config, question, context, &output).await,
        Commands::Serve { host, port } => serve(config, host, port, &output).await,
        Commands::Config { validate } => show_config(&config, &cli.config, validate, &output),
    }
}

async fn ingest(
    mut config: DocqaConfig,
    docs: Option<PathBuf>,
    collection: Option<String>,
    output: &Output,
) -> anyhow::Result<()> {
    if let Some(docs) = docs {
        config.docs.root = docs;
    }
    if let Some(collection) = collection {
        config.index.collection = collection;
    }

    output.banner();
    output.step(1, 3, &format!("Loading embedding model {}", config.embedding.model));
    let embedder = docqa::rag::embeddings::create_embedder(&config.embedding)?;

    output.step(2, 3, &format!("Connecting to {:?} index", config.index.provider));
    let index = docqa::db::create_index(&config.index)?;

    output.step(
        3,
        3,
        &format!(
            "Ingesting {} into '{}'",
            config.docs.root.display(),
            config.index.collection
        ),
    );
    let pipeline = build_ingestion_pipeline(&config, embedder, index)?;
    let report = pipeline
        .run(&config.docs.root)
        .await
        .context("ingestion aborted")?;

    output.header("Ingestion report");
    output.kv("documents", &report.documents_read.to_string());
    output.kv("sections", &report.sections.to_string());
    output.kv("chunks", &report.chunks.to_string());
    output.kv("records written", &report.records_written.to_string());

    if report.is_clean() {
        output.success("All chunks indexed");
    } else {
        output.warning(&format!(
            "{} unreadable files, {} untokenizable sections, {} embedding failures, {} failed batches",
            report.documents_skipped,
            report.chunking_failures,
            report.embedding_failures,
            report.failed_batches
        ));
        output.hint("Re-run with --verbose to see each skipped item");
    }

    Ok(())
}

async fn ask(
    config: DocqaConfig,
    question: String,
    context: Option<String>,
    output: &Output,
) -> anyhow::Result<()> {
    let embedder = docqa::rag::embeddings::create_embedder(&config.embedding)?;
    let index = docqa::db::create_index(&config.index)?;
    let rag = build_rag_service(&config, embedder, index)?;

    let answer = rag.answer_with_sources(&question, context.as_deref()).await;

    output.answer(&answer.text);
    if !answer.sources.is_empty() {
        output.header("Sources");
        for source in &answer.sources {
            output.source(&source.chapter, &source.section, source.relevance_score);
        }
    }

    Ok(())
}

async fn serve(
    config: DocqaConfig,
    host: Option<String>,
    port: Option<u16>,
    output: &Output,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let embedder = docqa::rag::embeddings::create_embedder(&config.embedding)?;
    let index = docqa::db::create_index(&config.index)?;
    let rag = build_rag_service(&config, embedder, index)?;

    let state = AppState {
        config: Arc::new(config),
        rag: Arc::new(rag),
    };
    let app = docqa::api::create_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    output.banner();
    output.success(&format!("Listening on http://{}", addr));
    output.command(&format!(
        "curl -X POST http://{}/chat -H 'Content-Type: application/json' -d '{{\"question\":\"...\"}}'",
        addr
    ));
    tracing::info!(%addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

fn show_config(
    config: &DocqaConfig,
    path: &std::path::Path,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    output.header("Configuration");
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    output.kv("file", &source);
    output.kv("docs", &config.docs.root.display().to_string());
    output.kv("chunk size", &format!("{} tokens", config.chunking.max_tokens));
    output.kv(
        "embedding",
        &format!(
            "{:?} {} ({} dims)",
            config.embedding.provider, config.embedding.model, config.embedding.dimensions
        ),
    );
    output.kv(
        "index",
        &format!(
            "{:?} {} / {}",
            config.index.provider, config.index.url, config.index.collection
        ),
    );
    output.kv(
        "completion",
        &format!("{:?} {}", config.completion.provider, config.completion.model),
    );
    output.kv(
        "server",
        &format!("{}:{}", config.server.host, config.server.port),
    );

    if !validate {
        return Ok(());
    }

    config.validate()?;

    let mut missing = Vec::new();
    if config.embedding.provider == EmbeddingProviderKind::OpenAI
        && DocqaConfig::resolve_env(&config.embedding.api_key_env).is_none()
    {
        missing.push(config.embedding.api_key_env.clone());
    }
    if config.completion.provider == CompletionProviderKind::OpenAI
        && DocqaConfig::resolve_env(&config.completion.api_key_env).is_none()
    {
        missing.push(config.completion.api_key_env.clone());
    }
    if config.index.provider == IndexProviderKind::Qdrant {
        if let Some(env) = &config.index.api_key_env {
            if DocqaConfig::resolve_env(env).is_none() {
                output.info(&format!("{} not set, connecting to Qdrant without a key", env));
            }
        }
    }

    missing.dedup();
    if missing.is_empty() {
        output.success("Configuration is valid");
        Ok(())
    } else {
        for name in &missing {
            output.error(&format!("Environment variable {} is not set", name));
        }
        anyhow::bail!("{} required secret(s) missing", missing.len())
    }
}
