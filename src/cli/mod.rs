//! CLI module for docqa
//!
//! Provides command-line interface parsing for the docqa binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docqa - question answering over a documentation tree
///
/// Ingests Markdown/MDX documentation into a vector index and answers
/// questions about it with a language model.
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "docqa - Documentation Q&A with retrieval-augmented generation",
    after_help = "EXAMPLES:\n    \
                  docqa ingest --docs ./docs          # Index the documentation tree\n    \
                  docqa ask \"How do I install it?\"    # Answer one question\n    \
                  docqa serve --port 8000             # Start the HTTP API\n    \
                  docqa config --validate             # Check docqa.toml and secrets"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "docqa.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed and index every document under the docs root
    Ingest {
        /// Documentation root (overrides docs.root)
        #[arg(short, long)]
        docs: Option<PathBuf>,

        /// Target collection (overrides index.collection)
        #[arg(long)]
        collection: Option<String>,
    },

    /// Answer a single question and print the reply
    Ask {
        /// The question to answer
        question: String,

        /// Answer from this passage instead of searching the index
        #[arg(long)]
        context: Option<String>,
    },

    /// Start the HTTP API
    Serve {
        /// Host address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show configuration information
    Config {
        /// Also check that referenced secrets are present
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
