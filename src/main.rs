mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quill::config::QuillConfig;

#[derive(Parser)]
#[command(name = "quill", version, about = "Semantic note storage and similarity search")]
struct Cli {
    /// Config file (defaults to ~/.quill/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection to operate on (defaults to storage.default_collection)
    #[arg(short, long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP JSON API
    Serve,
    /// Start the tool server (stdio transport)
    Mcp,
    /// Ingest a JSON array of {title, content} notes from a file
    Ingest {
        file: PathBuf,
        /// Split the file into batches of this many notes; each batch is atomic
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// List every note in the collection
    List,
    /// Search the collection by meaning
    Search {
        query: String,
        /// Number of results (defaults to retrieval.default_k)
        #[arg(short)]
        k: Option<usize>,
    },
    /// Delete notes by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show every collection with its note count and dimension
    Collections,
    /// Print the collection's notes as a JSON array to stdout
    Export,
    /// Check database health and index consistency
    Doctor {
        /// Rebuild any index that disagrees with its repository
        #[arg(long)]
        repair: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => QuillConfig::load_from(path)?,
        None => QuillConfig::load()?,
    };
    if let Some(collection) = cli.collection {
        config.storage.default_collection = collection;
    }

    // Log to stderr so stdout stays clean for JSON-RPC and CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => quill::server::serve_http(config).await?,
        Command::Mcp => quill::server::serve_stdio(config).await?,
        Command::Ingest { file, chunk_size } => {
            cli::ingest::ingest(&config, &file, chunk_size).await?
        }
        Command::List => cli::list::list(&config).await?,
        Command::Search { query, k } => cli::search::search(&config, &query, k).await?,
        Command::Delete { ids } => cli::delete::delete(&config, ids).await?,
        Command::Collections => cli::collections::collections(&config).await?,
        Command::Export => cli::export::export(&config).await?,
        Command::Doctor { repair } => cli::doctor::doctor(&config, repair)?,
    }

    Ok(())
}
