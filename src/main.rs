//! # docmill CLI
//!
//! The `docmill` binary is the primary interface for the ingestion
//! pipeline. It provides commands for database initialization, PDF
//! ingestion, document retrieval, chunk maintenance, and starting the HTTP
//! server.
//!
//! ## Usage
//!
//! ```bash
//! docmill --config ./config/docmill.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docmill init` | Create the SQLite database and run schema migrations |
//! | `docmill ingest <path>` | Ingest a PDF file, or every PDF under a directory |
//! | `docmill get <id>` | Retrieve a document record by UUID |
//! | `docmill reingest <id>` | Re-run the pipeline from a document's stored blob |
//! | `docmill rechunk <id>` | Re-chunk a parsed document under the current policy |
//! | `docmill stats` | Show document and chunk statistics |
//! | `docmill serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! docmill init --config ./config/docmill.toml
//!
//! # Ingest a single PDF
//! docmill ingest ./reports/q3.pdf --config ./config/docmill.toml
//!
//! # Ingest every PDF under a directory
//! docmill ingest ./reports --config ./config/docmill.toml
//!
//! # Inspect a document and its chunk layout
//! docmill get 6f1c89aa-03b0-4c30-9e0f-1f1d6f2f8f11 --config ./config/docmill.toml
//!
//! # Start the HTTP server
//! docmill serve --config ./config/docmill.toml
//! ```

mod blob;
mod blob_fs;
mod blob_s3;
#[allow(dead_code)]
mod chunk;
mod config;
mod db;
mod extract;
mod get;
mod ingest;
mod migrate;
#[allow(dead_code)]
mod models;
mod server;
mod stats;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line interface for the docmill ingestion pipeline.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "docmill",
    about = "A document ingestion and chunking pipeline for PDF files",
    version,
    long_about = "docmill ingests PDF documents, persists their raw bytes to a blob store \
    (local filesystem or S3-compatible object storage), extracts their text, splits it into \
    bounded overlapping chunks, and tracks every document's progress through the pipeline in \
    SQLite. Exposes both a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// All database, blob store, chunking, and server settings are read
    /// from this file.
    #[arg(long, global = true, default_value = "./config/docmill.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks). This command is idempotent; running it
    /// multiple times is safe.
    Init,

    /// Ingest a PDF file, or every PDF under a directory.
    ///
    /// Runs each file through the full pipeline: validation, blob
    /// storage, text extraction, chunking. Directories are walked
    /// recursively for `.pdf` files.
    Ingest {
        /// Path to a `.pdf` file or a directory containing them.
        path: PathBuf,
    },

    /// Retrieve a document record by its UUID.
    ///
    /// Prints the record's metadata and chunk layout.
    Get {
        /// Document UUID.
        id: String,

        /// Also print the extracted text.
        #[arg(long)]
        text: bool,
    },

    /// Re-run the pipeline for a document from its stored blob.
    ///
    /// Creates a fresh record over the retained bytes; the old record is
    /// left untouched (statuses never move backwards).
    Reingest {
        /// Document UUID.
        id: String,
    },

    /// Re-run chunking for a parsed document.
    ///
    /// Replaces the document's chunk set wholesale under the current
    /// chunking policy. Useful after changing `max_chars` or
    /// `overlap_chars`.
    Rechunk {
        /// Document UUID.
        id: String,
    },

    /// Show document and chunk statistics.
    ///
    /// Prints document counts by status and chunk totals. Useful for
    /// confirming that ingestion runs landed where they should.
    Stats,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// upload, retrieval, and health endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path } => {
            ingest::run_ingest(&cfg, &path).await?;
        }
        Commands::Get { id, text } => {
            get::run_get(&cfg, &id, text).await?;
        }
        Commands::Reingest { id } => {
            ingest::run_reingest(&cfg, &id).await?;
        }
        Commands::Rechunk { id } => {
            ingest::run_rechunk(&cfg, &id).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .with(tracing_subscriber::fmt::layer())
                .init();
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
