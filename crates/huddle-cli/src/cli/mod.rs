//! CLI command definitions for the `huddle` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod migrate;
pub mod search;
pub mod store;
pub mod transcript;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use huddle_types::config::ProviderKind;

/// Operate the Huddle meeting-transcript vector store.
#[derive(Parser)]
#[command(name = "huddle", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Reduce log verbosity to errors only (command output is unchanged).
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Configuration file (defaults to ~/.huddle/config.toml).
    #[arg(long, global = true, env = "HUDDLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the configured vector store backend.
    #[arg(long, global = true)]
    pub provider: Option<ProviderKind>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the configured vector store.
    Health,

    /// Show the number of stored vectors.
    Count,

    /// Semantic search over stored transcript chunks.
    Search(search::SearchArgs),

    /// Chunk, embed and store a transcript file.
    Ingest(transcript::IngestArgs),

    /// Delete every chunk of a meeting.
    #[command(name = "delete-meeting")]
    DeleteMeeting {
        /// Meeting id.
        meeting_id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Create the self-hosted collection if it does not exist.
    #[command(name = "ensure-collection")]
    EnsureCollection,

    /// Export every stored vector as JSONL.
    Export {
        /// Output file.
        #[arg(long, short)]
        output: PathBuf,

        /// Vectors fetched per page.
        #[arg(long, default_value = "500")]
        page_size: usize,
    },

    /// Import vectors from a JSONL export.
    Import {
        /// Input file.
        #[arg(long, short)]
        input: PathBuf,

        /// Vectors written per batch.
        #[arg(long, default_value = "100")]
        batch_size: usize,
    },

    /// Compare two backends after a migration.
    Validate(migrate::ValidateArgs),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
