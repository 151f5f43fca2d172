//! Huddle CLI entry point.
//!
//! Binary name: `huddle`
//!
//! Parses CLI arguments, loads the provider configuration, then dispatches
//! to the command handler. The shared vector store is shut down before
//! exit so pending dual-write secondaries are drained.

mod cli;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;

use huddle_core::memory::registry;
use huddle_infra::config::load_provider_config;
use huddle_observe::tracing_setup::{TracingOptions, init_tracing_with, shutdown_tracing};
use huddle_types::config::ProviderConfig;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let tracing_options = TracingOptions {
        otel: cli.otel,
        ..TracingOptions::from_verbosity(cli.verbose, cli.quiet)
    };
    init_tracing_with(&tracing_options).map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    // Shell completions don't need configuration
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "huddle", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = load_provider_config(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if let Some(kind) = cli.provider {
        config.provider = kind;
        config.validate().context("Invalid configuration")?;
    }

    let result = run(cli.command, &config, cli.json).await;

    if let Some(provider) = registry::reset() {
        provider.shutdown().await;
    }
    shutdown_tracing();
    result
}

async fn run(command: Commands, config: &ProviderConfig, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Health => cli::store::health(config, json).await,
        Commands::Count => cli::store::count(config, json).await,
        Commands::EnsureCollection => cli::store::ensure_collection(config, json).await,
        Commands::Search(args) => cli::search::search(config, &args, json).await,
        Commands::Ingest(args) => cli::transcript::ingest(config, &args, json).await,
        Commands::DeleteMeeting { meeting_id, force } => {
            cli::transcript::delete_meeting(config, &meeting_id, force, json).await
        }
        Commands::Export { output, page_size } => cli::migrate::export(config, &output, page_size, json).await,
        Commands::Import { input, batch_size } => cli::migrate::import(config, &input, batch_size, json).await,
        Commands::Validate(args) => cli::migrate::validate(config, &args, json).await,
        Commands::Completions { .. } => Ok(()),
    }
}
