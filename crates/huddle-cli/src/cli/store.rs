//! Store-level commands: health, count, ensure-collection.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use huddle_core::memory::migrate::count_vectors;
use huddle_infra::factory::{create_embedding_provider, get_memory_provider};
use huddle_infra::config::process_env;
use huddle_infra::vector::RuvectorProvider;
use huddle_types::config::{ProviderConfig, ProviderKind};

/// Probe the configured store; fails when it reports unhealthy.
pub async fn health(config: &ProviderConfig, json: bool) -> Result<()> {
    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let status = provider.health_check().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Provider").fg(Color::White),
            Cell::new("Healthy").fg(Color::White),
            Cell::new("Latency").fg(Color::White),
            Cell::new("Error").fg(Color::White),
        ]);
        table.add_row(vec![
            Cell::new(&status.provider).fg(Color::Cyan),
            if status.healthy {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::Red)
            },
            Cell::new(format!("{:.1} ms", status.latency_ms)),
            Cell::new(status.error.as_deref().unwrap_or("")).fg(Color::DarkGrey),
        ]);
        println!();
        println!("{table}");
        println!();
    }

    if !status.healthy {
        bail!("{} is unhealthy", status.provider);
    }
    Ok(())
}

/// Print the stored vector count, falling back to listing when the
/// backend has no count operation.
pub async fn count(config: &ProviderConfig, json: bool) -> Result<()> {
    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let count = count_vectors(&provider)
        .await
        .with_context(|| format!("Failed to count vectors in {}", provider.name()))?;

    if json {
        let result = serde_json::json!({
            "provider": provider.name(),
            "vector_count": count,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!("  {} holds {} vectors", style(provider.name()).cyan(), style(count).bold());
        println!();
    }
    Ok(())
}

/// Create the self-hosted collection sized for the configured embedder.
pub async fn ensure_collection(config: &ProviderConfig, json: bool) -> Result<()> {
    if config.provider != ProviderKind::Ruvector {
        bail!(
            "ensure-collection only applies to the ruvector provider (configured: {})",
            config.provider
        );
    }
    let embedder = create_embedding_provider(config, &process_env).context("Failed to create embedding provider")?;
    let dimensions = embedder.dimensions();
    let provider = RuvectorProvider::new(config, Arc::clone(&embedder)).context("Failed to create RuVector provider")?;
    let created = provider
        .ensure_collection()
        .await
        .with_context(|| format!("Failed to ensure collection '{}'", config.collection))?;

    if json {
        let result = serde_json::json!({
            "collection": config.collection,
            "dimensions": dimensions,
            "created": created,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if created {
        println!();
        println!(
            "  {} Created collection '{}' ({} dimensions)",
            style("ok").green(),
            style(&config.collection).cyan(),
            dimensions,
        );
        println!();
    } else {
        println!();
        println!(
            "  {} Collection '{}' already exists",
            style("i").blue().bold(),
            style(&config.collection).cyan(),
        );
        println!();
    }
    Ok(())
}
