//! Backend migration commands: export, import and validate.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{BufReader, BufWriter};

use huddle_core::memory::migrate::{
    DEFAULT_VALIDATION_QUERIES, MIN_AVG_CORRELATION, MIN_AVG_RECALL, ValidationReport, export_jsonl,
    import_jsonl, validate_migration,
};
use huddle_infra::factory::{create_memory_provider, get_memory_provider};
use huddle_types::config::{ProviderConfig, ProviderKind};

#[derive(Args)]
pub struct ValidateArgs {
    /// Backend the data was migrated from.
    #[arg(long, default_value = "s3-vectors")]
    pub source: ProviderKind,

    /// Backend the data was migrated to.
    #[arg(long, default_value = "ruvector")]
    pub target: ProviderKind,

    /// Number of source documents whose metadata is checked on the target.
    #[arg(long, default_value = "10")]
    pub sample_size: usize,

    /// Comma-separated search queries compared between the backends.
    #[arg(long, value_delimiter = ',')]
    pub queries: Vec<String>,

    /// Results compared per query.
    #[arg(long, short = 'k', default_value = "10")]
    pub top_k: usize,

    /// Skip the search quality comparison.
    #[arg(long)]
    pub skip_search: bool,
}

impl ValidateArgs {
    fn queries(&self) -> Vec<String> {
        if self.skip_search {
            Vec::new()
        } else if self.queries.is_empty() {
            DEFAULT_VALIDATION_QUERIES.iter().map(|q| q.to_string()).collect()
        } else {
            self.queries.clone()
        }
    }
}

/// `config` with its backend switched to `kind`.
fn config_for(config: &ProviderConfig, kind: ProviderKind) -> ProviderConfig {
    ProviderConfig {
        provider: kind,
        primary: None,
        secondary: None,
        ..config.clone()
    }
}

fn spinner(message: String) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(spinner)
}

pub async fn export(config: &ProviderConfig, output: &Path, page_size: usize, json: bool) -> Result<()> {
    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let file = tokio::fs::File::create(output)
        .await
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let progress = (!json)
        .then(|| spinner(format!("Exporting from {}...", provider.name())))
        .transpose()?;
    let exported = export_jsonl(&provider, &mut writer, page_size).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let exported = exported.with_context(|| format!("Export from {} failed", provider.name()))?;

    if json {
        let result = serde_json::json!({
            "provider": provider.name(),
            "output": output.display().to_string(),
            "exported": exported,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Exported {} vectors from {} -> {}",
            style("ok").green(),
            exported,
            style(provider.name()).cyan(),
            style(output.display()).dim(),
        );
        println!();
    }
    Ok(())
}

pub async fn import(config: &ProviderConfig, input: &Path, batch_size: usize, json: bool) -> Result<()> {
    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;

    let progress = (!json)
        .then(|| spinner(format!("Importing into {}...", provider.name())))
        .transpose()?;
    let result = import_jsonl(&provider, BufReader::new(file), batch_size).await;
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let result = result.with_context(|| format!("Import into {} failed", provider.name()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Imported {} vectors into {} ({} failed)",
            if result.failed == 0 { style("ok").green() } else { style("!!").yellow() },
            result.successful,
            style(provider.name()).cyan(),
            result.failed,
        );
        for error in result.errors.iter().take(5) {
            println!("     {} {}: {}", style(">>").dim(), error.id, error.error);
        }
        println!();
    }

    if result.failed > 0 {
        bail!("{} vectors failed to import", result.failed);
    }
    Ok(())
}

pub async fn validate(config: &ProviderConfig, args: &ValidateArgs, json: bool) -> Result<()> {
    if args.source == args.target {
        bail!("source and target must be different backends");
    }
    let source = create_memory_provider(&config_for(config, args.source))
        .with_context(|| format!("Failed to create source provider {}", args.source))?;
    let target = create_memory_provider(&config_for(config, args.target))
        .with_context(|| format!("Failed to create target provider {}", args.target))?;

    let queries = args.queries();
    let report = validate_migration(&source, &target, args.sample_size, &queries, args.top_k)
        .await
        .context("Validation failed to run")?;

    if json {
        let output = serde_json::json!({
            "source": source.name(),
            "target": target.name(),
            "passed": report.passed(),
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(source.name(), target.name(), &report);
    }

    source.shutdown().await;
    target.shutdown().await;

    if !report.passed() {
        bail!("migration validation failed");
    }
    Ok(())
}

fn pass_cell(ok: bool) -> Cell {
    if ok {
        Cell::new("pass").fg(Color::Green)
    } else {
        Cell::new("FAIL").fg(Color::Red)
    }
}

fn print_report(source: &str, target: &str, report: &ValidationReport) {
    let count = |c: Option<u64>| c.map_or_else(|| "n/a".to_string(), |c| c.to_string());

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Check").fg(Color::White),
        Cell::new("Result").fg(Color::White),
        Cell::new("Details").fg(Color::White),
    ]);
    table.add_row(vec![
        Cell::new("Vector count"),
        pass_cell(report.counts.matches()),
        Cell::new(format!(
            "{source}: {}, {target}: {}",
            count(report.counts.source),
            count(report.counts.target)
        )),
    ]);
    table.add_row(vec![
        Cell::new("Sampled metadata"),
        pass_cell(report.metadata.success()),
        Cell::new(format!(
            "{} match, {} mismatch, {} missing",
            report.metadata.matches, report.metadata.mismatches, report.metadata.missing
        )),
    ]);
    if let Some(search) = &report.search {
        table.add_row(vec![
            Cell::new("Search quality"),
            pass_cell(search.success()),
            Cell::new(format!(
                "recall@{} {:.3} (min {MIN_AVG_RECALL}), rank correlation {:.3} (min {MIN_AVG_CORRELATION}), latency {:.1} ms vs {:.1} ms",
                search.top_k,
                search.avg_recall,
                search.avg_correlation,
                search.avg_source_latency_ms,
                search.avg_target_latency_ms
            )),
        ]);
    }

    println!();
    println!(
        "  Migration check {} -> {}",
        style(source).cyan(),
        style(target).cyan()
    );
    println!();
    println!("{table}");
    if !report.metadata.problems.is_empty() {
        println!();
        println!("  Problem ids:");
        for id in report.metadata.problems.iter().take(10) {
            println!("     {} {id}", style(">>").dim());
        }
    }
    println!();
    let verdict = if report.passed() {
        style("PASSED").green().bold()
    } else {
        style("FAILED").red().bold()
    };
    println!("  {verdict}");
    println!();
}
