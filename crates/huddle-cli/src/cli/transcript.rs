//! Transcript commands: ingest a file, delete a meeting.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

use huddle_core::memory::transcript::{TranscriptInput, real_speakers};
use huddle_infra::factory::get_memory_provider;
use huddle_types::config::ProviderConfig;
use huddle_types::memory::BatchResult;

#[derive(Args)]
pub struct IngestArgs {
    /// Transcript text file.
    pub path: PathBuf,

    /// Meeting id (defaults to the file stem).
    #[arg(long)]
    pub meeting_id: Option<String>,

    /// Source object key stored with every chunk (defaults to the path).
    #[arg(long)]
    pub s3_key: Option<String>,

    /// Diarization speaker label; repeat for each speaker.
    #[arg(long = "speaker")]
    pub speakers: Vec<String>,

    /// Owning user.
    #[arg(long)]
    pub user_id: Option<String>,
}

fn default_meeting_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    Ok(spinner)
}

fn print_batch(label: &str, result: &BatchResult) {
    println!();
    println!(
        "  {} {label}: {} stored, {} failed",
        if result.is_complete_success() {
            style("ok").green()
        } else {
            style("!!").yellow()
        },
        result.successful,
        result.failed,
    );
    for error in result.errors.iter().take(5) {
        println!("     {} {}: {}", style(">>").dim(), error.id, error.error);
    }
    if result.errors.len() > 5 {
        println!("     {} ... {} more", style(">>").dim(), result.errors.len() - 5);
    }
    println!();
}

pub async fn ingest(config: &ProviderConfig, args: &IngestArgs, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.path)
        .await
        .with_context(|| format!("Failed to read transcript: {}", args.path.display()))?;
    let meeting_id = match args.meeting_id.clone().or_else(|| default_meeting_id(&args.path)) {
        Some(id) => id,
        None => bail!("Cannot derive a meeting id from {}; pass --meeting-id", args.path.display()),
    };
    let s3_key = args
        .s3_key
        .clone()
        .unwrap_or_else(|| args.path.display().to_string());

    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let input = TranscriptInput {
        meeting_id: &meeting_id,
        s3_key: &s3_key,
        content: &content,
        speakers: &args.speakers,
        user_id: args.user_id.as_deref(),
    };

    let progress = (!json).then(|| spinner(&format!("Ingesting {meeting_id}..."))).transpose()?;
    let result = provider
        .process_transcript(&input)
        .await
        .with_context(|| format!("Failed to ingest meeting '{meeting_id}'"));
    if let Some(progress) = progress {
        progress.finish_and_clear();
    }
    let result = result?;

    if json {
        let output = serde_json::json!({
            "meeting_id": meeting_id,
            "speakers": real_speakers(&args.speakers),
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_batch(&format!("Meeting '{meeting_id}'"), &result);
    }
    Ok(())
}

pub async fn delete_meeting(config: &ProviderConfig, meeting_id: &str, force: bool, json: bool) -> Result<()> {
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete every chunk of meeting '{meeting_id}'?"))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let result = provider.delete_by_meeting_id(meeting_id).await;

    if json {
        let output = serde_json::json!({
            "meeting_id": meeting_id,
            "deleted": result.successful,
            "failed": result.failed,
            "errors": result.errors,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if result.total() == 0 {
        println!();
        println!(
            "  {} No chunks found for meeting '{}'.",
            style("i").blue().bold(),
            style(meeting_id).cyan(),
        );
        println!();
    } else {
        println!();
        println!(
            "  {} Deleted {} chunks of '{}'",
            if result.failed == 0 { style("ok").green() } else { style("!!").yellow() },
            result.successful,
            style(meeting_id).cyan(),
        );
        if result.failed > 0 {
            println!("     {} {} deletions failed", style(">>").dim(), result.failed);
        }
        println!();
    }

    if result.failed > 0 {
        bail!("{} deletions failed for meeting '{meeting_id}'", result.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_meeting_id_from_file_stem() {
        assert_eq!(
            default_meeting_id(Path::new("/tmp/transcripts/2026-10-01-standup.txt")).as_deref(),
            Some("2026-10-01-standup")
        );
        assert!(default_meeting_id(Path::new("/")).is_none());
    }
}
