//! `huddle search`: chunk-level or meeting-level semantic search.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use huddle_infra::factory::get_memory_provider;
use huddle_types::config::ProviderConfig;
use huddle_types::memory::{SearchFilter, SearchOptions, truncate_chars};

/// Characters of chunk text shown per result row.
const PREVIEW_CHARS: usize = 80;

#[derive(Args)]
pub struct SearchArgs {
    /// Natural-language query.
    pub query: String,

    /// Maximum number of chunks to retrieve.
    #[arg(long, short = 'k', default_value = "10")]
    pub top_k: usize,

    /// Only search within this meeting.
    #[arg(long)]
    pub meeting: Option<String>,

    /// Only search this user's meetings.
    #[arg(long)]
    pub user: Option<String>,

    /// Only return chunks attributed to this speaker.
    #[arg(long)]
    pub speaker: Option<String>,

    /// Drop results scoring below this value.
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Group results by meeting.
    #[arg(long)]
    pub meetings: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        let filter = SearchFilter {
            meeting_id: self.meeting.clone(),
            user_id: self.user.clone(),
            speaker: self.speaker.clone(),
            ..SearchFilter::default()
        };
        let mut options = SearchOptions::top_k(self.top_k);
        if filter != SearchFilter::default() {
            options = options.with_filter(filter);
        }
        options.min_score = self.min_score;
        options
    }
}

fn preview(text: Option<&str>) -> String {
    let text = text.unwrap_or("").replace('\n', " ");
    let short = truncate_chars(&text, PREVIEW_CHARS);
    if short.len() < text.len() {
        format!("{short}...")
    } else {
        text
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(headers.iter().map(|h| Cell::new(h).fg(Color::White)).collect::<Vec<_>>());
    table
}

pub async fn search(config: &ProviderConfig, args: &SearchArgs, json: bool) -> Result<()> {
    let provider = get_memory_provider(config).context("Failed to create vector store provider")?;
    let options = args.options();

    if args.meetings {
        let meetings = provider
            .search_by_meeting(&args.query, &options)
            .await
            .context("Meeting search failed")?;

        if json {
            println!("{}", serde_json::to_string_pretty(&meetings)?);
            return Ok(());
        }
        if meetings.is_empty() {
            println!();
            println!("  {} No matching meetings.", style("i").blue().bold());
            println!();
            return Ok(());
        }

        let mut table = new_table(&["Meeting", "Score", "Chunks", "Best snippet"]);
        for meeting in &meetings {
            table.add_row(vec![
                Cell::new(&meeting.meeting_id).fg(Color::Cyan),
                Cell::new(format!("{:.3}", meeting.score)),
                Cell::new(meeting.matching_chunks),
                Cell::new(preview(meeting.snippets.first().map(String::as_str))).fg(Color::DarkGrey),
            ]);
        }
        println!();
        println!("{table}");
        println!();
        return Ok(());
    }

    let results = provider
        .search_by_text(&args.query, &options)
        .await
        .context("Search failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!();
        println!("  {} No matching chunks.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = new_table(&["Score", "Meeting", "Chunk", "Speaker", "Text"]);
    for result in &results {
        table.add_row(vec![
            Cell::new(format!("{:.3}", result.score)),
            Cell::new(&result.metadata.meeting_id).fg(Color::Cyan),
            Cell::new(result.metadata.chunk_index),
            Cell::new(result.metadata.speaker.as_deref().unwrap_or("")),
            Cell::new(preview(result.metadata.text.as_deref())).fg(Color::DarkGrey),
        ]);
    }
    println!();
    println!("{table}");
    println!();
    Ok(())
}
