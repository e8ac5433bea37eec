//! Command-line interface for textanchor.
//!
//! Provides commands for highlighting a snippet in an HTML file, inspecting
//! candidates and probe segments, running the JSON-lines message loop, and
//! showing the resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::anchor::{DocumentAccessor, SegmentExtractor};
use crate::config;
use crate::core::{AnchorMethod, Engine, EngineSettings, HighlightReport};
use crate::dom::{parse_html, to_html, Document};
use crate::domain::{EngineEvent, HighlightRequest, PositionHint};

/// textanchor - relocate and highlight captured text in a changed document
#[derive(Parser, Debug)]
#[command(name = "textanchor")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve a snippet in an HTML file and highlight it
    Highlight {
        /// HTML document to search
        #[arg(long)]
        html: PathBuf,

        /// Captured snippet text
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,

        /// Read the captured snippet from a file
        #[arg(long)]
        text_file: Option<PathBuf>,

        /// Search query (used alone for query term highlighting)
        #[arg(short, long)]
        query: Option<String>,

        /// Word index where the snippet started
        #[arg(long)]
        start: Option<usize>,

        /// Word index where the snippet ended
        #[arg(long, requires = "start")]
        end: Option<usize>,

        /// Write the highlighted HTML here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the match report as JSON
        #[arg(long)]
        json: bool,

        /// Write the engine journal as JSON lines
        #[arg(long)]
        journal: Option<PathBuf>,
    },

    /// List candidate elements in scan order
    Candidates {
        /// HTML document to scan
        #[arg(long)]
        html: PathBuf,
    },

    /// Show the probe segments derived from a snippet
    Segments {
        /// Captured snippet text
        text: String,
    },

    /// Answer JSON-lines requests on stdin against one document
    Serve {
        /// HTML document to operate on
        #[arg(long)]
        html: PathBuf,

        /// Write the final HTML here once stdin closes
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append engine journal events here as JSON lines
        #[arg(long)]
        journal: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Highlight {
                html,
                text,
                text_file,
                query,
                start,
                end,
                output,
                json,
                journal,
            } => {
                let text = match text_file {
                    Some(path) => Some(
                        tokio::fs::read_to_string(&path)
                            .await
                            .with_context(|| format!("Failed to read {}", path.display()))?,
                    ),
                    None => text,
                };
                let request = HighlightRequest {
                    query,
                    text,
                    position: start.map(|start| PositionHint::new(start, end)),
                };
                highlight(&html, request, output.as_deref(), json, journal.as_deref()).await
            }
            Commands::Candidates { html } => list_candidates(&html).await,
            Commands::Segments { text } => show_segments(&text),
            Commands::Serve {
                html,
                output,
                journal,
            } => serve(&html, output.as_deref(), journal.as_deref()).await,
            Commands::Config => show_config(),
        }
    }
}

/// Resolve one request immediately and report the outcome
async fn highlight(
    html: &Path,
    request: HighlightRequest,
    output: Option<&Path>,
    json: bool,
    journal: Option<&Path>,
) -> Result<()> {
    let doc = load_document(html).await?;
    let settings = EngineSettings::from(config::config()?);

    let mut engine = Engine::new(doc, settings);
    let report = engine.highlight(request);
    // let the notification expire so the written HTML only carries the highlight
    engine.flush();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if let Some(path) = journal {
        let mut file = create_journal(path).await?;
        append_journal(&mut file, engine.drain_journal()).await?;
    }
    if let Some(path) = output {
        write_document(engine.document(), path).await?;
        eprintln!("Highlighted HTML written to {}", path.display());
    }

    if !report.success {
        anyhow::bail!(
            "No anchor found: {}",
            report.failure.as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}

fn print_report(report: &HighlightReport) {
    println!("Session: {}", report.session_id);
    match report.method {
        Some(AnchorMethod::Tier { tier, score }) => {
            println!("Method:  {} tier (score {:.2})", tier.as_str(), score)
        }
        Some(AnchorMethod::Position) => println!("Method:  position hint"),
        Some(AnchorMethod::QueryTerms { count }) => println!("Method:  query terms ({} marks)", count),
        None => println!("Method:  none"),
    }
    if let Some(marker) = report.marker {
        println!("Marker:  {}", marker);
    }
    if let Some(text) = &report.anchor_text {
        println!("Text:    {}", preview(text, 120));
    }
    if let Some(digest) = &report.anchor_sha256 {
        println!("Digest:  {}", digest);
    }
    println!("Message: {}", report.message);
}

/// List candidates in the order the matching tiers visit them
async fn list_candidates(html: &Path) -> Result<()> {
    let doc = load_document(html).await?;
    let cfg = config::config()?;
    let candidates = DocumentAccessor::new(&doc)
        .with_min_candidate_chars(cfg.matching.min_candidate_chars)
        .collect_candidates();

    if candidates.is_empty() {
        println!("No candidates found");
        return Ok(());
    }

    println!("{:<8} {:<12} {}", "NODE", "TAG", "TEXT");
    println!("{}", "-".repeat(80));
    for candidate in &candidates {
        let tag = doc.tag(candidate.node).unwrap_or("?");
        println!(
            "{:<8} {:<12} {}",
            candidate.node.to_string(),
            tag,
            preview(&candidate.text, 58)
        );
    }
    println!("\n{} candidates", candidates.len());
    Ok(())
}

fn show_segments(text: &str) -> Result<()> {
    let segments = SegmentExtractor::new()
        .extract(text)
        .context("Cannot derive segments")?;

    for (idx, segment) in segments.iter().enumerate() {
        let status = if segment.is_usable() { "probe" } else { "too short" };
        println!(
            "{}. [{} chars, {}] {}",
            idx + 1,
            segment.char_len(),
            status,
            segment.as_str()
        );
    }
    Ok(())
}

/// JSON-lines message loop; engine timers follow the wall clock
async fn serve(html: &Path, output: Option<&Path>, journal: Option<&Path>) -> Result<()> {
    let doc = load_document(html).await?;
    let settings = EngineSettings::from(config::config()?);
    let mut engine = Engine::new(doc, settings);
    // events stream out as they happen; the in-memory journal is bounded
    let mut journal_file = match journal {
        Some(path) => Some(create_journal(path).await?),
        None => None,
    };

    let started = Instant::now();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!(document = %html.display(), "Serving requests on stdin");

    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read request")? else {
                    break;
                };
                engine.advance_to(started.elapsed());
                if line.trim().is_empty() {
                    continue;
                }
                let response = engine.handle_json(&line);
                let mut encoded = serde_json::to_string(&response)?;
                encoded.push('\n');
                stdout.write_all(encoded.as_bytes()).await?;
                stdout.flush().await?;
            }
            _ = sleep_until(started + deadline.unwrap_or_default()), if deadline.is_some() => {
                engine.advance_to(started.elapsed());
            }
        }
        if let Some(file) = journal_file.as_mut() {
            append_journal(file, engine.drain_journal()).await?;
        }
    }

    debug!(pending = engine.has_pending_timers(), "Input closed, flushing timers");
    engine.flush();

    if let Some(file) = journal_file.as_mut() {
        append_journal(file, engine.drain_journal()).await?;
        file.flush().await?;
    }
    if let Some(path) = output {
        write_document(engine.document(), path).await?;
        info!(output = %path.display(), "Final document written");
    }
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("textanchor configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Engine:");
    println!("  Settle delay:    {}ms", cfg.settle_delay_ms);
    println!("  Notification:    {}ms", cfg.notification_ms);
    println!("  Max query marks: {}", cfg.max_query_marks);
    println!("  Journal events:  {}", cfg.journal_capacity);
    println!();
    println!("Matching:");
    println!("  Fuzzy threshold:        {}", cfg.matching.fuzzy_threshold);
    println!("  Min candidate chars:    {}", cfg.matching.min_candidate_chars);
    println!("  Min main content chars: {}", cfg.matching.main_content_min_chars);
    println!();
    println!("Marker classes:");
    println!("  Active:  {}", cfg.classes.active);
    println!("  Passive: {}", cfg.classes.passive);
    println!("  Tooltip: {}", cfg.classes.tooltip);

    Ok(())
}

async fn load_document(path: &Path) -> Result<Document> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read HTML document: {}", path.display()))?;
    Ok(parse_html(&source))
}

async fn write_document(doc: &Document, path: &Path) -> Result<()> {
    tokio::fs::write(path, to_html(doc, doc.root()))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn create_journal(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to create journal: {}", path.display()))
}

/// Append events as JSON lines
async fn append_journal(file: &mut File, events: Vec<EngineEvent>) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    let mut buf = String::new();
    for event in &events {
        buf.push_str(&serde_json::to_string(event)?);
        buf.push('\n');
    }
    file.write_all(buf.as_bytes())
        .await
        .context("Failed to append journal events")?;
    Ok(())
}

/// Whitespace-collapsed prefix of at most `max_chars` characters
fn preview(text: &str, max_chars: usize) -> String {
    let clean = crate::anchor::text::normalize_whitespace(text);
    if clean.chars().count() <= max_chars {
        return clean;
    }
    let cut: String = clean.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_args() {
        let cli = Cli::try_parse_from([
            "textanchor",
            "highlight",
            "--html",
            "page.html",
            "--query",
            "borrow checker",
            "--start",
            "12",
            "--end",
            "20",
        ])
        .unwrap();

        match cli.command {
            Commands::Highlight {
                query, start, end, ..
            } => {
                assert_eq!(query.as_deref(), Some("borrow checker"));
                assert_eq!((start, end), (Some(12), Some(20)));
            }
            other => panic!("Expected highlight, got {:?}", other),
        }
    }

    #[test]
    fn test_end_requires_start() {
        assert!(Cli::try_parse_from(["textanchor", "highlight", "--html", "p.html", "--end", "3"]).is_err());
        assert!(Cli::try_parse_from([
            "textanchor",
            "highlight",
            "--html",
            "p.html",
            "--text",
            "a",
            "--text-file",
            "b.txt"
        ])
        .is_err());
    }

    #[tokio::test]
    async fn test_journal_and_document_written_async() {
        let temp = tempfile::TempDir::new().unwrap();
        let page = temp.path().join("page.html");
        let journal = temp.path().join("journal.jsonl");
        let output = temp.path().join("out.html");
        tokio::fs::write(&page, "<body><p>Rust keeps memory safe without a collector.</p></body>")
            .await
            .unwrap();

        let doc = load_document(&page).await.unwrap();
        let mut engine = Engine::new(doc, EngineSettings::immediate());
        assert!(engine.highlight(HighlightRequest::with_query("memory")).success);

        let mut file = create_journal(&journal).await.unwrap();
        append_journal(&mut file, engine.drain_journal()).await.unwrap();
        engine.flush();
        append_journal(&mut file, engine.drain_journal()).await.unwrap();
        file.flush().await.unwrap();
        write_document(engine.document(), &output).await.unwrap();

        assert!(engine.journal().is_empty());
        let lines = tokio::fs::read_to_string(&journal).await.unwrap();
        assert!(lines.lines().count() >= 2);
        for line in lines.lines() {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(event.get("event_type").is_some());
        }
        let html = tokio::fs::read_to_string(&output).await.unwrap();
        assert!(html.contains("data-textanchor-marker"));
    }

    #[test]
    fn test_preview_truncates() {
        assert_eq!(preview("short   text", 20), "short text");
        assert_eq!(preview("abcdefghij", 6), "abc...");
    }
}
