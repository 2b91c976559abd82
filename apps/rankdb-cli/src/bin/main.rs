use anyhow::Result;
use clap::{Parser, Subcommand};

use rankdb_cli::{init_tracing, load_settings};
use rankdb_hybrid::{BatchStatus, HybridSearchEngine};

#[derive(Parser)]
#[command(name = "rankdb", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show index size, snapshot location, and recent upload batches
    Status,
    /// Add an indexed document to the saved shortlist
    Save {
        /// Document identifier as shown in search results
        document: String,
    },
    /// List saved documents
    Saved {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();
    let settings = load_settings()?;
    match cli.command {
        Command::Status => {
            let engine = HybridSearchEngine::open(&settings)?;
            let index = engine.index();
            println!("rankdb status\n=============");
            println!("Dimension:  {}", index.dim());
            println!("Slots:      {}", index.slot_count());
            if let Some(p) = index.persistence() {
                let state = if p.exists() { "present" } else { "absent" };
                println!("Snapshot:   {} ({})", p.base().display(), state);
            }
            println!("Prefilter:  {:?}", index.scorer().settings().prefilter);
            let uploads = engine.recent_uploads();
            println!("\nRecent uploads ({}):", uploads.len());
            for batch in uploads {
                let date = batch.date.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".to_string());
                let status = match batch.status {
                    BatchStatus::Completed => "completed",
                    BatchStatus::Partial => "partial",
                };
                println!(
                    "  {}  {}  {}/{} ok, {} failed  {}  [{}]",
                    date, batch.name, batch.success_count, batch.file_count, batch.failed_count, status, batch.id
                );
                for file in batch.files.iter().filter(|f| f.error.is_some()) {
                    println!("      ✗ {}: {}", file.name, file.error.as_deref().unwrap_or_default());
                }
            }
        }
        Command::Save { document } => {
            let engine = HybridSearchEngine::open(&settings)?;
            if engine.is_saved(&document) {
                println!("{} is already saved", document);
            } else {
                engine.save_candidate(&document)?;
                println!("Saved {}", document);
            }
        }
        Command::Saved { json } => {
            let engine = HybridSearchEngine::open(&settings)?;
            let saved = engine.saved_candidates();
            if json {
                println!("{}", serde_json::to_string_pretty(&saved)?);
            } else {
                println!("Saved candidates ({}):", saved.len());
                for candidate in saved {
                    let name = candidate.metadata.name.as_deref().unwrap_or("-");
                    println!("  {}  {}", candidate.document, name);
                }
            }
        }
    }
    Ok(())
}
