use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use rankdb_cli::{init_tracing, load_settings};
use rankdb_core::config::expand_path;
use rankdb_core::discovery::DocumentDiscovery;
use rankdb_hybrid::{BatchInfo, HybridSearchEngine};

/// Index every new document under a directory as one upload batch.
#[derive(Parser)]
#[command(name = "rankdb-indexer", version, about)]
struct Cli {
    /// Directory to scan (default: `data.documents_dir`)
    dir: Option<PathBuf>,

    /// Batch identifier (default: upload time)
    #[arg(long)]
    batch_id: Option<String>,

    /// Human-readable batch name
    #[arg(long)]
    batch_name: Option<String>,
}

fn main() -> Result<()> {
    init_tracing("info");
    let cli = Cli::parse();
    let settings = load_settings()?;
    let dir = cli.dir.unwrap_or_else(|| expand_path(&settings.data.documents_dir));

    let mut batch = BatchInfo::now();
    if let Some(id) = cli.batch_id {
        batch = batch.with_id(id);
    }
    if let Some(name) = cli.batch_name {
        batch = batch.with_name(name);
    }

    println!("rankdb indexer\n==============");
    println!("Documents: {}", dir.display());
    println!("Batch:     {}", batch.id);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?
            .progress_chars("#>-"),
    );
    let engine = HybridSearchEngine::open(&settings)?.with_progress(bar);
    let discovery = DocumentDiscovery::new(&settings.data.extensions);
    let report = engine.index_directory(&dir, &discovery, &batch)?;

    println!("\nIndexed {} documents ({} already known, {} failed)", report.inserted.len(), report.skipped, report.failures.len());
    for failure in &report.failures {
        println!("  ✗ {}: {}", failure.document, failure.error);
    }
    println!("Index now holds {} slots", engine.index().slot_count());
    engine.teardown()?;
    Ok(())
}
